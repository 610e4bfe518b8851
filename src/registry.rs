//! The guest list: search, ordering, expired-permit counts, and fiscal codes kept unique.

use crate::{
    config::RegistrySettings,
    guest::{Guest, GuestRecord, RegistrationError},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// How the guest list is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuestOrder {
    /// Surname, then name, ignoring case.
    #[default]
    Name,
    /// Room number, compared as text.
    Room,
    /// Permit expiry date, earliest first.
    Expiry,
}

impl GuestOrder {
    /// Reads the `sort` parameter of the guest list. `numero_stanza` and `data_scadenza` (or
    /// `room` and `expiry`) pick those orders; anything else orders by name.
    pub fn from_param(param: &str) -> Self {
        match param.trim().to_ascii_lowercase().as_str() {
            "numero_stanza" | "room" => Self::Room,
            "data_scadenza" | "expiry" => Self::Expiry,
            _ => Self::Name,
        }
    }
}

/// Records with `term` in their name, surname, fiscal code, permit number or room number,
/// ignoring case. An empty term matches everything.
pub fn search<'a>(records: &'a [GuestRecord], term: &str) -> Vec<&'a GuestRecord> {
    let term = term.to_lowercase();
    records
        .iter()
        .filter(|record| {
            let guest = &record.guest;
            [
                guest.first_name.as_str(),
                guest.last_name.as_str(),
                record.fiscal_code.as_str(),
                guest.permit_number.as_str(),
                guest.room_number.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
        })
        .collect()
}

/// Sorts `records` in place. Records that compare equal keep their relative order.
pub fn sort(records: &mut [&GuestRecord], order: GuestOrder) {
    match order {
        GuestOrder::Name => records.sort_by_cached_key(|record| {
            (
                record.guest.last_name.to_lowercase(),
                record.guest.first_name.to_lowercase(),
            )
        }),
        GuestOrder::Room => records.sort_by(|a, b| a.guest.room_number.cmp(&b.guest.room_number)),
        GuestOrder::Expiry => records.sort_by_key(|record| record.permit_expiry_date),
    }
}

/// How many permits have expired as of `today`, the expiry day included.
pub fn expired_count(records: &[GuestRecord], today: NaiveDate) -> usize {
    records
        .iter()
        .filter(|record| record.is_expired(today))
        .count()
}

/// Registered guests, no two with the same fiscal code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    records: Vec<GuestRecord>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, in registration order.
    pub fn records(&self) -> &[GuestRecord] {
        &self.records
    }

    /// The record at `index`.
    pub fn get(&self, index: usize) -> Option<&GuestRecord> {
        self.records.get(index)
    }

    /// Number of registered guests.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registers `guest` and returns its index.
    ///
    /// # Errors
    ///
    /// Fails like [`Guest::register`], or with [`RegistrationError::DuplicateFiscalCode`] if a
    /// registered guest already has the same fiscal code.
    pub fn add(
        &mut self,
        guest: Guest,
        settings: &RegistrySettings,
        now: NaiveDateTime,
    ) -> Result<usize, RegistrationError> {
        let record = guest.register(settings, now)?;
        self.ensure_unique(&record, None)?;
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Replaces the data of the guest at `index`, as [`GuestRecord::update`] does.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::UnknownGuest`] if there is no guest at `index`.
    /// - [`RegistrationError::DuplicateFiscalCode`] if the new fiscal code belongs to another
    ///   guest.
    /// - Anything [`GuestRecord::update`] returns.
    ///
    /// On error the registry is left unchanged.
    pub fn update(
        &mut self,
        index: usize,
        guest: Guest,
        settings: &RegistrySettings,
        now: NaiveDateTime,
    ) -> Result<(), RegistrationError> {
        let mut record = self
            .records
            .get(index)
            .cloned()
            .ok_or(RegistrationError::UnknownGuest { index })?;
        record.update(guest, settings, now)?;
        self.ensure_unique(&record, Some(index))?;
        self.records[index] = record;
        Ok(())
    }

    /// The guest list: records matching `term`, in `order`.
    pub fn list(&self, term: &str, order: GuestOrder) -> Vec<&GuestRecord> {
        let mut found = search(&self.records, term);
        sort(&mut found, order);
        found
    }

    /// How many permits have expired as of `today`.
    pub fn expired_count(&self, today: NaiveDate) -> usize {
        expired_count(&self.records, today)
    }

    fn ensure_unique(
        &self,
        record: &GuestRecord,
        except: Option<usize>,
    ) -> Result<(), RegistrationError> {
        let taken = self
            .records
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != except)
            .any(|(_, other)| other.fiscal_code == record.fiscal_code);
        if taken {
            tracing::warn!(fiscal_code = %record.fiscal_code, "duplicate fiscal code");
            return Err(RegistrationError::DuplicateFiscalCode {
                code: record.fiscal_code.clone(),
            });
        }
        Ok(())
    }
}

/// Guests as written in a TOML file, one `[[guest]]` table each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GuestList {
    /// The guests, in file order.
    #[serde(default, rename = "guest")]
    pub guests: Vec<Guest>,
}
