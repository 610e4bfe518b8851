use crate::{
    config::RegistrySettings,
    date::{days_between_dates, format_date_it},
    dom::{Document, ElementId, ElementSpec},
    error::{DateError, DomError, FiscalCodeError},
    fiscal_code::{self, FiscalCode, Person, Sex},
    permit,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Errors for registering or updating a guest.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RegistrationError {
    /// The fiscal code could not be generated.
    #[error("{0}")]
    FiscalCode(#[from] FiscalCodeError),

    /// The permit expiry could not be computed.
    #[error("{0}")]
    Date(#[from] DateError),

    /// Another guest already has this fiscal code.
    #[error("A guest with fiscal code {code} is already registered")]
    DuplicateFiscalCode {
        /// The fiscal code in use.
        code: FiscalCode,
    },

    /// No guest at this position of the registry.
    #[error("No guest with index {index} in registry")]
    UnknownGuest {
        /// The index that was looked up.
        index: usize,
    },
}

/// A guest of the center, as entered in the registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    /// Nome.
    pub first_name: String,
    /// Cognome.
    pub last_name: String,
    /// Data di nascita.
    pub birth_date: NaiveDate,
    /// Sesso.
    pub sex: Sex,
    /// Paese di nascita.
    pub birth_country: String,
    /// Cadastral code of the municipality of birth, for guests born in Italy.
    #[serde(default)]
    pub birthplace_code: Option<String>,
    /// Number of the residence permit.
    pub permit_number: String,
    /// Day the residence permit was issued.
    pub permit_issue_date: NaiveDate,
    /// Room the guest sleeps in. Free text, such as `12B`.
    pub room_number: String,
}

impl Guest {
    /// The data the fiscal code is derived from.
    pub fn person(&self) -> Person<'_> {
        Person {
            surname: &self.last_name,
            name: &self.first_name,
            birth_date: self.birth_date,
            sex: self.sex,
            birth_country: &self.birth_country,
            birthplace_code: self.birthplace_code.as_deref(),
        }
    }

    /// Computes the fiscal code and permit expiry of this guest and stamps the record with `now`.
    pub fn register(
        self,
        settings: &RegistrySettings,
        now: NaiveDateTime,
    ) -> Result<GuestRecord, RegistrationError> {
        let (fiscal_code, permit_expiry_date) = self.derived_fields(settings)?;

        tracing::info!(
            fiscal_code = %fiscal_code,
            room = %self.room_number,
            "registered guest"
        );
        Ok(GuestRecord {
            guest: self,
            fiscal_code,
            permit_expiry_date,
            created_at: now,
            updated_at: now,
        })
    }

    fn derived_fields(
        &self,
        settings: &RegistrySettings,
    ) -> Result<(FiscalCode, NaiveDate), RegistrationError> {
        let fiscal_code = fiscal_code::generate(&self.person(), settings)?;
        let issued = self.permit_issue_date;
        let permit_expiry_date = permit::expiry_date(issued, settings.permit_validity_months)
            .ok_or_else(|| DateError::OutOfRange {
                date: issued.to_string(),
            })?;
        Ok((fiscal_code, permit_expiry_date))
    }
}

/// A registered guest, with its computed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRecord {
    /// The data as entered.
    #[serde(flatten)]
    pub guest: Guest,
    /// Generated from the personal data.
    pub fiscal_code: FiscalCode,
    /// Computed from the permit issue date.
    pub permit_expiry_date: NaiveDate,
    /// When the guest was registered.
    pub created_at: NaiveDateTime,
    /// When the record last changed.
    pub updated_at: NaiveDateTime,
}

impl GuestRecord {
    /// Replaces the guest data with `guest`, regenerating the fiscal code and the permit expiry,
    /// and stamps the record with `now`. The registration time is kept.
    ///
    /// On error the record is left unchanged.
    pub fn update(
        &mut self,
        guest: Guest,
        settings: &RegistrySettings,
        now: NaiveDateTime,
    ) -> Result<(), RegistrationError> {
        let (fiscal_code, permit_expiry_date) = guest.derived_fields(settings)?;
        if fiscal_code != self.fiscal_code {
            tracing::info!(from = %self.fiscal_code, to = %fiscal_code, "fiscal code changed");
        }
        self.guest = guest;
        self.fiscal_code = fiscal_code;
        self.permit_expiry_date = permit_expiry_date;
        self.updated_at = now;
        Ok(())
    }

    /// Whole days left on the permit as of `today`; zero or negative once it has expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        days_between_dates(self.permit_expiry_date, Some(today.into()))
    }

    /// Whether the permit is expired as of `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        permit::is_expired(self.permit_expiry_date, today)
    }

    /// The record with every date formatted for display.
    pub fn display(&self) -> GuestView {
        let date = |date: NaiveDate| format_date_it(Some(&date.to_string()));
        let timestamp = |at: NaiveDateTime| at.format("%d/%m/%Y %H:%M").to_string();
        GuestView {
            first_name: self.guest.first_name.clone(),
            last_name: self.guest.last_name.clone(),
            birth_date: date(self.guest.birth_date),
            sex: self.guest.sex.to_string(),
            birth_country: self.guest.birth_country.clone(),
            permit_number: self.guest.permit_number.clone(),
            permit_issue_date: date(self.guest.permit_issue_date),
            permit_expiry_date: date(self.permit_expiry_date),
            room_number: self.guest.room_number.clone(),
            fiscal_code: self.fiscal_code.to_string(),
            created_at: timestamp(self.created_at),
            updated_at: timestamp(self.updated_at),
        }
    }
}

/// A [`GuestRecord`] ready to show: dates as `DD/MM/YYYY`, timestamps as `DD/MM/YYYY HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct GuestView {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub sex: String,
    pub birth_country: String,
    pub permit_number: String,
    pub permit_issue_date: String,
    pub permit_expiry_date: String,
    pub room_number: String,
    pub fiscal_code: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Appends the guest registration form under `parent` and returns the form.
///
/// The form is marked for validation styling and carries the constraints the browser checks
/// natively. The computed fields are read-only and explained by a tooltip.
pub fn guest_form(document: &mut Document, parent: ElementId) -> Result<ElementId, DomError> {
    let form = document.append(
        parent,
        ElementSpec::new("form")
            .attr("method", "post")
            .flag("novalidate")
            .class("needs-validation"),
    )?;

    let text = |name: &str, min: usize, max: usize| {
        ElementSpec::new("input")
            .attr("type", "text")
            .attr("name", name)
            .attr("minlength", min.to_string())
            .attr("maxlength", max.to_string())
            .class("form-control")
    };
    let date = |name: &str| {
        ElementSpec::new("input")
            .attr("type", "date")
            .attr("name", name)
            .flag("required")
            .class("form-control")
    };
    let computed = |name: &str, hint: &str| {
        ElementSpec::new("input")
            .attr("type", "text")
            .attr("name", name)
            .flag("readonly")
            .attr("data-bs-toggle", "tooltip")
            .attr("title", hint)
            .class("form-control")
    };

    let controls = [
        text("nome", 2, 64).flag("required"),
        text("cognome", 2, 64).flag("required"),
        date("data_nascita"),
        ElementSpec::new("select")
            .attr("name", "sesso")
            .flag("required")
            .class("form-select")
            .value("M"),
        text("paese_nascita", 2, 64).flag("required"),
        ElementSpec::new("input")
            .attr("type", "text")
            .attr("name", "codice_catastale")
            .attr("pattern", "[A-Za-z][0-9]{3}")
            .class("form-control"),
        computed("codice_fiscale_display", "Calcolato dai dati anagrafici"),
        text("numero_permesso", 5, 64).flag("required"),
        date("data_rilascio_permesso"),
        computed("data_scadenza_display", "Sei mesi dopo la data di rilascio"),
        text("numero_stanza", 1, 10).flag("required"),
        ElementSpec::new("button")
            .attr("type", "submit")
            .class("btn")
            .class("btn-primary")
            .value("Salva"),
    ];
    for control in controls {
        document.append(form, control)?;
    }
    Ok(form)
}

/// Fills the controls of a [`guest_form`] from `guest`.
pub fn fill_guest_form(
    document: &mut Document,
    form: ElementId,
    guest: &Guest,
) -> Result<(), DomError> {
    let values = [
        ("nome", guest.first_name.clone()),
        ("cognome", guest.last_name.clone()),
        ("data_nascita", guest.birth_date.to_string()),
        ("sesso", guest.sex.to_string()),
        ("paese_nascita", guest.birth_country.clone()),
        (
            "codice_catastale",
            guest.birthplace_code.clone().unwrap_or_default(),
        ),
        ("numero_permesso", guest.permit_number.clone()),
        ("data_rilascio_permesso", guest.permit_issue_date.to_string()),
        ("numero_stanza", guest.room_number.clone()),
    ];

    for control in document.descendants(form) {
        let name = document
            .element(control)
            .and_then(|e| e.attribute("name"))
            .map(str::to_owned);
        if let Some((_, value)) = values.iter().find(|(n, _)| Some(*n) == name.as_deref()) {
            document.set_value(control, value.clone())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PageSettings,
        dom::Selector,
        page::initialize,
        widget::{WidgetKind, WidgetRegistry},
    };
    use rstest::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[fixture]
    fn guest() -> Guest {
        Guest {
            first_name: "Mario".to_owned(),
            last_name: "Rossi".to_owned(),
            birth_date: ymd(1980, 1, 1),
            sex: Sex::Male,
            birth_country: "Italia".to_owned(),
            birthplace_code: Some("H501".to_owned()),
            permit_number: "AB12345".to_owned(),
            permit_issue_date: ymd(2024, 8, 31),
            room_number: "12B".to_owned(),
        }
    }

    fn now() -> NaiveDateTime {
        ymd(2024, 9, 2).and_hms_opt(9, 5, 0).unwrap()
    }

    #[rstest]
    fn test_register(guest: Guest) {
        let record = guest.register(&RegistrySettings::default(), now()).unwrap();
        assert_eq!("RSSMRA80A01H501U", record.fiscal_code.as_str());
        assert_eq!(ymd(2025, 2, 28), record.permit_expiry_date);
        assert_eq!(now(), record.created_at);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[rstest]
    fn test_register_bad_birthplace(mut guest: Guest) {
        guest.birthplace_code = Some("SV".to_owned());
        assert!(matches!(
            guest.register(&RegistrySettings::default(), now()),
            Err(RegistrationError::FiscalCode(
                FiscalCodeError::InvalidBirthplaceCode { .. }
            ))
        ));
    }

    #[rstest]
    fn test_update(guest: Guest) {
        let settings = RegistrySettings::default();
        let mut record = guest.clone().register(&settings, now()).unwrap();
        let later = ymd(2024, 10, 1).and_hms_opt(18, 30, 0).unwrap();

        let renewed = Guest {
            first_name: "Maria".to_owned(),
            sex: Sex::Female,
            permit_issue_date: ymd(2024, 9, 30),
            ..guest
        };
        record.update(renewed.clone(), &settings, later).unwrap();

        assert_eq!(renewed, record.guest);
        assert_eq!("RSSMRA80A41H501Y", record.fiscal_code.as_str());
        assert_eq!(ymd(2025, 3, 28), record.permit_expiry_date);
        assert_eq!(now(), record.created_at);
        assert_eq!(later, record.updated_at);
        assert_eq!("01/10/2024 18:30", record.display().updated_at);
    }

    #[rstest]
    fn test_failed_update_keeps_record(guest: Guest) {
        let settings = RegistrySettings::default();
        let mut record = guest.clone().register(&settings, now()).unwrap();
        let before = record.clone();

        let broken = Guest {
            last_name: "'-'".to_owned(),
            ..guest
        };
        assert_eq!(
            Err(RegistrationError::FiscalCode(FiscalCodeError::NoLetters {
                field: "Surname"
            })),
            record.update(broken, &settings, now())
        );
        assert_eq!(before, record);
    }

    #[rstest]
    fn test_display(guest: Guest) {
        let view = guest
            .register(&RegistrySettings::default(), now())
            .unwrap()
            .display();
        assert_eq!("01/01/1980", view.birth_date);
        assert_eq!("31/08/2024", view.permit_issue_date);
        assert_eq!("28/02/2025", view.permit_expiry_date);
        assert_eq!("02/09/2024 09:05", view.created_at);
        assert_eq!("M", view.sex);
    }

    #[rstest]
    fn test_expiry_countdown(guest: Guest) {
        let record = guest.register(&RegistrySettings::default(), now()).unwrap();
        assert_eq!(Some(1), record.days_until_expiry(ymd(2025, 2, 27)));
        assert_eq!(Some(0), record.days_until_expiry(ymd(2025, 2, 28)));
        assert_eq!(Some(-3), record.days_until_expiry(ymd(2025, 3, 3)));
        assert!(!record.is_expired(ymd(2025, 2, 27)));
        assert!(record.is_expired(ymd(2025, 2, 28)));
    }

    #[test]
    fn test_deserialize_guest() {
        let guest: Guest = toml::from_str(
            r#"
            first_name = "Amina"
            last_name = "Diallo"
            birth_date = "1995-07-04"
            sex = "F"
            birth_country = "Senegal"
            permit_number = "SN998877"
            permit_issue_date = "2024-02-10"
            room_number = "3"
            "#,
        )
        .unwrap();
        assert_eq!(None, guest.birthplace_code);
        assert_eq!(Sex::Female, guest.sex);
        let record = guest.register(&RegistrySettings::default(), now()).unwrap();
        assert_eq!("Z330", &record.fiscal_code.as_str()[11..15]);
        assert_eq!(ymd(2024, 8, 10), record.permit_expiry_date);
    }

    fn submit_guest_form(guest: Option<&Guest>) -> (bool, bool) {
        let mut document = Document::new();
        let root = document.root();
        let form = guest_form(&mut document, root).unwrap();
        if let Some(guest) = guest {
            fill_guest_form(&mut document, form, guest).unwrap();
        }
        let mut tooltips = WidgetRegistry::new(WidgetKind::Tooltip);
        let mut popovers = WidgetRegistry::new(WidgetKind::Popover);
        let report = initialize(
            &mut document,
            &PageSettings::default(),
            &mut tooltips,
            &mut popovers,
        )
        .unwrap();
        assert_eq!(2, report.tooltips);
        assert_eq!(1, report.validated_forms);

        let event = document.submit(form).unwrap();
        (
            event.default_prevented(),
            document.has_class(form, "was-validated"),
        )
    }

    #[rstest]
    fn test_guest_form_submission(guest: Guest) {
        assert_eq!((true, true), submit_guest_form(None));
        assert_eq!((false, true), submit_guest_form(Some(&guest)));

        let short_permit = Guest {
            permit_number: "AB1".to_owned(),
            ..guest.clone()
        };
        assert_eq!((true, true), submit_guest_form(Some(&short_permit)));

        let province = Guest {
            birthplace_code: Some("SV".to_owned()),
            ..guest
        };
        assert_eq!((true, true), submit_guest_form(Some(&province)));
    }

    #[test]
    fn test_guest_form_shape() {
        let mut document = Document::new();
        let root = document.root();
        guest_form(&mut document, root).unwrap();
        let required = Selector::parse("[required]").unwrap();
        assert_eq!(8, document.query_selector_all(&required).len());
        let readonly = Selector::parse("input[readonly]").unwrap();
        assert_eq!(2, document.query_selector_all(&readonly).len());
    }
}
