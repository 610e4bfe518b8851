use chrono::{Datelike, Months, NaiveDate};

/// Months a residence permit stays valid unless configured otherwise.
pub const DEFAULT_VALIDITY_MONTHS: u32 = 6;

/// Returns the expiry date of a permit issued on `issue`, valid for `months` calendar months.
///
/// The day of month is clamped to 28 first, so that every target month has that day. Returns
/// `None` only if the result is out of chrono's range.
///
/// ```
/// use ancora::permit::expiry_date;
/// use chrono::NaiveDate;
///
/// let issue = NaiveDate::from_ymd_opt(2024, 8, 31).unwrap();
/// assert_eq!(expiry_date(issue, 6), NaiveDate::from_ymd_opt(2025, 2, 28));
/// ```
pub fn expiry_date(issue: NaiveDate, months: u32) -> Option<NaiveDate> {
    issue
        .with_day(issue.day().min(28))?
        .checked_add_months(Months::new(months))
}

/// Whether a permit expiring on `expiry` is expired as of `today`. A permit expiring today counts
/// as expired.
pub fn is_expired(expiry: NaiveDate, today: NaiveDate) -> bool {
    expiry <= today
}
