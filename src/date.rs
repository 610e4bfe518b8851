use crate::error::DateError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use core::fmt::{self, Display};

const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// Formats a `YYYY-MM-DD` date string as `DD/MM/YYYY`.
///
/// This is a string rearrangement, not a calendar conversion: the three dash-separated segments
/// are reversed and joined with slashes, and no range check is done on them.
///
/// - An absent or empty input gives an empty string.
/// - An input that does not split into exactly three segments is returned unchanged.
///
/// ```
/// use ancora::format_date_it;
///
/// assert_eq!(format_date_it(Some("2024-03-07")), "07/03/2024");
/// assert_eq!(format_date_it(Some("2024-03")), "2024-03");
/// assert_eq!(format_date_it(None), "");
/// ```
pub fn format_date_it(date: Option<&str>) -> String {
    let date = match date {
        Some(date) if !date.is_empty() => date,
        _ => return String::new(),
    };

    let parts: Vec<&str> = date.split('-').collect();
    match parts.as_slice() {
        [year, month, day] => format!("{day}/{month}/{year}"),
        _ => date.to_owned(),
    }
}

/// Parses a strict `YYYY-MM-DD` date, as accepted on the command line and in guest records.
pub fn parse_iso_date(date: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|source| DateError::Unparseable {
        date: date.to_owned(),
        source,
    })
}

/// A point in time that a day difference can be computed from.
///
/// Anything date-like converts into a `Moment`. Strings are coerced leniently, and a string that
/// can't be coerced becomes [`Moment::Invalid`] rather than an error, so that the day difference
/// of an invalid input is simply undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
    /// A valid instant.
    At(DateTime<Utc>),
    /// The coercion of something that isn't a date.
    Invalid,
}

impl Moment {
    /// The current instant.
    pub fn now() -> Self {
        Self::At(Utc::now())
    }

    /// Coerces a string into a moment.
    ///
    /// Accepted, in order:
    ///
    /// - RFC 3339 with an offset, e.g. `2024-03-07T10:00:00+01:00`.
    /// - A date and time without an offset (`T` or space separated, seconds optional), taken as
    ///   UTC.
    /// - A plain `YYYY-MM-DD` date, taken as UTC midnight.
    pub fn coerce(input: &str) -> Self {
        let input = input.trim();

        if let Ok(at) = DateTime::parse_from_rfc3339(input) {
            return Self::At(at.with_timezone(&Utc));
        }

        const NAIVE_FORMATS: [&str; 4] = [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ];
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return naive.into();
            }
        }

        match NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            Ok(date) => date.into(),
            Err(_) => Self::Invalid,
        }
    }

    /// Returns the instant, or `None` for [`Moment::Invalid`].
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Invalid => None,
        }
    }
}

impl From<DateTime<Utc>> for Moment {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

impl From<NaiveDateTime> for Moment {
    fn from(naive: NaiveDateTime) -> Self {
        Self::At(Utc.from_utc_datetime(&naive))
    }
}

impl From<NaiveDate> for Moment {
    fn from(date: NaiveDate) -> Self {
        Self::from(date.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<&str> for Moment {
    fn from(input: &str) -> Self {
        Self::coerce(input)
    }
}

impl From<&String> for Moment {
    fn from(input: &String) -> Self {
        Self::coerce(input)
    }
}

impl Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(at) => write!(f, "{}", at.to_rfc3339()),
            Self::Invalid => f.write_str("Invalid Date"),
        }
    }
}

/// Returns the number of days from `start` to `end`, rounding the millisecond difference up to
/// the next whole day.
///
/// `start` defaults to the current moment. The result is positive when `end` is after `start`
/// and negative when it is before. The ceiling is applied literally, so 1.5 days gives `2` and
/// -1.5 days gives `-1`.
///
/// Returns `None` if either input is [`Moment::Invalid`].
///
/// ```
/// use ancora::days_between_dates;
///
/// assert_eq!(days_between_dates("2024-03-08", Some("2024-03-07".into())), Some(1));
/// assert_eq!(days_between_dates("not a date", None), None);
/// ```
pub fn days_between_dates(end: impl Into<Moment>, start: Option<Moment>) -> Option<i64> {
    days_between_dates_at(end, start, Moment::now())
}

/// [`days_between_dates`], with the fallback for a missing `start` given explicitly.
pub fn days_between_dates_at(
    end: impl Into<Moment>,
    start: Option<Moment>,
    now: Moment,
) -> Option<i64> {
    let end = end.into().instant()?;
    let start = start.unwrap_or(now).instant()?;
    let millis = end.signed_duration_since(start).num_milliseconds();
    Some(ceil_div(millis, MILLIS_PER_DAY))
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    let quotient = numerator / denominator;
    // truncation already rounds negative quotients up
    if numerator % denominator > 0 {
        quotient + 1
    } else {
        quotient
    }
}
