//! Month keys (`YYYY-MM`) used to partition and filter receipts
//!
//! Month keys are derived from the local calendar, so the month a receipt
//! belongs to depends on the time zone of the machine computing the key.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MONTH_NAMES_PT_BR: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// A calendar month, displayed as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key, validating the month number (1-12)
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(Error::InvalidData(format!(
                "Invalid month: {}-{}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// Month of a date-time, using local calendar fields
    pub fn of<Tz: TimeZone>(date: &DateTime<Tz>) -> Self {
        Self::of_in(date, &Local)
    }

    /// Month of a date-time on the calendar of `zone`
    pub fn of_in<Tz: TimeZone, Z: TimeZone>(date: &DateTime<Tz>, zone: &Z) -> Self {
        let zoned = date.with_timezone(zone);
        Self {
            year: zoned.year(),
            month: zoned.month(),
        }
    }

    /// Month of an ISO-8601 date string
    pub fn of_iso(date: &str) -> Result<Self> {
        parse_iso_datetime(date)
            .map(|dt| Self::of(&dt))
            .ok_or_else(|| Error::InvalidData(format!("Unparsable date: {}", date)))
    }

    /// The current local month
    pub fn current() -> Self {
        Self::of(&Local::now())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shift by a number of months (negative goes back)
    pub fn add_months(&self, delta: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn prev(&self) -> Self {
        self.add_months(-1)
    }

    pub fn next(&self) -> Self {
        self.add_months(1)
    }

    /// First day of the month as `YYYY-MM-01`
    ///
    /// Also the inclusive lower bound when filtering ISO date strings.
    pub fn first_day(&self) -> String {
        format!("{}-01", self)
    }

    /// Human label in Portuguese, e.g. "março de 2025"
    pub fn label_pt_br(&self) -> String {
        format!(
            "{} de {}",
            MONTH_NAMES_PT_BR[(self.month - 1) as usize],
            self.year
        )
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidData(format!("Invalid month (expected YYYY-MM): {}", s));

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// Derive the `YYYY-MM` key for an ISO date string
pub fn month_key(date: &str) -> Result<String> {
    MonthKey::of_iso(date).map(|key| key.to_string())
}

/// Parse the date formats the model and the store produce
///
/// - RFC 3339 with offset or `Z`
/// - naive date-time (interpreted in local time)
/// - bare `YYYY-MM-DD` (interpreted as UTC midnight)
pub fn parse_iso_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_month_key_shape(s: &str) -> bool {
        let bytes = s.as_bytes();
        bytes.len() == 7
            && bytes[4] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || b.is_ascii_digit())
    }

    #[test]
    fn test_month_key_shape_and_stability() {
        let now = Local::now();
        let a = MonthKey::of(&now).to_string();
        let b = MonthKey::of(&now).to_string();
        assert_eq!(a, b);
        assert!(is_month_key_shape(&a), "bad key: {}", a);
    }

    #[test]
    fn test_month_key_from_iso_string() {
        // Mid-month so the local time zone cannot move it
        assert_eq!(month_key("2025-03-15T12:00:00.000Z").unwrap(), "2025-03");
        assert_eq!(month_key("2025-11-20").unwrap(), "2025-11");
        assert!(month_key("not a date").is_err());
    }

    #[test]
    fn test_zero_padding() {
        let key = MonthKey::new(2025, 1).unwrap();
        assert_eq!(key.to_string(), "2025-01");
        assert_eq!(key.first_day(), "2025-01-01");
    }

    #[test]
    fn test_parse() {
        let key: MonthKey = "2025-03".parse().unwrap();
        assert_eq!(key.year(), 2025);
        assert_eq!(key.month(), 3);

        assert!("2025-3".parse::<MonthKey>().is_err());
        assert!("2025-13".parse::<MonthKey>().is_err());
        assert!("2025-00".parse::<MonthKey>().is_err());
        assert!("march".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_add_months_across_years() {
        let key = MonthKey::new(2025, 1).unwrap();
        assert_eq!(key.prev().to_string(), "2024-12");
        assert_eq!(key.next().to_string(), "2025-02");
        assert_eq!(key.add_months(12).to_string(), "2026-01");
        assert_eq!(key.add_months(-13).to_string(), "2023-12");

        let december = MonthKey::new(2024, 12).unwrap();
        assert_eq!(december.next().to_string(), "2025-01");
    }

    #[test]
    fn test_label_pt_br() {
        assert_eq!(MonthKey::new(2025, 3).unwrap().label_pt_br(), "março de 2025");
        assert_eq!(MonthKey::new(2024, 12).unwrap().label_pt_br(), "dezembro de 2024");
    }

    #[test]
    fn test_serde_as_string() {
        let key = MonthKey::new(2025, 3).unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2025-03\"");
        let back: MonthKey = serde_json::from_str("\"2025-03\"").unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<MonthKey>("\"2025-99\"").is_err());
    }

    #[test]
    fn test_parse_iso_datetime_formats() {
        let utc = parse_iso_datetime("2025-03-01T10:00:00Z").unwrap();
        assert_eq!(utc.to_rfc3339(), "2025-03-01T10:00:00+00:00");

        let offset = parse_iso_datetime("2025-03-01T10:00:00-03:00").unwrap();
        assert_eq!(offset.to_rfc3339(), "2025-03-01T13:00:00+00:00");

        let date_only = parse_iso_datetime("2025-03-01").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2025-03-01T00:00:00+00:00");

        assert!(parse_iso_datetime("2025-03-01T10:30").is_some());
        assert!(parse_iso_datetime("").is_none());
        assert!(parse_iso_datetime("ontem").is_none());
    }
}
