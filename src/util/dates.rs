//! Date helpers for fixed width `yyyyMMdd` date strings.
//!
//! All functions are pure, they take and return plain values.

use chrono::NaiveDate;

use crate::Result;

/// Date format used in qualifiers and in DateFrequencyMap keys.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Width of a formatted date.
pub const DATE_WIDTH: usize = 8;

/// Parse a `yyyyMMdd` date string.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if !is_date_shaped(s.as_bytes()) {
        err_at!(InvalidFormat, msg: "date {:?} is not yyyyMMdd", s)?
    }
    err_at!(InvalidFormat, NaiveDate::parse_from_str(s, DATE_FORMAT), "date:{:?}", s)
}

/// Format `date` as `yyyyMMdd`.
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Return true if `date` is exactly eight ascii digits. Calendar
/// validity is not checked, refer to [parse_date] for that.
pub fn is_date_shaped(date: &[u8]) -> bool {
    date.len() == DATE_WIDTH && date.iter().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[path = "dates_test.rs"]
mod dates_test;
