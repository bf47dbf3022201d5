//! Date shapes found on receipts.
//!
//! The extraction engine reports the raw matched substring; turning it into
//! a calendar date is left to callers through [`normalize_date`].

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMERIC_YMD: Regex = Regex::new(
        r"^([0-9]{4})[-/.]([0-9]{1,2})[-/.]([0-9]{1,2})$"
    ).unwrap();

    static ref NUMERIC_DMY: Regex = Regex::new(
        r"^([0-9]{1,2})[-/.]([0-9]{1,2})[-/.]([0-9]{2,4})$"
    ).unwrap();

    static ref TEXTUAL_DMY: Regex = Regex::new(
        r"(?i)^([0-9]{1,2})\s*([a-z]{3})[a-z]*\.?\s*([0-9]{2,4})$"
    ).unwrap();
}

/// Default English month abbreviations.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Convert a raw date match into a calendar date.
///
/// Numeric dates are read day-first unless they start with a four-digit
/// year. Two-digit years pivot at 50 (`24` is 2024, `75` is 1975). Month
/// names are read from their first three letters, English only.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Some(caps) = NUMERIC_YMD.captures(raw) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = NUMERIC_DMY.captures(raw) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3])?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = TEXTUAL_DMY.captures(raw) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year = parse_year(&caps[3])?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(match (s.len(), year) {
        (2, y) if y <= 50 => 2000 + y,
        (2, y) => 1900 + y,
        (_, y) => y,
    })
}

fn month_number(abbrev: &str) -> Option<u32> {
    let abbrev = abbrev.to_ascii_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.to_ascii_lowercase() == abbrev)
        .map(|i| i as u32 + 1)
}
