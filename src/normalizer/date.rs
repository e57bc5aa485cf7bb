use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Formats carrying an explicit offset, beyond strict RFC 3339 / RFC 2822.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
];

/// Formats without an offset; these are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse any date string a feed is likely to carry.
///
/// Returns `None` instead of failing so a malformed date only costs the item
/// its timestamp.
pub fn normalize_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Origins often get the weekday wrong; the date itself is authoritative.
    let with_offset = parse_with_offset(s).or_else(|| strip_weekday(s).and_then(parse_with_offset));
    if with_offset.is_some() {
        return with_offset;
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_with_offset(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_rfc2822_utc_suffix(s) {
        return Some(dt);
    }

    OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(s, format).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// `Tue, 01 Jan 2024 ...` without its leading day name.
fn strip_weekday(s: &str) -> Option<&str> {
    let (day, rest) = s.split_once(',')?;
    if day.len() >= 3 && day.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// `Mon, 01 Jan 2024 00:00:00 UTC` and friends.
fn parse_rfc2822_utc_suffix(s: &str) -> Option<DateTime<Utc>> {
    let base = s
        .strip_suffix("UTC")
        .or_else(|| s.strip_suffix("Z"))?
        .trim_end();
    DateTime::parse_from_rfc2822(&format!("{} +0000", base))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
