use chrono::{DateTime, NaiveDate};

/// Parses a spreadsheet amount such as `1,200,000`, `12.5%` or `50,000원`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ',' | '%' | '원') && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses a period index cell (`1`, `2.0`). Zero and fractions are rejected.
pub fn parse_index(raw: &str) -> Option<u32> {
    let value = parse_amount(raw)?;
    if value >= 1.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

/// Parses the date spellings seen in rule and contract sheets:
/// `2025-03-01`, `2025.03.01`, `2025/3/1`, `20250301`, RFC 3339 timestamps
/// and `2025-03-01 00:00:00`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().date());
    }

    let date_part = trimmed
        .split(|ch: char| ch == 'T' || ch.is_whitespace())
        .next()
        .unwrap_or(trimmed);

    if date_part.len() == 8 && date_part.chars().all(|ch| ch.is_ascii_digit()) {
        return NaiveDate::parse_from_str(date_part, "%Y%m%d").ok();
    }

    let unified = date_part.replace(['.', '/'], "-");
    NaiveDate::parse_from_str(unified.trim_end_matches('-'), "%Y-%m-%d").ok()
}

pub(crate) fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
