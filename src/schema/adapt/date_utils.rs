//! Module for handling date parsing.

use chrono::NaiveDate;

use crate::schema::adapt::types::DateFormatConfig;

/// Parse a date string with multiple format attempts
#[must_use]
pub fn parse_date_string(s: &str, config: &DateFormatConfig) -> Option<NaiveDate> {
    let s = s.trim();

    for format in &config.date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    if config.enable_format_detection {
        if let Some(detected_format) = detect_date_format(s) {
            if let Ok(date) = NaiveDate::parse_from_str(s, detected_format) {
                return Some(date);
            }
        }
    }

    None
}

/// Try to detect the date format based on string patterns
#[must_use]
pub fn detect_date_format(s: &str) -> Option<&'static str> {
    // YYYY-MM-DD, possibly followed by a time part
    if s.len() >= 10 && s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-' {
        return Some(if s.len() == 10 { "%Y-%m-%d" } else { "%Y-%m-%d %H:%M:%S" });
    }

    if s.contains('/') {
        let parts: Vec<&str> = s.split(['/', ' ']).collect();
        if parts.len() >= 3 {
            if parts[0].len() == 4 {
                return Some("%Y/%m/%d");
            }
            return match (parts[2].len(), parts.len()) {
                (4, 3) => Some("%m/%d/%Y"),
                (2, 3) => Some("%m/%d/%y"),
                // 04/19/19 08:46
                (2, 4) => Some("%m/%d/%y %H:%M"),
                (4, 4) => Some("%m/%d/%Y %H:%M"),
                _ => None,
            };
        }
    }

    if s.len() == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        return Some("%Y%m%d");
    }

    None
}
