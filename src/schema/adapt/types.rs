//! Core types for column casting.

/// How a cast reacts to a value it cannot convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastMode {
    /// Abort the step with an error
    Strict,
    /// Replace the value with null and keep the row
    Tolerant,
    /// Hand the column through without conversion
    Passthrough,
}

impl CastMode {
    /// Whether a failing value becomes null instead of an error
    #[must_use]
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Tolerant)
    }
}

/// Configuration for date format handling
#[derive(Debug, Clone)]
pub struct DateFormatConfig {
    /// List of date format strings to try when parsing dates
    pub date_formats: Vec<String>,
    /// Enable heuristic format detection
    pub enable_format_detection: bool,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            date_formats: vec!["%Y-%m-%d".to_string()],
            enable_format_detection: false,
        }
    }
}

impl DateFormatConfig {
    /// A configuration that also accepts common regional layouts
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            date_formats: vec![
                "%Y-%m-%d".to_string(), // ISO format: 2023-01-15
                "%m/%d/%Y".to_string(), // US: 01/15/2023
                "%m/%d/%y".to_string(), // US short: 01/15/23
                "%d.%m.%Y".to_string(), // German/Danish: 15.01.2023
                "%Y%m%d".to_string(),   // Compact: 20230115
                "%d %b %Y".to_string(), // 15 Jan 2023
            ],
            enable_format_detection: true,
        }
    }
}
