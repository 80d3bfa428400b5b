//! Module for casting columns between data types.

pub mod compatibility;
pub mod conversions;
pub mod date_utils;
pub mod types;

// Re-export the main types and functions for easier access
pub use compatibility::{
    common_numeric_type, is_integer, is_numeric, is_string, is_temporal, sql_type_name,
};
pub use conversions::cast_column;
pub use date_utils::{detect_date_format, parse_date_string};
pub use types::{CastMode, DateFormatConfig};
