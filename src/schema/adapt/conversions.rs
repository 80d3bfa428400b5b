//! Module for casting Arrow arrays to target column types.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, Date32Builder, Int64Builder};
use arrow::compute::kernels::cast::{self, CastOptions};
use arrow::datatypes::{DataType, Date32Type};
use arrow::util::display::FormatOptions;

use crate::error::{PipelineError, Result};
use crate::schema::adapt::compatibility::is_string;
use crate::schema::adapt::date_utils::parse_date_string;
use crate::schema::adapt::types::{CastMode, DateFormatConfig};

/// Cast an Arrow array to the target data type
///
/// # Arguments
/// * `array` - The column to convert
/// * `column` - Name of the column, used in error messages
/// * `target_type` - The data type to convert to
/// * `mode` - Whether failing values abort the cast or become null
/// * `date_config` - Formats accepted when strings are parsed as dates
///
/// # Errors
/// Returns `PipelineError::StrictCast` when a strict cast meets a value it
/// cannot convert, and an Arrow error when the conversion is unsupported.
pub fn cast_column(
    array: &ArrayRef,
    column: &str,
    target_type: &DataType,
    mode: CastMode,
    date_config: &DateFormatConfig,
) -> Result<ArrayRef> {
    let source_type = array.data_type();

    if source_type == target_type {
        return Ok(Arc::clone(array));
    }

    match (mode, source_type, target_type) {
        (CastMode::Passthrough, _, _) => Ok(Arc::clone(array)),

        // Dates go through the configured chrono formats
        (_, s, &DataType::Date32) if is_string(s) => {
            convert_string_to_date32(array, column, mode, date_config)
        }

        // Integers accept padding and a fractional part, which is rounded
        (_, s, t) if is_string(s) && t.is_integer() => {
            convert_string_to_integer(array, column, target_type, mode)
        }

        _ => {
            let options = CastOptions {
                safe: mode.is_safe(),
                format_options: FormatOptions::default(),
            };
            cast::cast_with_options(array, target_type, &options).map_err(|e| match mode {
                CastMode::Strict if cast::can_cast_types(source_type, target_type) => {
                    PipelineError::StrictCast {
                        column: column.to_string(),
                        data_type: target_type.clone(),
                        message: e.to_string(),
                    }
                }
                _ => PipelineError::Arrow(e),
            })
        }
    }
}

/// Normalise LargeUtf8 and Utf8View to plain Utf8
fn as_utf8(array: &ArrayRef) -> Result<ArrayRef> {
    if array.data_type() == &DataType::Utf8 {
        Ok(Arc::clone(array))
    } else {
        Ok(cast::cast(array, &DataType::Utf8)?)
    }
}

/// Parse an integer, ignoring surrounding whitespace
///
/// Decimal and exponent forms are rounded half away from zero.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(value) = s.parse::<i64>() {
        return Some(value);
    }

    let value = s.parse::<f64>().ok().filter(|v| v.is_finite())?.round();
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    in_range.then_some(value as i64)
}

/// Convert a string array to an integer array of `target_type`
fn convert_string_to_integer(
    array: &ArrayRef,
    column: &str,
    target_type: &DataType,
    mode: CastMode,
) -> Result<ArrayRef> {
    let array = as_utf8(array)?;
    let string_array = array.as_string::<i32>();

    let mut builder = Int64Builder::with_capacity(string_array.len());

    for value in string_array {
        let Some(int_str) = value else {
            builder.append_null();
            continue;
        };

        match parse_integer(int_str) {
            Some(parsed) => builder.append_value(parsed),
            None if mode.is_safe() => builder.append_null(),
            None => {
                return Err(PipelineError::StrictCast {
                    column: column.to_string(),
                    data_type: target_type.clone(),
                    message: format!("Cannot parse '{int_str}' as {target_type}"),
                });
            }
        }
    }

    let parsed: ArrayRef = Arc::new(builder.finish());
    if target_type == &DataType::Int64 {
        return Ok(parsed);
    }

    // Narrowing: out of range values follow the cast mode
    let options = CastOptions {
        safe: mode.is_safe(),
        format_options: FormatOptions::default(),
    };
    cast::cast_with_options(&parsed, target_type, &options).map_err(|e| {
        PipelineError::StrictCast {
            column: column.to_string(),
            data_type: target_type.clone(),
            message: e.to_string(),
        }
    })
}

/// Convert a string array to a Date32 array
fn convert_string_to_date32(
    array: &ArrayRef,
    column: &str,
    mode: CastMode,
    date_config: &DateFormatConfig,
) -> Result<ArrayRef> {
    let array = as_utf8(array)?;
    let string_array = array.as_string::<i32>();

    let mut builder = Date32Builder::with_capacity(string_array.len());

    for value in string_array {
        let Some(date_str) = value else {
            builder.append_null();
            continue;
        };

        match parse_date_string(date_str, date_config) {
            Some(date) => builder.append_value(Date32Type::from_naive_date(date)),
            None if mode.is_safe() => builder.append_null(),
            None => {
                return Err(PipelineError::StrictCast {
                    column: column.to_string(),
                    data_type: DataType::Date32,
                    message: format!("Cannot parse '{date_str}' as a date"),
                });
            }
        }
    }

    Ok(Arc::new(builder.finish()) as ArrayRef)
}
