//! Module for classifying Arrow data types.

use arrow::datatypes::DataType;
use arrow_schema::DECIMAL128_MAX_PRECISION;

/// Check if a data type is an integer type
#[must_use]
pub const fn is_integer(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a data type is numeric
#[must_use]
pub const fn is_numeric(data_type: &DataType) -> bool {
    is_integer(data_type)
        || matches!(
            data_type,
            DataType::Float16
                | DataType::Float32
                | DataType::Float64
                | DataType::Decimal128(_, _)
        )
}

/// Check if a data type is a string type
#[must_use]
pub const fn is_string(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View)
}

/// Check if a data type is a date or timestamp type
#[must_use]
pub const fn is_temporal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}

/// The type both sides of an arithmetic operation are cast to
///
/// Decimals win over floats, floats win over integers. Decimal operands are
/// widened to the maximum precision so that products do not overflow the
/// declared precision.
#[must_use]
pub fn common_numeric_type(left: &DataType, right: &DataType) -> Option<(DataType, DataType)> {
    if !is_numeric(left) || !is_numeric(right) {
        return None;
    }

    let widen = |data_type: &DataType| match data_type {
        DataType::Decimal128(_, scale) => DataType::Decimal128(DECIMAL128_MAX_PRECISION, *scale),
        _ => DataType::Decimal128(DECIMAL128_MAX_PRECISION, 0),
    };

    match (left, right) {
        (DataType::Decimal128(_, _), _) | (_, DataType::Decimal128(_, _))
            if !is_float(left) && !is_float(right) =>
        {
            Some((widen(left), widen(right)))
        }
        _ if is_float(left) || is_float(right) => Some((DataType::Float64, DataType::Float64)),
        _ => Some((DataType::Int64, DataType::Int64)),
    }
}

const fn is_float(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Float16 | DataType::Float32 | DataType::Float64
    )
}

/// Render an Arrow data type with the SQL name an analytical database uses
#[must_use]
pub fn sql_type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Boolean => "BOOLEAN".to_string(),
        DataType::Int8 => "TINYINT".to_string(),
        DataType::Int16 => "SMALLINT".to_string(),
        DataType::Int32 => "INTEGER".to_string(),
        DataType::Int64 => "BIGINT".to_string(),
        DataType::UInt8 => "UTINYINT".to_string(),
        DataType::UInt16 => "USMALLINT".to_string(),
        DataType::UInt32 => "UINTEGER".to_string(),
        DataType::UInt64 => "UBIGINT".to_string(),
        DataType::Float16 | DataType::Float32 => "FLOAT".to_string(),
        DataType::Float64 => "DOUBLE".to_string(),
        DataType::Decimal128(precision, scale) => format!("DECIMAL({precision},{scale})"),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "VARCHAR".to_string(),
        DataType::Date32 | DataType::Date64 => "DATE".to_string(),
        DataType::Timestamp(_, None) => "TIMESTAMP".to_string(),
        DataType::Timestamp(_, Some(_)) => "TIMESTAMP WITH TIME ZONE".to_string(),
        DataType::Null => "NULL".to_string(),
        other => other.to_string().to_uppercase(),
    }
}
