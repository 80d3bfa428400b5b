//! Column typing for the sales pipeline.
//!
//! `adapt` holds the cast kernels and date parsing, `sales` the column
//! layout of the dataset and `normalize` the cast plans applied to raw
//! tables.

pub mod adapt;
pub mod normalize;
pub mod sales;

pub use adapt::{CastMode, DateFormatConfig, cast_column, sql_type_name};
pub use normalize::{ColumnCast, NormalizationPlan, normalize_into};
pub use sales::{normalized_sales_schema, raw_sales_schema};
