//! Row-oriented models of the sales data.

pub mod sales;

pub use sales::{RawSalesRecord, raw_sales_batch, raw_sales_records};
