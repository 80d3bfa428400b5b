//! Console output utilities
//!
//! This module provides utilities for formatted console output.

use arrow::util::pretty::pretty_format_batches;

use crate::error::Result;
use crate::session::{ColumnDescription, Table};

/// Print column names and types as returned by `Session::describe`
pub fn print_schema_info(columns: &[ColumnDescription]) {
    println!("Schema:");
    for column in columns {
        println!("  - {} ({})", column.column_name, column.column_type);
    }
}

/// Render the first `num_rows` rows of a table as an ASCII table
pub fn format_table_head(table: &Table, num_rows: usize) -> Result<String> {
    let head = table.concat()?;
    let head = head.slice(0, num_rows.min(head.num_rows()));
    Ok(pretty_format_batches(&[head])?.to_string())
}

/// Print the first `num_rows` rows of a table
pub fn print_table_head(table: &Table, num_rows: usize) -> Result<()> {
    println!("First {num_rows} rows:");
    println!("{}", format_table_head(table, num_rows)?);
    Ok(())
}
