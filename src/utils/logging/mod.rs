//! Logging utilities for output and timing
//!
//! This module provides utilities for logging and console output.

pub mod console;
pub mod log;

// Re-export commonly used functions for convenience
pub use console::{format_table_head, print_schema_info, print_table_head};
pub use log::{log_operation_complete, log_operation_start, log_warning};
