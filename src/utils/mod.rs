//! Shared utilities: logging helpers and partition path handling

pub mod logging;
pub mod paths;

pub use logging::{log_operation_complete, log_operation_start, log_warning};
