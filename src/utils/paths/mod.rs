//! Path utilities for partitioned datasets

pub mod hive;

pub use hive::{
    NULL_PARTITION_VALUE, PartitionValues, escape_partition_value, partition_dir_name,
    partition_values, unescape_partition_value,
};
