//! Configuration for the sales pipeline.

use std::path::{Path, PathBuf};

use parquet::basic::Compression;

use crate::reader::DEFAULT_BATCH_SIZE;
use crate::schema::adapt::DateFormatConfig;
use crate::sink::ExistingOutput;

/// Configuration for [`crate::pipeline::run`]
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the input files; outputs are written here too
    pub dataset_dir: PathBuf,
    /// Glob of the input CSV files, relative to `dataset_dir`
    pub input_pattern: String,
    /// Field delimiter of the input CSV files
    pub delimiter: u8,
    /// Rows per record batch when reading
    pub batch_size: usize,
    /// Codec of every Parquet output
    pub compression: Compression,
    /// Policy for partitioned outputs left by an earlier run
    pub existing_output: ExistingOutput,
    /// Formats accepted when order dates are parsed
    pub date_format_config: DateFormatConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            input_pattern: "Sales*.csv".to_string(),
            delimiter: b',',
            batch_size: DEFAULT_BATCH_SIZE,
            compression: Compression::SNAPPY,
            existing_output: ExistingOutput::OverwriteOrIgnore,
            date_format_config: DateFormatConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration over `dataset_dir`
    pub fn new(dataset_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_input_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.input_pattern = pattern.into();
        self
    }

    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub const fn with_existing_output(mut self, existing: ExistingOutput) -> Self {
        self.existing_output = existing;
        self
    }

    #[must_use]
    pub fn with_date_format_config(mut self, config: DateFormatConfig) -> Self {
        self.date_format_config = config;
        self
    }

    /// Full glob of the input files
    #[must_use]
    pub fn input_glob(&self) -> String {
        self.output_path(&self.input_pattern).to_string_lossy().into_owned()
    }

    /// Path of an output below the dataset directory
    #[must_use]
    pub fn output_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dataset_dir.join(name)
    }
}
