//! The sales ETL pipeline.
//!
//! Reads `Sales*.csv` from the dataset directory, exports the combined rows
//! as CSV, Parquet and a partitioned Parquet tree, reads that tree back,
//! types it into the `sales` table and exports the aggregate view built
//! over it.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::aggregate::GroupedQuery;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::reader::{CsvSource, ParquetSource};
use crate::schema::normalize::normalize_into;
use crate::schema::sales::{CITY, PRODUCT_TYPE};
use crate::schema::{NormalizationPlan, raw_sales_schema};
use crate::session::{ColumnDescription, Session, Table};
use crate::sink::{CopyOptions, CopySummary, FileFormat};
use crate::utils::logging::log_warning;

/// Table holding the combined input files
pub const RAW_TABLE: &str = "T1";
/// Table holding the partitioned files read back
pub const PARTITIONED_TABLE: &str = "sales_raw";
/// Typed sales table
pub const SALES_TABLE: &str = "sales";

/// Flat CSV copy of the input
pub const RESULT_CSV: &str = "result.csv";
/// Flat Parquet copy of the input
pub const RESULT_PARQUET: &str = "result-snappy.parquet";
/// Input partitioned by city and product type
pub const SALES_PARTITION: &str = "sales_partition";
/// Flat Parquet copy of the aggregate view
pub const AGGREGATE_PARQUET: &str = "aggregate_view-snappy.parquet";
/// Aggregate view partitioned by city and product
pub const AGGREGATE_PARTITION: &str = "aggregate_partition";

/// Outcome of one pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: String,
    pub rows: usize,
    pub files: usize,
    pub elapsed_ms: u64,
}

/// Outcome of a full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
    /// Column types of the `sales` table
    pub sales_columns: Vec<ColumnDescription>,
    /// Contents of the aggregate view at the end of the run
    #[serde(skip)]
    pub aggregate: Option<Table>,
}

impl PipelineReport {
    /// Report of the step named `step`, if it ran
    #[must_use]
    pub fn step(&self, step: &str) -> Option<&StepReport> {
        self.steps.iter().find(|report| report.step == step)
    }
}

struct StepTimer {
    name: String,
    start: Instant,
}

impl StepTimer {
    fn start(name: &str) -> Self {
        log::info!("Step {name}");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    fn finish(self, summary: CopySummary) -> StepReport {
        let elapsed_ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::info!(
            "Step {} done: {} rows, {} files in {elapsed_ms} ms",
            self.name,
            summary.rows,
            summary.files
        );
        StepReport {
            step: self.name,
            rows: summary.rows,
            files: summary.files,
            elapsed_ms,
        }
    }
}

/// Runs the pipeline over `config.dataset_dir`
///
/// Any failing step aborts the run; sessions opened so far are closed
/// before the error is returned.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    let start = Instant::now();
    log::info!("Running sales pipeline in {}", config.dataset_dir.display());

    let parquet = FileFormat::Parquet {
        compression: config.compression,
    };

    let report = Session::scoped(|session| {
        let mut steps = Vec::new();

        let timer = StepTimer::start("read_csv");
        let input = CsvSource::new(config.input_glob())
            .with_schema(raw_sales_schema())
            .with_delimiter(config.delimiter)
            .with_batch_size(config.batch_size)
            .read_table()?;
        let rows = input.num_rows();
        session.create_or_replace_table(RAW_TABLE, input)?;
        steps.push(timer.finish(CopySummary { rows, files: 0 }));

        let exports = [
            ("export_csv", RESULT_CSV, CopyOptions::new(FileFormat::csv())),
            ("export_parquet", RESULT_PARQUET, CopyOptions::new(parquet)),
            (
                "export_sales_partition",
                SALES_PARTITION,
                CopyOptions::new(parquet)
                    .with_partition_by([CITY, PRODUCT_TYPE])
                    .with_existing(config.existing_output),
            ),
        ];
        for (step, name, options) in exports {
            let timer = StepTimer::start(step);
            let summary = session.copy_to(RAW_TABLE, &config.output_path(name), &options)?;
            steps.push(timer.finish(summary));
        }

        let (inner_steps, sales_columns, aggregate) =
            Session::scoped(|session| transform(session, config, parquet))?;
        steps.extend(inner_steps);

        Ok(PipelineReport {
            steps,
            sales_columns,
            aggregate: Some(aggregate),
        })
    })?;

    log::info!("Sales pipeline finished in {:?}", start.elapsed());
    Ok(report)
}

/// Reads the partitioned copy back, types it and exports the aggregate view
fn transform(
    session: &mut Session,
    config: &PipelineConfig,
    parquet: FileFormat,
) -> Result<(Vec<StepReport>, Vec<ColumnDescription>, Table)> {
    let mut steps = Vec::new();

    let timer = StepTimer::start("read_partitioned");
    let pattern = config.output_path(SALES_PARTITION).join("*/*/*.parquet");
    let source = ParquetSource::new(pattern.to_string_lossy())
        .with_hive_partitioning(true)
        .with_batch_size(config.batch_size)
        .into_batches()?;
    let files = source.remaining_files().len();
    let schema = source.schema();
    let mut table = Table::try_from_batches(schema, source)?;
    if table.schema().fields().is_empty() {
        log_warning("No partitioned files to read back", Some(&pattern));
        table = Table::empty(raw_sales_schema());
    }
    let rows = table.num_rows();
    session.create_or_replace_table(PARTITIONED_TABLE, table)?;
    steps.push(timer.finish(CopySummary { rows, files }));

    let timer = StepTimer::start("normalize");
    let rows = normalize_into(
        session,
        PARTITIONED_TABLE,
        SALES_TABLE,
        &NormalizationPlan::sales(),
        &config.date_format_config,
    )?;
    steps.push(timer.finish(CopySummary { rows, files: 0 }));

    let sales_columns = session.describe(SALES_TABLE)?;
    for column in &sales_columns {
        log::info!("{}: {}", column.column_name, column.column_type);
    }

    let timer = StepTimer::start("aggregate");
    session.create_or_replace_view(
        GroupedQuery::SALES_VIEW,
        Arc::new(GroupedQuery::sales_aggregate()),
    )?;
    let aggregate = session.scan(GroupedQuery::SALES_VIEW)?;
    steps.push(timer.finish(CopySummary {
        rows: aggregate.num_rows(),
        files: 0,
    }));

    let exports = [
        ("export_aggregate_parquet", AGGREGATE_PARQUET, CopyOptions::new(parquet)),
        (
            "export_aggregate_partition",
            AGGREGATE_PARTITION,
            CopyOptions::new(parquet)
                .with_partition_by(["city", "product"])
                .with_existing(config.existing_output),
        ),
    ];
    for (step, name, options) in exports {
        let timer = StepTimer::start(step);
        let summary = session.copy_to(GroupedQuery::SALES_VIEW, &config.output_path(name), &options)?;
        steps.push(timer.finish(summary));
    }

    Ok((steps, sales_columns, aggregate))
}
