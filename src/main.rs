use anyhow::Context;
use log::warn;
use sales_etl::utils::logging::{print_schema_info, print_table_head};
use sales_etl::{PipelineConfig, pipeline};

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::default();
    if !config.dataset_dir.exists() {
        warn!("Data directory not found: {}", config.dataset_dir.display());
        return Ok(());
    }

    let report = pipeline::run(&config)
        .with_context(|| format!("Sales pipeline failed in {}", config.dataset_dir.display()))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize the pipeline report")?
    );
    print_schema_info(&report.sales_columns);
    if let Some(aggregate) = &report.aggregate {
        print_table_head(aggregate, 5).context("Failed to render the aggregate view")?;
    }

    Ok(())
}
