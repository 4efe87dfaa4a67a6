//! Metrics command - summarizes a recorded metrics file

use std::path::PathBuf;

use clap::Args;

use crate::domain::AggregateMetrics;
use crate::infrastructure::metrics::MetricsFile;

#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Metrics file; defaults to `monitoring.metrics_file`
    #[arg(long)]
    pub file: Option<PathBuf>,
}

pub async fn run(args: MetricsArgs) -> anyhow::Result<()> {
    let config = super::load_config();
    super::init_console_logging(&config);

    let path = args
        .file
        .or_else(|| config.monitoring.metrics_file.map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("No metrics file configured; pass --file"))?;

    let file = MetricsFile::load(&path)?;
    let aggregate = AggregateMetrics::from_records(&file.queries);

    println!("{}", aggregate.summary());
    println!("Last updated: {}", file.last_updated.to_rfc3339());

    Ok(())
}
