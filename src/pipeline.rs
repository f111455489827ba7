//! Fetch → align → correlate → report, run once.

use chrono::{NaiveDate, Utc};
use std::io::Write;
use tracing::info;

use crate::analysis::{align, correlate, CorrelationTable, MergedTable};
use crate::collector::{fetch_all, MarketDataSource, ProtocolFetch};
use crate::config::AppConfig;
use crate::domain::DateWindow;
use crate::error::Result;
use crate::report;

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub window: DateWindow,
    pub fetches: Vec<ProtocolFetch>,
    pub merged: MergedTable,
    pub correlations: CorrelationTable,
}

/// Run the pipeline for the window ending relative to today's UTC date, printing to stdout
pub async fn run<S>(config: &AppConfig, source: &S) -> Result<RunOutput>
where
    S: MarketDataSource + ?Sized,
{
    let today = Utc::now().date_naive();
    run_at(config, source, today, &mut std::io::stdout()).await
}

/// Run the pipeline with an explicit reference date; fetch errors and the summary go to `out`
pub async fn run_at<S, W>(
    config: &AppConfig,
    source: &S,
    today: NaiveDate,
    out: &mut W,
) -> Result<RunOutput>
where
    S: MarketDataSource + ?Sized,
    W: Write,
{
    config.validate()?;

    let window = DateWindow::ending_before(today, config.window.days, config.window.end_offset_days)?;
    info!(
        start = %window.start,
        end = %window.end,
        protocols = config.protocols.len(),
        "Starting TVL/price lag analysis"
    );

    let fetches = fetch_all(source, config, out).await?;
    let merged = align(&window, &fetches);
    let correlations = correlate(&merged, &config.lags.range());

    report::save_merged_table(&config.output.data_path(), &merged)?;
    report::save_correlation_table(&config.output.correlations_path(), &correlations)?;
    report::write_summary(out, &correlations)?;

    Ok(RunOutput {
        window,
        fetches,
        merged,
        correlations,
    })
}
