use clap::Parser;
use tracing::{error, info};
use tvl_price_lag::cli::Cli;
use tvl_price_lag::config::AppConfig;
use tvl_price_lag::error::Result;
use tvl_price_lag::logging::init_logging;
use tvl_price_lag::{pipeline, HttpMarketData};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config_dir)?;
    cli.apply(&mut config);

    let _guard = init_logging(&config.logging);

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e);
    }

    let source = HttpMarketData::from_config(&config)?;
    let output = pipeline::run(&config, &source).await?;

    info!(
        fetched = output.fetches.iter().filter(|f| f.is_fetched()).count(),
        rows = output.merged.num_rows(),
        data = %config.output.data_path().display(),
        correlations = %config.output.correlations_path().display(),
        "Done"
    );
    Ok(())
}
