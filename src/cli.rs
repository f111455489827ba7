use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "tvl-price-lag")]
#[command(version)]
#[command(
    about = "Correlate daily TVL changes with token price changes across day lags",
    long_about = None
)]
pub struct Cli {
    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", env = "TVL_LAG_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Directory for data.csv and correlations.csv (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of days in the analysis window (overrides config)
    #[arg(long)]
    pub days: Option<u32>,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(days) = self.days {
            config.window.days = days;
        }
    }
}
