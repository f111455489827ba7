pub mod adapters;
pub mod analysis;
pub mod cli;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use analysis::{CorrelationTable, MergedTable};
pub use collector::{HttpMarketData, MarketDataSource, ProtocolFetch};
pub use config::AppConfig;
pub use domain::{DailySeries, DateWindow, Observation, Protocol};
pub use error::{LagError, Result};
pub use pipeline::{run, run_at, RunOutput};
