pub mod coingecko;
pub mod defillama;
pub mod http;

pub use coingecko::{CoinGeckoClient, MarketChartResponse, DEFAULT_COINGECKO_API_BASE};
pub use defillama::{DefiLlamaClient, ProtocolTvlResponse, TvlPoint, DEFAULT_DEFILLAMA_API_BASE};
pub use http::{RetryPolicy, RetryingHttpClient};
