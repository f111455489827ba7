use async_trait::async_trait;

use crate::adapters::{CoinGeckoClient, DefiLlamaClient, RetryingHttpClient};
use crate::config::AppConfig;
use crate::domain::Observation;
use crate::error::Result;

/// Where raw TVL and price histories come from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Raw TVL observations for a protocol slug
    async fn fetch_tvl(&self, slug: &str) -> Result<Vec<Observation>>;

    /// Raw price observations covering the last `days` days for a coin id
    async fn fetch_prices(&self, coin_id: &str, days: u32) -> Result<Vec<Observation>>;
}

/// DefiLlama for TVL, CoinGecko for prices, sharing one retrying client
#[derive(Clone)]
pub struct HttpMarketData {
    tvl: DefiLlamaClient,
    prices: CoinGeckoClient,
}

impl HttpMarketData {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = RetryingHttpClient::new(&config.http)?;
        Ok(Self {
            tvl: DefiLlamaClient::new(http.clone(), Some(&config.sources.tvl_base_url)),
            prices: CoinGeckoClient::new(
                http,
                Some(&config.sources.price_base_url),
                &config.sources.vs_currency,
            ),
        })
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketData {
    async fn fetch_tvl(&self, slug: &str) -> Result<Vec<Observation>> {
        self.tvl.fetch_tvl_history(slug).await
    }

    async fn fetch_prices(&self, coin_id: &str, days: u32) -> Result<Vec<Observation>> {
        self.prices.fetch_price_history(coin_id, days).await
    }
}
