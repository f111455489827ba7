//! CoinGecko REST client (coin price history)

use serde::Deserialize;
use tracing::debug;

use super::http::RetryingHttpClient;
use crate::domain::Observation;
use crate::error::Result;

pub const DEFAULT_COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// `GET /coins/{id}/market_chart` response; market caps and volumes are ignored
#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartResponse {
    /// `[epoch_ms, price]` pairs
    pub prices: Vec<(f64, f64)>,
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    http: RetryingHttpClient,
    base_url: String,
    vs_currency: String,
}

impl CoinGeckoClient {
    pub fn new(http: RetryingHttpClient, base_url: Option<&str>, vs_currency: &str) -> Self {
        let base_url = base_url
            .unwrap_or(DEFAULT_COINGECKO_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Self {
            http,
            base_url,
            vs_currency: vs_currency.to_string(),
        }
    }

    pub fn market_chart_url(&self, coin_id: &str) -> String {
        format!("{}/coins/{}/market_chart", self.base_url, coin_id)
    }

    /// Fetch `days` of price history for a coin as raw observations
    pub async fn fetch_price_history(&self, coin_id: &str, days: u32) -> Result<Vec<Observation>> {
        let url = self.market_chart_url(coin_id);
        let params = vec![
            ("vs_currency", self.vs_currency.clone()),
            ("days", days.to_string()),
        ];
        let resp: MarketChartResponse = self.http.get_json(&url, &params).await?;

        let points = resp.prices.len();
        let observations: Vec<Observation> = resp
            .prices
            .into_iter()
            .filter_map(|(ms, price)| Observation::from_epoch_millis(ms as i64, price))
            .collect();

        debug!(
            "Fetched {} price points for {} ({} usable)",
            points,
            coin_id,
            observations.len()
        );
        Ok(observations)
    }
}
