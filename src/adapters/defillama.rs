//! DefiLlama REST client (protocol TVL history)

use serde::Deserialize;
use tracing::debug;

use super::http::RetryingHttpClient;
use crate::domain::Observation;
use crate::error::Result;

pub const DEFAULT_DEFILLAMA_API_BASE: &str = "https://api.llama.fi";

/// `GET /protocol/{slug}` response; only the aggregate TVL history is used
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolTvlResponse {
    pub tvl: Vec<TvlPoint>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TvlPoint {
    /// Epoch seconds
    pub date: i64,
    #[serde(rename = "totalLiquidityUSD")]
    pub total_liquidity_usd: f64,
}

#[derive(Clone)]
pub struct DefiLlamaClient {
    http: RetryingHttpClient,
    base_url: String,
}

impl DefiLlamaClient {
    pub fn new(http: RetryingHttpClient, base_url: Option<&str>) -> Self {
        let base_url = base_url
            .unwrap_or(DEFAULT_DEFILLAMA_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Self { http, base_url }
    }

    pub fn protocol_url(&self, slug: &str) -> String {
        format!("{}/protocol/{}", self.base_url, slug)
    }

    /// Fetch the full TVL history of a protocol as raw observations
    pub async fn fetch_tvl_history(&self, slug: &str) -> Result<Vec<Observation>> {
        let url = self.protocol_url(slug);
        let resp: ProtocolTvlResponse = self.http.get_json(&url, &[]).await?;

        let points = resp.tvl.len();
        let observations: Vec<Observation> = resp
            .tvl
            .into_iter()
            .filter_map(|p| Observation::from_epoch_secs(p.date, p.total_liquidity_usd))
            .collect();

        debug!(
            "Fetched {} TVL points for {} ({} usable)",
            points,
            slug,
            observations.len()
        );
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_protocol_response_ignores_extra_fields() {
        let raw = r#"{
            "id": "1",
            "name": "Uniswap",
            "chainTvls": {},
            "tvl": [
                {"date": 1709251200, "totalLiquidityUSD": 5100000000.5},
                {"date": 1709337600, "totalLiquidityUSD": 5200000000}
            ]
        }"#;

        let resp: ProtocolTvlResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.tvl.len(), 2);
        assert_eq!(resp.tvl[0].date, 1_709_251_200);
        assert_eq!(resp.tvl[1].total_liquidity_usd, 5_200_000_000.0);
    }

    #[test]
    fn parse_protocol_response_without_tvl_is_an_error() {
        let err = serde_json::from_str::<ProtocolTvlResponse>(r#"{"name": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `tvl`"));

        let resp: ProtocolTvlResponse = serde_json::from_str(r#"{"tvl": []}"#).unwrap();
        assert!(resp.tvl.is_empty());
    }

    #[test]
    fn protocol_url_trims_trailing_slash() {
        let http = RetryingHttpClient::new(&crate::config::AppConfig::default().http).unwrap();
        let client = DefiLlamaClient::new(http, Some("http://127.0.0.1:9000/"));
        assert_eq!(client.protocol_url("aave"), "http://127.0.0.1:9000/protocol/aave");
    }
}
