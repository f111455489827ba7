//! Per-protocol fetch stage.
//!
//! Protocols are fetched one at a time, TVL first, then price. A failure in
//! either call abandons both series for that protocol and the run moves on.

use std::io::Write;
use tracing::{error, info};

use super::source::MarketDataSource;
use crate::config::AppConfig;
use crate::domain::{DailySeries, Protocol};
use crate::error::Result;

/// Outcome of fetching one protocol
#[derive(Debug, Clone)]
pub enum ProtocolFetch {
    Fetched {
        protocol: Protocol,
        tvl: DailySeries,
        price: DailySeries,
    },
    Failed {
        protocol: Protocol,
        reason: String,
    },
}

impl ProtocolFetch {
    pub fn protocol(&self) -> &Protocol {
        match self {
            Self::Fetched { protocol, .. } | Self::Failed { protocol, .. } => protocol,
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }

    /// Both daily series when the fetch succeeded
    pub fn series(&self) -> Option<(&DailySeries, &DailySeries)> {
        match self {
            Self::Fetched { tvl, price, .. } => Some((tvl, price)),
            Self::Failed { .. } => None,
        }
    }
}

/// Fetch TVL and price history for one protocol.
///
/// Network and decode failures become `ProtocolFetch::Failed` and are reported
/// on `out`; any other error is returned to the caller.
pub async fn fetch_protocol<S, W>(
    source: &S,
    protocol: &Protocol,
    days: u32,
    out: &mut W,
) -> Result<ProtocolFetch>
where
    S: MarketDataSource + ?Sized,
    W: Write,
{
    let fetched = async {
        let tvl = source.fetch_tvl(&protocol.slug).await?;
        let price = source.fetch_prices(&protocol.coin_id, days).await?;
        Ok::<_, crate::error::LagError>((tvl, price))
    }
    .await;

    match fetched {
        Ok((tvl, price)) => {
            let tvl = DailySeries::from_observations(tvl);
            let price = DailySeries::from_observations(price);
            info!(
                protocol = %protocol.slug,
                tvl_days = tvl.len(),
                price_days = price.len(),
                "Fetched protocol data"
            );
            Ok(ProtocolFetch::Fetched {
                protocol: protocol.clone(),
                tvl,
                price,
            })
        }
        Err(e) if e.is_fetch_error() => {
            error!(protocol = %protocol.slug, "Fetch failed: {}", e);
            writeln!(out, "Error fetching data for {}: {}", protocol.slug, e)?;
            Ok(ProtocolFetch::Failed {
                protocol: protocol.clone(),
                reason: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

/// Fetch every configured protocol sequentially, preserving configured order
pub async fn fetch_all<S, W>(
    source: &S,
    config: &AppConfig,
    out: &mut W,
) -> Result<Vec<ProtocolFetch>>
where
    S: MarketDataSource + ?Sized,
    W: Write,
{
    let mut results = Vec::with_capacity(config.protocols.len());
    for protocol in &config.protocols {
        results.push(fetch_protocol(source, protocol, config.window.days, out).await?);
    }

    let failed = results.iter().filter(|r| !r.is_fetched()).count();
    info!(
        "Fetch complete: {} succeeded, {} failed",
        results.len() - failed,
        failed
    );
    Ok(results)
}
