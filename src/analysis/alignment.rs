//! Merge per-protocol daily series onto one calendar.

use chrono::NaiveDate;

use crate::collector::ProtocolFetch;
use crate::domain::{DailySeries, DateWindow, Protocol};

/// TVL and price columns of one protocol, aligned to `MergedTable::dates`
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolColumns {
    pub protocol: Protocol,
    pub tvl: Vec<Option<f64>>,
    pub price: Vec<Option<f64>>,
}

/// Every day of the window with one TVL and one price column per fetched protocol
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<ProtocolColumns>,
}

impl MergedTable {
    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, slug: &str) -> Option<&ProtocolColumns> {
        self.columns.iter().find(|c| c.protocol.slug == slug)
    }

    /// Header in file order: `date`, then TVL/price pairs per protocol
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(1 + self.columns.len() * 2);
        header.push("date".to_string());
        for column in &self.columns {
            header.push(column.protocol.tvl_column());
            header.push(column.protocol.price_column());
        }
        header
    }
}

fn reindex(series: &DailySeries, dates: &[NaiveDate]) -> Vec<Option<f64>> {
    dates.iter().map(|d| series.get(*d)).collect()
}

/// Reindex fetched series onto every day of `window`.
///
/// Days without a reported value stay `None`. Failed protocols contribute no columns.
pub fn align(window: &DateWindow, fetches: &[ProtocolFetch]) -> MergedTable {
    let dates = window.days();

    let columns = fetches
        .iter()
        .filter_map(|fetch| match fetch {
            ProtocolFetch::Fetched {
                protocol,
                tvl,
                price,
            } => Some(ProtocolColumns {
                protocol: protocol.clone(),
                tvl: reindex(tvl, &dates),
                price: reindex(price, &dates),
            }),
            ProtocolFetch::Failed { .. } => None,
        })
        .collect();

    MergedTable { dates, columns }
}
