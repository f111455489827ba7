//! Lagged cross-correlation of daily TVL and price changes.

use tracing::debug;

use super::alignment::MergedTable;

/// Day-over-day differences. The first entry and any entry next to a gap are `None`.
pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    for pair in values.windows(2) {
        out.push(match (pair[0], pair[1]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        });
    }
    out
}

/// Shift a daily series by `lag` positions: `out[i] = values[i - lag]`.
///
/// Positive lags move values later in time; vacated positions are `None`.
pub fn shift(values: &[Option<f64>], lag: i32) -> Vec<Option<f64>> {
    let len = values.len() as i64;
    (0..len)
        .map(|i| {
            let src = i - i64::from(lag);
            if (0..len).contains(&src) {
                values[src as usize]
            } else {
                None
            }
        })
        .collect()
}

/// Pearson correlation over pairwise complete observations.
///
/// NaN when fewer than two complete pairs remain or either side is constant.
pub fn pearson_pairwise(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .unzip();

    if xs.len() < 2 {
        return f64::NAN;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in xs.iter().zip(ys.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return f64::NAN;
    }

    (cov / denom).clamp(-1.0, 1.0)
}

/// Correlation of `diff(tvl)` against `shift(diff(price), lag)` for each lag
pub fn lagged_correlations(tvl: &[Option<f64>], price: &[Option<f64>], lags: &[i32]) -> Vec<f64> {
    let tvl_change = diff(tvl);
    let price_change = diff(price);
    lags.iter()
        .map(|&lag| pearson_pairwise(&tvl_change, &shift(&price_change, lag)))
        .collect()
}

/// One correlation per lag for a single protocol; undefined entries are NaN
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationColumn {
    pub slug: String,
    pub values: Vec<f64>,
}

/// Lags (ascending) by protocol
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationTable {
    pub lags: Vec<i32>,
    pub columns: Vec<CorrelationColumn>,
}

/// Lag with the largest absolute defined correlation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestLag {
    pub lag: i32,
    pub correlation: f64,
}

impl CorrelationColumn {
    /// First lag (ascending) whose |correlation| is maximal; None when every value is NaN
    pub fn best_lag(&self, lags: &[i32]) -> Option<BestLag> {
        let mut best: Option<BestLag> = None;
        for (&lag, &correlation) in lags.iter().zip(self.values.iter()) {
            if correlation.is_nan() {
                continue;
            }
            match best {
                Some(b) if correlation.abs() <= b.correlation.abs() => {}
                _ => best = Some(BestLag { lag, correlation }),
            }
        }
        best
    }
}

impl CorrelationTable {
    pub fn column(&self, slug: &str) -> Option<&CorrelationColumn> {
        self.columns.iter().find(|c| c.slug == slug)
    }

    /// Correlation for `slug` at `lag`, if both exist
    pub fn get(&self, slug: &str, lag: i32) -> Option<f64> {
        let idx = self.lags.iter().position(|l| *l == lag)?;
        self.column(slug).and_then(|c| c.values.get(idx).copied())
    }

    pub fn best_lag(&self, slug: &str) -> Option<BestLag> {
        self.column(slug).and_then(|c| c.best_lag(&self.lags))
    }
}

/// Correlate every protocol column of `table` at each of `lags`
pub fn correlate(table: &MergedTable, lags: &[i32]) -> CorrelationTable {
    let columns = table
        .columns
        .iter()
        .map(|column| {
            let values = lagged_correlations(&column.tvl, &column.price, lags);
            debug!(
                protocol = %column.protocol.slug,
                defined = values.iter().filter(|v| !v.is_nan()).count(),
                "Computed lagged correlations"
            );
            CorrelationColumn {
                slug: column.protocol.slug.clone(),
                values,
            }
        })
        .collect();

    CorrelationTable {
        lags: lags.to_vec(),
        columns,
    }
}
