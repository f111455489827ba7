//! Alignment and lagged-correlation stages.

pub mod alignment;
pub mod correlation;

pub use alignment::{align, MergedTable, ProtocolColumns};
pub use correlation::{
    correlate, diff, lagged_correlations, pearson_pairwise, shift, BestLag, CorrelationColumn,
    CorrelationTable,
};
