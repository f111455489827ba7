//! Data collection stage: raw TVL and price histories per protocol.

mod fetcher;
mod source;

pub use fetcher::*;
pub use source::*;
