pub mod protocol;
pub mod series;

pub use protocol::*;
pub use series::*;
