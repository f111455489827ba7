use serde::{Deserialize, Serialize};

use crate::error::{LagError, Result};

/// A DeFi protocol tracked by the analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protocol {
    /// DefiLlama protocol slug (e.g., "uniswap")
    pub slug: String,
    /// Governance token symbol used in column names (e.g., "UNI")
    pub token: String,
    /// CoinGecko coin id (e.g., "uniswap")
    pub coin_id: String,
}

impl Protocol {
    pub fn new(slug: &str, token: &str, coin_id: &str) -> Self {
        Self {
            slug: slug.to_string(),
            token: token.to_string(),
            coin_id: coin_id.to_string(),
        }
    }

    /// Column header for the TVL series
    pub fn tvl_column(&self) -> String {
        format!("TVL_{}", self.slug)
    }

    /// Column header for the price series
    pub fn price_column(&self) -> String {
        format!("price_{}", self.token)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("slug", &self.slug),
            ("token", &self.token),
            ("coin_id", &self.coin_id),
        ] {
            if value.trim().is_empty() {
                return Err(LagError::Validation(format!(
                    "protocol {} must not be empty",
                    name
                )));
            }
            // Values end up in URL paths and CSV headers
            if value.contains(&['/', ',', '"', '\n'][..]) {
                return Err(LagError::Validation(format!(
                    "protocol {} contains a reserved character: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        let p = Protocol::new("uniswap", "UNI", "uniswap");
        assert_eq!(p.tvl_column(), "TVL_uniswap");
        assert_eq!(p.price_column(), "price_UNI");
        assert_eq!(p.to_string(), "uniswap");
    }

    #[test]
    fn test_validate() {
        assert!(Protocol::new("aave", "AAVE", "aave").validate().is_ok());
        assert!(Protocol::new("", "AAVE", "aave").validate().is_err());
        assert!(Protocol::new("aave", "AA,VE", "aave").validate().is_err());
        assert!(Protocol::new("aave", "AAVE", "a/b").validate().is_err());
    }
}
