use thiserror::Error;

/// Main error type for the TVL/price lag analysis
#[derive(Error, Debug)]
pub enum LagError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Max retries exceeded for {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    // Serialization errors
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Output file errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LagError {
    /// Whether the error came from the network boundary (as opposed to local IO or config).
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::HttpStatus { .. } | Self::RetriesExhausted { .. } | Self::Json(_)
        )
    }
}

/// Result type alias for LagError
pub type Result<T> = std::result::Result<T, LagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LagError::HttpStatus {
            url: "https://api.llama.fi/protocol/nope".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "HTTP 404 from https://api.llama.fi/protocol/nope"
        );

        let err = LagError::RetriesExhausted {
            url: "http://x".to_string(),
            attempts: 6,
            last: "HTTP 503".to_string(),
        };
        assert!(err.to_string().contains("after 6 attempts"));
    }

    #[test]
    fn test_fetch_error_classification() {
        let status = LagError::HttpStatus {
            url: String::new(),
            status: 500,
        };
        assert!(status.is_fetch_error());

        let io = LagError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_fetch_error());
        assert!(!LagError::Validation("x".into()).is_fetch_error());
    }
}
