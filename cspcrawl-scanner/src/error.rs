use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP {status} returned for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Start page {url} could not be fetched: {reason}")]
    StartPageUnavailable { url: String, reason: String },

    #[error("Traversal limit exceeded: more than {limit} pages reachable")]
    TraversalLimitExceeded { limit: usize },

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
