use cspcrawl_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Invalid nonce '{0}': expected 32 hexadecimal characters")]
    InvalidNonce(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
