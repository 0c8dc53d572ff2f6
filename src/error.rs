use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VordrError>;

/// Unified error type for the vordr validator
#[derive(Debug, Clone, Error)]
pub enum VordrError {
    // IO / upstream errors
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),
    #[error("upstream query timed out")]
    Timeout,
    #[error("upstream error: {0}")]
    Upstream(String),

    // Configuration errors
    #[error("invalid configuration value for {0}: {1}")]
    InvalidConfig(&'static str, String),
    #[error("trust anchor file error: {0}")]
    TrustAnchorFile(String),

    // Record-layer errors
    #[error("invalid domain name: {0}")]
    InvalidName(String),
    #[error("malformed {0} rdata")]
    MalformedRdata(&'static str),
}

impl From<std::io::Error> for VordrError {
    fn from(err: std::io::Error) -> Self {
        VordrError::Io(Arc::new(err))
    }
}
