mod context;
mod exit_codes;
mod format;
#[cfg(test)]
mod tests;

pub use context::ErrorContext;
pub use exit_codes::get_exit_code;
pub use format::{format_error_chain, format_error_with_color};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("Invalid version format: {0}")]
    InvalidVersionFormat(String),

    #[error("Signature verification failed: {0}")]
    VerificationFailed(String),

    #[error("Invalid update document: {0}")]
    InvalidDocument(String),

    #[error("Failed to start download: {0}")]
    DownloadStart(String),

    #[error("HTTP failover failed: {0}")]
    FailoverFetch(String),

    #[error("Unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Update coordinator is not running")]
    CoordinatorStopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] attohttpc::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
}

pub type Result<T> = std::result::Result<T, RolloutError>;
