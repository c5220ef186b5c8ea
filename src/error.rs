use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeadError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    #[error("Configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Search reply exceeded {0} bytes")]
    ResponseTooLarge(usize),

    /// No extraction tier recovered a JSON array from the oracle reply.
    #[error("Could not parse leads from response: {preview:?}")]
    UnparseableResponse { preview: String },

    #[error("Config file error at {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },
}

impl LeadError {
    /// Failures the caller can fix by changing the request.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, LeadError>;
