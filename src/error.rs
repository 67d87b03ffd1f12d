//! Crate-wide error type

use thiserror::Error;

use crate::ncc::NccError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Call to the NetScaler Control Center failed
    #[error("Control Center error: {0}")]
    Ncc(#[from] NccError),

    /// Local status store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// HTTP client construction or transport failed
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
