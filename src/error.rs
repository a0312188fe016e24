//! Error types for the server and its configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Parameter file could not be read
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Parameter file is not valid JSON for `VehicleParams`
    #[error("invalid parameter file {path:?}: {source}")]
    ParamsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A vehicle parameter is outside its allowed range
    #[error("invalid vehicle parameter `{field}`: {reason}")]
    InvalidParam { field: &'static str, reason: String },

    /// An environment setting could not be parsed
    #[error("invalid server setting {key}={value}")]
    InvalidSetting { key: &'static str, value: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Client sent something we could not decode
    #[error("malformed client message: {0}")]
    Message(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
