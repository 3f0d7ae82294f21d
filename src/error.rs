use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum HiveError {
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Map loading errors. All of them are fatal at environment construction.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed map {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rect #{index} has non-positive size: {rect:?}")]
    InvalidRect { index: usize, rect: [f32; 4] },

    #[error("guard '{id}' is invalid: {message}")]
    InvalidGuard { id: String, message: String },

    #[error("invalid level size {0:?}")]
    InvalidSize([f32; 2]),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}
