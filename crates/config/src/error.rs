//! Error types for configuration loading and persistence.

use std::path::PathBuf;

/// Errors raised by the preference stores.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed preferences file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown quality level: {0:?}")]
    UnknownQualityLevel(String),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("Preference storage unavailable: {0}")]
    Unavailable(String),
}
