//! Error types shared by the library components

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the watcher
#[derive(Error, Debug)]
pub enum VigiaError {
    /// A package request could not be located in any candidate directory
    #[error("Cannot resolve '{request}' from {requester}: no candidate matched")]
    Resolution { request: String, requester: String },

    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation was installed twice with incompatible signatures
    #[error("Install error: {0}")]
    Install(String),

    #[error("Summary already finalized")]
    AlreadyFinalized,

    /// Writing one of the shutdown artifacts failed
    #[error("Failed to export to {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, VigiaError>;
