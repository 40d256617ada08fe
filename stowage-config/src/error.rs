//! Config error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No filename was set")]
    NoFilename,

    #[error("No config was set")]
    NoConfig,

    #[error("Could not write to file '{}': {source}", .path.display())]
    NotWritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not read config file '{}': {source}", .path.display())]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Value '{key}' is not a finite number and cannot be written")]
    NonFiniteFloat { key: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
