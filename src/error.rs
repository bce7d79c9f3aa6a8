use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Invalid query {query:?}: {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("Input error: {0}")]
    Input(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Filesystem error at {path:?}: {message}")]
    Filesystem { path: PathBuf, message: String },

    #[error("Cannot crop {target}x{target} from {path:?}: resized image is only {width}x{height}")]
    Size {
        path: PathBuf,
        width: u32,
        height: u32,
        target: u32,
    },

    #[error("Could not decode image {path:?}: {message}")]
    Decode { path: PathBuf, message: String },
}

impl AppError {
    pub fn filesystem(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        AppError::Filesystem {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn invalid_query(query: &str, reason: &str) -> Self {
        AppError::InvalidQuery {
            query: query.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Acquisition failures are logged and skipped; everything else halts the run.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Provider(_))
    }
}
