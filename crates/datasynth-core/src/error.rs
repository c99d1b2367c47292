use thiserror::Error;

use crate::config::ConfigError;

/// Core error type shared across Datasynth crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A request failed boundary validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Settings could not be loaded or are inconsistent.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience alias for results returned by Datasynth crates.
pub type Result<T> = std::result::Result<T, CoreError>;
