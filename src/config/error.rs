//! Configuration error types

use thiserror::Error;

/// Errors that occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying config crate error (missing variables, parse failures)
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors that occur during semantic validation of configuration values.
#[derive(Debug, Clone, Copy, Error)]
pub enum ValidationError {
    #[error("Server port must be non-zero")]
    InvalidPort,

    #[error("Engine bound '{0}' must be non-zero")]
    InvalidEngineBound(&'static str),
}
