//! Error types for drs-notify
//!
//! Service-level failures (startup, configuration, transport). Failures of the
//! dispatch pipeline itself are values, see [`crate::sns::DispatchError`].

use thiserror::Error;

use crate::config::ConfigError;

/// The main error type for drs-notify operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server lifecycle errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// HTTP server lifecycle errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind the listen address
    #[error("Failed to bind {addr}: {message}")]
    BindFailed {
        /// Address we tried to bind
        addr: String,
        /// Underlying error
        message: String,
    },

    /// The server stopped with an error
    #[error("Server stopped unexpectedly: {0}")]
    Stopped(String),
}

/// Result type alias for drs-notify operations
pub type Result<T> = std::result::Result<T, Error>;
