//! services/client/src/error.rs
//!
//! Defines the top-level error type for the client service.

use crate::config::ConfigError;
use labsync_core::ports::ApiError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A backend call failed; the message is the server's when it sent one.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Reading a local file (an upload, the token file) failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client itself could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The signed-in role is below what the command requires.
    #[error("{0}")]
    AccessDenied(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
