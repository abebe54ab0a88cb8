use crate::config::ConfigError;
use crate::sender::SerializationError;
use thiserror::Error;

/// Top-level error type for the handler pipeline.
///
/// Transport failures are not part of it: they are reported through
/// `SendOutcome` and never raised.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),
}
