//! Centralized error types for the Warden workspace.

use thiserror::Error;

/// Top-level error enum. Variants map to subsystems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WardenError {
    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Identity store error: {0}")]
    Identity(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WardenResult<T> = Result<T, WardenError>;
