//! Error types for Shotline.

use thiserror::Error;

/// Main error type for Shotline operations.
///
/// Resource exhaustion and missing pixel sources are deliberately absent:
/// those are reported as `None` / "not ready" values and never raised.
#[derive(Error, Debug)]
pub enum ShotlineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Kernel validation error: {0}")]
    Shader(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Timeline error: {0}")]
    Timeline(String),

    #[error("Effect error: {0}")]
    Effect(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Shotline operations.
pub type Result<T> = std::result::Result<T, ShotlineError>;
