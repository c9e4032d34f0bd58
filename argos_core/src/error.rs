//! Unified error handling for ARGOS
//!
//! This module provides a centralized error type for the entire system,
//! ensuring consistent error handling across all components.

use thiserror::Error;

/// Main error type for ARGOS operations
#[derive(Debug, Error)]
pub enum ArgosError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network / protocol transport errors
    #[error("Communication error: {0}")]
    Communication(String),

    /// Wire format decoding errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Degenerate geometry (colinear box edges, zero-area silhouettes)
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation timed out (discovery, channel receive)
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Resource not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid input/argument errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection to the peer was lost; a full reset-and-rediscover is due
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

/// Result type alias for ARGOS operations
pub type ArgosResult<T> = Result<T, ArgosError>;

impl ArgosError {
    /// Create a communication error with a formatted message
    pub fn communication(msg: impl Into<String>) -> Self {
        ArgosError::Communication(msg.into())
    }

    /// Create a parse error with a formatted message
    pub fn parse(msg: impl Into<String>) -> Self {
        ArgosError::Parse(msg.into())
    }

    /// Create a geometry error with a formatted message
    pub fn geometry(msg: impl Into<String>) -> Self {
        ArgosError::Geometry(msg.into())
    }

    /// Whether this error should trigger a reset-and-rediscover cycle
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, ArgosError::ConnectionLost(_))
    }
}
