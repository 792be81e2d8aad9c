//! Error types for the carechain workspace.
//!
//! The transition engine itself never returns an error: invalid actions are
//! ignored. Errors here come from the edges: loading configuration, parsing
//! requests from a UI or CLI, and computation providers rejecting input.

use thiserror::Error;

/// The unified error type for carechain.
#[derive(Debug, Error)]
pub enum CarechainError {
    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A role name did not match any known agent role.
    #[error("unknown agent role '{name}'")]
    UnknownRole { name: String },

    /// A request from the string surface could not be understood.
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// The computation provider could not perform an operation.
    #[error("computation '{operation}' failed: {reason}")]
    Computation { operation: String, reason: String },

    /// A value could not be serialized or deserialized.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for CarechainError {
    fn from(e: serde_json::Error) -> Self {
        CarechainError::Serialization { reason: e.to_string() }
    }
}

/// Convenience alias used throughout the carechain crates.
pub type CarechainResult<T> = Result<T, CarechainError>;
