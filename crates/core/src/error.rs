//! Core error model.

use thiserror::Error;

/// Result type used across the core primitives.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while constructing core primitives from external input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A fingerprint was not a 32-byte hex digest.
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}

impl CoreError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_fingerprint(msg: impl Into<String>) -> Self {
        Self::InvalidFingerprint(msg.into())
    }
}
