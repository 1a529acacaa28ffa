//! Error types for attachment operations.

use thiserror::Error;

/// Errors that can occur during attachment operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// A keyed operation was given an empty key.
    ///
    /// The empty string addresses no slot, so the operation is rejected
    /// before any state changes.
    #[error("attachment key must not be empty")]
    EmptyKey,

    /// A typed read found a value of a different concrete type at the key.
    #[error("type mismatch at key {key:?}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Convenience type alias for attachment operations.
pub type Result<T> = std::result::Result<T, AttachError>;
