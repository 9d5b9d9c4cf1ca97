//! Property store error types.

use std::error::Error;
use std::fmt;

use choreo_core::{EntityId, FunctorError};

/// Errors from property store operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The entity id is not present in the map.
    KeyNotFound {
        /// The missing id.
        id: EntityId,
    },
    /// The entity is already registered.
    DuplicateEntity {
        /// The duplicated id.
        id: EntityId,
    },
    /// A dense assignment did not match the map length.
    LengthMismatch {
        /// Required length.
        expected: usize,
        /// Supplied length.
        got: usize,
    },
    /// The named variable is not in the store.
    UnknownVariable {
        /// The variable name.
        name: String,
    },
    /// Keys are out of order or the index disagrees with positions.
    InvariantViolation {
        /// Description of the first violation found.
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyNotFound { id } => write!(f, "entity {id} not found"),
            Self::DuplicateEntity { id } => write!(f, "entity {id} already registered"),
            Self::LengthMismatch { expected, got } => {
                write!(f, "length mismatch: expected {expected}, got {got}")
            }
            Self::UnknownVariable { name } => write!(f, "unknown variable '{name}'"),
            Self::InvariantViolation { reason } => write!(f, "invariant violation: {reason}"),
        }
    }
}

impl Error for StoreError {}

impl From<StoreError> for FunctorError {
    fn from(e: StoreError) -> Self {
        FunctorError::ExecutionFailed {
            reason: e.to_string(),
        }
    }
}
