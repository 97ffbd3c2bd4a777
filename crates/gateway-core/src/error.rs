//! Lookup error types.
//!
//! Lookup failures are kept apart from authorization failures so that a
//! caller can never mistake "does not exist" for "not allowed".

use crate::{EntityId, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using `LookupError`.
pub type LookupResult<T> = Result<T, LookupError>;

/// Errors raised by entity lookup collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// No entity with the given type and id exists.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        /// The type that was searched.
        entity_type: EntityType,
        /// The id that was searched.
        id: String,
    },

    /// The backing store failed while looking up an entity.
    #[error("unable to find {}: {message}", entity_type.concrete_name())]
    FindFailed {
        /// The type that was searched.
        entity_type: EntityType,
        /// Backend message.
        message: String,
    },
}

impl LookupError {
    /// Creates a not-found error.
    pub fn not_found(entity_type: EntityType, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates a find failure.
    pub fn find_failed(entity_type: EntityType, message: impl Into<String>) -> Self {
        Self::FindFailed {
            entity_type,
            message: message.into(),
        }
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::new(4001),
            Self::FindFailed { .. } => ErrorCode::new(4002),
        }
    }

    /// Returns true if this error reports a missing entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Error code with numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Creates a new error code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the code as a formatted string.
    #[must_use]
    pub fn to_code_string(&self) -> String {
        format!("GW_{:04}", self.0)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GW_{:04}", self.0)
    }
}
