//! Authorization error types.

use gateway_core::{Entity, EntityId, EntityType, ErrorCode, LookupError, OperationType};
use std::fmt;
use thiserror::Error;

/// Authorization result type.
pub type RbacResult<T> = Result<T, RbacError>;

/// Authorization errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// The caller is not permitted to perform the operation.
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDeniedError),

    /// Secured operation is declared or wired inconsistently.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An entity needed for the decision could not be looked up.
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl RbacError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PermissionDenied(_) => ErrorCode::new(2001),
            Self::Configuration(_) => ErrorCode::new(9004),
            Self::Lookup(e) => e.code(),
        }
    }

    /// Returns true if this error is an authorization verdict.
    #[must_use]
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Summary of the entity a denial was raised for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeniedEntity {
    /// Entity type.
    pub entity_type: EntityType,
    /// Entity id.
    pub id: EntityId,
    /// Entity name, if any.
    pub name: Option<String>,
}

impl DeniedEntity {
    /// Captures the identifying fields of an entity.
    pub fn of(entity: &dyn Entity) -> Self {
        Self {
            entity_type: entity.entity_type(),
            id: entity.id(),
            name: entity.name().map(str::to_string),
        }
    }
}

impl fmt::Display for DeniedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} #{} ({})", self.entity_type, self.id, name),
            None => write!(f, "{} #{}", self.entity_type, self.id),
        }
    }
}

/// The caller lacks permission for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDeniedError {
    /// Attempted operation.
    pub operation: OperationType,
    /// Entity type, for type-wide denials.
    pub entity_type: Option<EntityType>,
    /// Entity, for entity-specific denials.
    pub entity: Option<DeniedEntity>,
    /// Custom operation name for OTHER/NONE operations.
    pub other_operation: Option<String>,
}

impl PermissionDeniedError {
    /// Denial of an operation on every entity of a type.
    pub fn for_type(operation: OperationType, entity_type: EntityType) -> Self {
        Self {
            operation,
            entity_type: Some(entity_type),
            entity: None,
            other_operation: None,
        }
    }

    /// Denial of an operation on one entity.
    pub fn for_entity(operation: OperationType, entity: &dyn Entity, other_operation: Option<&str>) -> Self {
        Self {
            operation,
            entity_type: Some(entity.entity_type()),
            entity: Some(DeniedEntity::of(entity)),
            other_operation: other_operation.map(str::to_string),
        }
    }
}

impl fmt::Display for PermissionDeniedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Permission denied for {}", self.operation)?;
        if let Some(ref other) = self.other_operation {
            write!(f, " ({other})")?;
        }
        match (&self.entity, self.entity_type) {
            (Some(entity), _) => write!(f, " on {entity}"),
            (None, Some(entity_type)) => write!(f, " on any {entity_type}"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for PermissionDeniedError {}
