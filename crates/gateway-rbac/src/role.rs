//! Roles and permissions.

use crate::scope::ScopePredicate;
use gateway_core::{EntityId, EntityType, OperationType, RoleId};
use serde::{Deserialize, Serialize};

/// Permission definition.
///
/// A permission with an empty scope applies to every entity of its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Entity type the permission applies to; `Any` for all types.
    pub entity_type: EntityType,
    /// Granted operation.
    pub operation: OperationType,
    /// Name of the custom operation for OTHER/NONE permissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_operation: Option<String>,
    /// Conjunctive scope; every predicate must match.
    #[serde(default)]
    pub scope: Vec<ScopePredicate>,
}

impl Permission {
    /// Creates an unscoped permission.
    pub fn new(entity_type: EntityType, operation: OperationType) -> Self {
        Self {
            entity_type,
            operation,
            other_operation: None,
            scope: Vec::new(),
        }
    }

    /// Creates an unscoped permission for a named custom operation.
    pub fn other(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            other_operation: Some(name.into()),
            ..Self::new(entity_type, OperationType::Other)
        }
    }

    /// Creates one unscoped permission per CRUD operation.
    pub fn crud(entity_type: EntityType) -> Vec<Self> {
        OperationType::ALL_CRUD
            .iter()
            .map(|op| Self::new(entity_type, *op))
            .collect()
    }

    /// Adds a scope predicate.
    #[must_use]
    pub fn with_scope(mut self, predicate: ScopePredicate) -> Self {
        self.scope.push(predicate);
        self
    }

    /// Returns true if the permission applies to every entity of its type.
    #[must_use]
    pub fn is_blanket(&self) -> bool {
        self.scope.is_empty()
    }

    /// Checks if this permission applies to the entity type.
    #[must_use]
    pub fn applies_to(&self, entity_type: EntityType) -> bool {
        self.entity_type.is_any() || self.entity_type == entity_type
    }
}

/// Tags attached to roles with special meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleTag {
    /// Administrative role.
    Admin,
}

/// Role definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Role ID.
    pub id: RoleId,
    /// Role name.
    pub name: String,
    /// Optional tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<RoleTag>,
    /// Entity type of the entity this role was generated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    /// Id of the entity this role was generated for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    /// Permissions granted by this role.
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Creates a new role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into(),
            tag: None,
            entity_type: None,
            entity_id: None,
            permissions: Vec::new(),
        }
    }

    /// Creates an administrative role.
    pub fn admin(name: impl Into<String>) -> Self {
        let mut role = Self::new(name);
        role.tag = Some(RoleTag::Admin);
        role
    }

    /// Creates a role generated for one specific entity.
    pub fn for_entity(name: impl Into<String>, entity_type: EntityType, entity_id: EntityId) -> Self {
        let mut role = Self::new(name);
        role.entity_type = Some(entity_type);
        role.entity_id = Some(entity_id);
        role
    }

    /// Adds a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    /// Adds multiple permissions.
    #[must_use]
    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    /// Returns true if this role is tagged administrative.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.tag == Some(RoleTag::Admin)
    }

    /// Returns true if this role was generated for a specific entity.
    #[must_use]
    pub fn is_entity_role(&self) -> bool {
        self.entity_type.is_some() && self.entity_id.is_some()
    }
}
