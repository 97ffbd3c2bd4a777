//! Lightweight entity references.

use crate::{EntityId, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A summary record identifying an entity without its full attribute set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHeader {
    /// Type of the referenced entity.
    pub entity_type: EntityType,
    /// Id of the referenced entity.
    pub id: EntityId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version of the entity when the header was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Identity provider, for user and group headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<EntityId>,
}

impl EntityHeader {
    /// Creates a header for the given type and id.
    pub fn new(entity_type: EntityType, id: EntityId) -> Self {
        Self {
            entity_type,
            id,
            name: None,
            description: None,
            version: None,
            provider_id: None,
        }
    }

    /// Creates an identity header (user or group within a provider).
    pub fn identity(entity_type: EntityType, provider_id: EntityId, id: EntityId) -> Self {
        Self {
            provider_id: Some(provider_id),
            ..Self::new(entity_type, id)
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Returns true if this header references an identity within a provider.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.provider_id.is_some()
    }
}

impl fmt::Display for EntityHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} #{} ({})", self.entity_type, self.id, name),
            None => write!(f, "{} #{}", self.entity_type, self.id),
        }
    }
}
