//! Authenticated users.

use crate::{Entity, EntityHeader, EntityId, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key identifying a user across identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserKey {
    /// Identity provider that authenticated the user.
    pub provider_id: EntityId,
    /// User id within the provider.
    pub user_id: EntityId,
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user_id, self.provider_id)
    }
}

/// An authenticated principal; read-only to the authorization kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable id within the provider.
    pub id: EntityId,
    /// Identity provider id.
    pub provider_id: EntityId,
    /// Login name.
    pub login: String,
}

impl User {
    /// Creates a new user.
    pub fn new(provider_id: EntityId, id: EntityId, login: impl Into<String>) -> Self {
        Self {
            id,
            provider_id,
            login: login.into(),
        }
    }

    /// Returns the cache key for this user.
    #[must_use]
    pub fn key(&self) -> UserKey {
        UserKey {
            provider_id: self.provider_id,
            user_id: self.id,
        }
    }
}

impl Entity for User {
    fn id(&self) -> EntityId {
        self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::User
    }

    fn name(&self) -> Option<&str> {
        Some(&self.login)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "login" | "name" => Some(self.login.clone()),
            "providerId" => Some(self.provider_id.to_string()),
            _ => None,
        }
    }

    fn header(&self) -> EntityHeader {
        EntityHeader::identity(EntityType::User, self.provider_id, self.id).with_name(&self.login)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.login, self.key())
    }
}
