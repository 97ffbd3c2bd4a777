//! Entity types, operations and the `Entity` contract.

use crate::{EntityHeader, EntityId, Folder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Kinds of persisted objects that can be secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Wildcard matching every entity type.
    Any,
    /// Published service.
    Service,
    /// Policy document.
    Policy,
    /// Organizational folder.
    Folder,
    /// Identity provider configuration.
    IdProvider,
    /// User identity.
    User,
    /// Group identity.
    Group,
    /// RBAC role.
    Role,
    /// Security zone.
    SecurityZone,
    /// Trusted certificate.
    TrustedCert,
    /// Stored secure password.
    SecurePassword,
    /// JDBC connection.
    JdbcConnection,
    /// Cluster-wide property.
    ClusterProperty,
    /// Audit record.
    AuditRecord,
}

impl EntityType {
    /// Every concrete and wildcard type.
    pub const ALL: [EntityType; 14] = [
        Self::Any,
        Self::Service,
        Self::Policy,
        Self::Folder,
        Self::IdProvider,
        Self::User,
        Self::Group,
        Self::Role,
        Self::SecurityZone,
        Self::TrustedCert,
        Self::SecurePassword,
        Self::JdbcConnection,
        Self::ClusterProperty,
        Self::AuditRecord,
    ];

    /// Returns the stable wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::Service => "SERVICE",
            Self::Policy => "POLICY",
            Self::Folder => "FOLDER",
            Self::IdProvider => "ID_PROVIDER",
            Self::User => "USER",
            Self::Group => "GROUP",
            Self::Role => "ROLE",
            Self::SecurityZone => "SECURITY_ZONE",
            Self::TrustedCert => "TRUSTED_CERT",
            Self::SecurePassword => "SECURE_PASSWORD",
            Self::JdbcConnection => "JDBC_CONNECTION",
            Self::ClusterProperty => "CLUSTER_PROPERTY",
            Self::AuditRecord => "AUDIT_RECORD",
        }
    }

    /// Returns the name of the concrete representation for this type.
    #[must_use]
    pub const fn concrete_name(&self) -> &'static str {
        match self {
            Self::Any => "Entity",
            Self::Service => "PublishedService",
            Self::Policy => "Policy",
            Self::Folder => "Folder",
            Self::IdProvider => "IdentityProviderConfig",
            Self::User => "User",
            Self::Group => "Group",
            Self::Role => "Role",
            Self::SecurityZone => "SecurityZone",
            Self::TrustedCert => "TrustedCert",
            Self::SecurePassword => "SecurePassword",
            Self::JdbcConnection => "JdbcConnection",
            Self::ClusterProperty => "ClusterProperty",
            Self::AuditRecord => "AuditRecord",
        }
    }

    /// Returns true if entities of this type can be placed in a security zone.
    #[must_use]
    pub const fn is_security_zoneable(&self) -> bool {
        matches!(
            self,
            Self::Service
                | Self::Policy
                | Self::Folder
                | Self::IdProvider
                | Self::TrustedCert
                | Self::SecurePassword
                | Self::JdbcConnection
        )
    }

    /// Returns true for the wildcard type.
    #[must_use]
    pub const fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown entity type: {s}"))
    }
}

/// Operations a permission can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Create a new entity.
    Create,
    /// Read an entity.
    Read,
    /// Update an entity.
    Update,
    /// Delete an entity.
    Delete,
    /// Custom operation identified by name.
    Other,
    /// No operation.
    None,
}

impl OperationType {
    /// The four CRUD operations.
    pub const ALL_CRUD: [OperationType; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    /// Returns the stable wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
            Self::None => "NONE",
        }
    }

    /// Returns true if permissions for this operation are qualified by a name.
    #[must_use]
    pub const fn is_named(&self) -> bool {
        matches!(self, Self::Other | Self::None)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted object that can be the target of an authorization decision.
pub trait Entity: fmt::Debug + Send + Sync {
    /// Returns the entity id.
    fn id(&self) -> EntityId;

    /// Returns the concrete type of this entity.
    fn entity_type(&self) -> EntityType;

    /// Returns the display name, if the entity has one.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Returns the containing folder for entities that live in the folder tree.
    ///
    /// `None` means the entity has no folder relation (or is the root folder).
    fn folder(&self) -> Option<&Folder> {
        None
    }

    /// Returns self as a folder when this entity is one.
    fn as_folder(&self) -> Option<&Folder> {
        None
    }

    /// Returns the security zone id for zoneable entities.
    fn security_zone(&self) -> Option<EntityId> {
        None
    }

    /// Looks up a named attribute for attribute-scoped permissions.
    fn attribute(&self, _name: &str) -> Option<String> {
        None
    }

    /// Builds a header describing this entity.
    fn header(&self) -> EntityHeader {
        let header = EntityHeader::new(self.entity_type(), self.id());
        match self.name() {
            Some(name) => header.with_name(name),
            None => header,
        }
    }
}

/// Shared handle to an entity.
pub type EntityRef = Arc<dyn Entity>;

/// A general purpose entity carrying a folder, zone and attributes.
#[derive(Debug, Clone)]
pub struct ManagedEntity {
    id: EntityId,
    entity_type: EntityType,
    name: String,
    folder: Option<Arc<Folder>>,
    security_zone: Option<EntityId>,
    attributes: HashMap<String, String>,
}

impl ManagedEntity {
    /// Creates a new entity with the given type, id and name.
    pub fn new(entity_type: EntityType, id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            entity_type,
            name: name.into(),
            folder: None,
            security_zone: None,
            attributes: HashMap::new(),
        }
    }

    /// Creates an entity that has not been saved yet.
    pub fn unsaved(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self::new(entity_type, EntityId::DEFAULT, name)
    }

    /// Places the entity in a folder.
    #[must_use]
    pub fn in_folder(mut self, folder: Arc<Folder>) -> Self {
        self.folder = Some(folder);
        self
    }

    /// Places the entity in a security zone.
    #[must_use]
    pub fn in_zone(mut self, zone_id: EntityId) -> Self {
        self.security_zone = Some(zone_id);
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Wraps this entity in a shared handle.
    #[must_use]
    pub fn into_ref(self) -> EntityRef {
        Arc::new(self)
    }
}

impl Entity for ManagedEntity {
    fn id(&self) -> EntityId {
        self.id
    }

    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn folder(&self) -> Option<&Folder> {
        self.folder.as_deref()
    }

    fn security_zone(&self) -> Option<EntityId> {
        if self.entity_type.is_security_zoneable() {
            self.security_zone
        } else {
            None
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "id" => Some(self.id.to_string()),
            _ => self.attributes.get(name).cloned(),
        }
    }
}
