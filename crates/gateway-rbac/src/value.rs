//! Arguments and return values of secured operations.

use gateway_core::{Entity, EntityHeader, EntityId, EntityRef, EntityType};
use std::collections::HashSet;
use std::sync::Arc;

/// An argument passed to a secured operation.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A full entity.
    Entity(EntityRef),
    /// An entity id.
    Id(EntityId),
    /// An entity header.
    Header(EntityHeader),
    /// A plain string, such as a unique attribute value.
    Text(String),
    /// Any other value.
    Value(serde_json::Value),
}

impl Arg {
    /// Wraps an entity.
    pub fn entity<E: Entity + 'static>(entity: E) -> Self {
        Self::Entity(Arc::new(entity))
    }

    /// Returns the entity, if this argument is one.
    #[must_use]
    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the id, if this argument is one.
    #[must_use]
    pub fn as_id(&self) -> Option<EntityId> {
        match self {
            Self::Id(id) => Some(*id),
            _ => None,
        }
    }
}

/// An element of a returned collection.
#[derive(Debug, Clone)]
pub enum Securable {
    /// A full entity.
    Entity(EntityRef),
    /// A header that must be resolved before it can be checked.
    Header(EntityHeader),
}

impl Securable {
    /// Returns the type and id identifying the element.
    #[must_use]
    pub fn identity(&self) -> (EntityType, EntityId) {
        match self {
            Self::Entity(e) => (e.entity_type(), e.id()),
            Self::Header(h) => (h.entity_type, h.id),
        }
    }

    /// Returns the entity type of the element.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.identity().0
    }
}

impl From<EntityHeader> for Securable {
    fn from(header: EntityHeader) -> Self {
        Self::Header(header)
    }
}

impl From<EntityRef> for Securable {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

/// A delta between two versions of a collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    /// Version the delta starts from.
    pub old_version: u64,
    /// Version the delta produces.
    pub new_version: u64,
    /// Elements added since `old_version`.
    pub added: Vec<Securable>,
    /// Ids removed since `old_version`.
    pub removed: Vec<EntityId>,
}

/// The value returned by a secured operation.
#[derive(Debug, Clone)]
pub enum Returned {
    /// No value.
    Nothing,
    /// A single entity.
    Entity(EntityRef),
    /// A single header.
    Header(EntityHeader),
    /// A fixed array of elements.
    Array(Vec<Securable>),
    /// An ordered list of elements.
    List(Vec<Securable>),
    /// A set of elements, unique by type and id.
    Set(Vec<Securable>),
    /// A collection delta.
    Update(CollectionUpdate),
    /// Any other value.
    Value(serde_json::Value),
}

impl Returned {
    /// Builds a set, dropping later duplicates.
    pub fn set(items: impl IntoIterator<Item = Securable>) -> Self {
        let mut seen = HashSet::new();
        Self::Set(items.into_iter().filter(|i| seen.insert(i.identity())).collect())
    }

    /// Builds an array of headers.
    pub fn headers(headers: impl IntoIterator<Item = EntityHeader>) -> Self {
        Self::Array(headers.into_iter().map(Securable::Header).collect())
    }

    /// Returns true for the empty return value.
    #[must_use]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Returns the collection elements, if this value is a collection.
    #[must_use]
    pub fn items(&self) -> Option<&[Securable]> {
        match self {
            Self::Array(items) | Self::List(items) | Self::Set(items) => Some(items),
            Self::Update(update) => Some(&update.added),
            _ => None,
        }
    }

    /// Returns a short name of the value's shape.
    #[must_use]
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Nothing => "nothing",
            Self::Entity(_) => "entity",
            Self::Header(_) => "header",
            Self::Array(_) => "array",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Update(_) => "collection update",
            Self::Value(_) => "value",
        }
    }
}
