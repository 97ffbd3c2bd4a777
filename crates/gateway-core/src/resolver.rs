//! Entity lookup contract.

use crate::{EntityHeader, EntityId, EntityRef, EntityType, LookupResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Resolves ids and headers to full entities.
///
/// `Ok(None)` means the lookup ran and found nothing; `Err` means the lookup
/// itself failed.
pub trait EntityResolver: Send + Sync {
    /// Finds an entity by type and id.
    fn find(&self, entity_type: EntityType, id: EntityId) -> LookupResult<Option<EntityRef>>;

    /// Finds an identity (user or group) within an identity provider.
    fn find_identity(&self, provider_id: EntityId, identity_id: EntityId) -> LookupResult<Option<EntityRef>>;

    /// Finds the entity a header refers to.
    fn find_by_header(&self, header: &EntityHeader) -> LookupResult<Option<EntityRef>> {
        match header.provider_id {
            Some(provider_id) => self.find_identity(provider_id, header.id),
            None => self.find(header.entity_type, header.id),
        }
    }

    /// Finds the header for an entity.
    fn find_header(&self, entity_type: EntityType, id: EntityId) -> LookupResult<Option<EntityHeader>> {
        Ok(self.find(entity_type, id)?.map(|e| e.header()))
    }

    /// Finds the header for an identity within an identity provider.
    fn find_identity_header(
        &self,
        provider_id: EntityId,
        identity_id: EntityId,
    ) -> LookupResult<Option<EntityHeader>> {
        Ok(self.find_identity(provider_id, identity_id)?.map(|e| e.header()))
    }
}

/// In-memory entity store.
pub struct InMemoryEntityStore {
    entities: RwLock<HashMap<(EntityType, EntityId), EntityRef>>,
}

impl InMemoryEntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces an entity.
    pub fn insert(&self, entity: EntityRef) {
        let key = (entity.entity_type(), entity.id());
        self.entities.write().insert(key, entity);
    }

    /// Adds an entity and returns the shared handle.
    pub fn insert_entity<E: crate::Entity + 'static>(&self, entity: E) -> EntityRef {
        let entity: EntityRef = Arc::new(entity);
        self.insert(Arc::clone(&entity));
        entity
    }

    /// Removes an entity.
    pub fn remove(&self, entity_type: EntityType, id: EntityId) -> Option<EntityRef> {
        self.entities.write().remove(&(entity_type, id))
    }

    /// Returns the number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityResolver for InMemoryEntityStore {
    fn find(&self, entity_type: EntityType, id: EntityId) -> LookupResult<Option<EntityRef>> {
        let entities = self.entities.read();
        if entity_type.is_any() {
            return Ok(entities
                .iter()
                .find(|((_, entity_id), _)| *entity_id == id)
                .map(|(_, e)| Arc::clone(e)));
        }
        let found = entities.get(&(entity_type, id)).cloned();
        if found.is_none() {
            trace!(%entity_type, %id, "Entity not in store");
        }
        Ok(found)
    }

    fn find_identity(&self, provider_id: EntityId, identity_id: EntityId) -> LookupResult<Option<EntityRef>> {
        let entities = self.entities.read();
        let found = [EntityType::User, EntityType::Group]
            .iter()
            .filter_map(|t| entities.get(&(*t, identity_id)))
            .find(|e| e.header().provider_id == Some(provider_id))
            .cloned();
        Ok(found)
    }
}
