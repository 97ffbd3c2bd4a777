//! Mock collaborators for testing.

use gateway_core::{
    Entity, EntityId, EntityRef, EntityResolver, EntityType, InMemoryEntityStore, LookupError, LookupResult,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Entity resolver whose lookups can be made to fail per entity type.
#[derive(Default)]
pub struct FlakyResolver {
    store: InMemoryEntityStore,
    failing: RwLock<HashSet<EntityType>>,
    finds: AtomicUsize,
}

impl FlakyResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an entity.
    pub fn insert_entity<E: Entity + 'static>(&self, entity: E) -> EntityRef {
        self.store.insert_entity(entity)
    }

    /// Makes every lookup of `entity_type` fail.
    pub fn fail_type(&self, entity_type: EntityType) {
        self.failing.write().insert(entity_type);
    }

    /// Returns the number of `find` calls.
    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

impl EntityResolver for FlakyResolver {
    fn find(&self, entity_type: EntityType, id: EntityId) -> LookupResult<Option<EntityRef>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().contains(&entity_type) {
            return Err(LookupError::find_failed(entity_type, "backing store unavailable"));
        }
        self.store.find(entity_type, id)
    }

    fn find_identity(&self, provider_id: EntityId, identity_id: EntityId) -> LookupResult<Option<EntityRef>> {
        self.store.find_identity(provider_id, identity_id)
    }
}
