//! Read-only protection for system-managed entities.
//!
//! The tracker holds a registry of protected entity ids that is replaced in
//! bulk. Enforcement can be suspended per request through an explicit
//! [`ProtectionContext`], never through thread-local state.

use gateway_core::{Entity, EntityId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Collaborator answering whether an entity is protected against modification.
pub trait ProtectedEntityOracle: Send + Sync {
    /// Returns true if protection is enforced at all.
    fn is_enabled(&self) -> bool;

    /// Returns true if the entity may only be read.
    fn is_read_only(&self, entity: &dyn Entity) -> bool;
}

/// Protection details for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionInfo {
    /// Whether the entity is read-only.
    pub read_only: bool,
    /// Why the entity is protected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProtectionInfo {
    /// Read-only protection.
    pub fn read_only(reason: impl Into<String>) -> Self {
        Self {
            read_only: true,
            reason: Some(reason.into()),
        }
    }
}

/// In-memory registry of protected entities.
pub struct ProtectedEntityTracker {
    enabled: AtomicBool,
    registry: RwLock<HashMap<EntityId, ProtectionInfo>>,
}

impl ProtectedEntityTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Turns enforcement on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Replaces the whole registry.
    ///
    /// Readers observe either the previous map or the new one, never a mix.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (EntityId, ProtectionInfo)>) {
        let replacement: HashMap<_, _> = entries.into_iter().collect();
        debug!(count = replacement.len(), "Replacing protected entity registry");
        *self.registry.write() = replacement;
    }

    /// Protects a single entity.
    pub fn protect(&self, id: EntityId, info: ProtectionInfo) {
        self.registry.write().insert(id, info);
    }

    /// Returns the protection for an entity id.
    #[must_use]
    pub fn protection(&self, id: &EntityId) -> Option<ProtectionInfo> {
        self.registry.read().get(id).cloned()
    }

    /// Returns the number of protected entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    /// Returns true if nothing is protected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }
}

impl Default for ProtectedEntityTracker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ProtectedEntityOracle for ProtectedEntityTracker {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn is_read_only(&self, entity: &dyn Entity) -> bool {
        self.registry
            .read()
            .get(&entity.id())
            .map_or(false, |info| info.read_only)
    }
}

/// Request-scoped protection state.
///
/// Starts enforcing; [`ProtectionContext::suspend`] pushes a suspended frame
/// that is popped when the returned guard is dropped.
#[derive(Debug, Clone)]
pub struct ProtectionContext {
    frames: Vec<bool>,
}

impl ProtectionContext {
    /// A context that enforces protection.
    #[must_use]
    pub fn enforcing() -> Self {
        Self { frames: vec![true] }
    }

    /// Returns true if protection is currently enforced.
    #[must_use]
    pub fn is_enforced(&self) -> bool {
        self.frames.last().copied().unwrap_or(true)
    }

    /// Suspends enforcement until the guard is dropped.
    pub fn suspend(&mut self) -> ProtectionGuard<'_> {
        self.push(false)
    }

    /// Re-enables enforcement until the guard is dropped.
    pub fn enforce(&mut self) -> ProtectionGuard<'_> {
        self.push(true)
    }

    fn push(&mut self, enforced: bool) -> ProtectionGuard<'_> {
        self.frames.push(enforced);
        let depth = self.frames.len();
        ProtectionGuard { context: self, depth }
    }
}

impl Default for ProtectionContext {
    fn default() -> Self {
        Self::enforcing()
    }
}

/// Restores the previous protection state on drop.
#[derive(Debug)]
pub struct ProtectionGuard<'a> {
    context: &'a mut ProtectionContext,
    depth: usize,
}

impl Deref for ProtectionGuard<'_> {
    type Target = ProtectionContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for ProtectionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for ProtectionGuard<'_> {
    fn drop(&mut self) {
        self.context.frames.truncate(self.depth - 1);
    }
}
