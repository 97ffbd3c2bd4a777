//! Folder hierarchy.

use crate::{Entity, EntityId, EntityType};
use std::sync::Arc;

/// A folder in the organizational tree; the root folder has no parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    id: EntityId,
    name: String,
    parent: Option<Arc<Folder>>,
}

impl Folder {
    /// Creates a root folder.
    pub fn root(id: EntityId, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            parent: None,
        })
    }

    /// Creates a child folder.
    pub fn child(parent: &Arc<Folder>, id: EntityId, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            parent: Some(Arc::clone(parent)),
        })
    }

    /// Returns the parent folder.
    #[must_use]
    pub fn parent(&self) -> Option<&Folder> {
        self.parent.as_deref()
    }

    /// Iterates from this folder up to the root, inclusive.
    pub fn ancestry(&self) -> impl Iterator<Item = &Folder> {
        std::iter::successors(Some(self), |f| f.parent())
    }

    /// Returns true if `folder_id` is this folder or one of its ancestors.
    #[must_use]
    pub fn is_within(&self, folder_id: EntityId) -> bool {
        self.ancestry().any(|f| f.id == folder_id)
    }
}

impl Entity for Folder {
    fn id(&self) -> EntityId {
        self.id
    }

    fn entity_type(&self) -> EntityType {
        EntityType::Folder
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn folder(&self) -> Option<&Folder> {
        self.parent()
    }

    fn as_folder(&self) -> Option<&Folder> {
        Some(self)
    }
}
