//! Scope predicates narrowing a permission to a subset of entities.
//!
//! Each persisted predicate is compiled once into a [`ScopeEvaluator`] and the
//! evaluator is cached by predicate id in a process-wide concurrent map.

use dashmap::DashMap;
use gateway_core::{Entity, EntityId, EntityResolver, EntityType, PredicateId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{trace, warn};

/// How an attribute predicate compares values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeMode {
    /// Values must be equal.
    #[default]
    Equals,
    /// Entity value must start with the predicate value.
    StartsWith,
}

/// The constraint a scope predicate expresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScopeKind {
    /// Matches exactly one entity.
    ObjectIdentity {
        /// Id of the permitted entity.
        target_id: EntityId,
    },
    /// Matches entities placed in a folder.
    Folder {
        /// The folder.
        folder_id: EntityId,
        /// Whether entities in subfolders match too.
        #[serde(default)]
        transitive: bool,
    },
    /// Matches the folders on the folder chain of an entity.
    FolderAncestry {
        /// Type of the referenced entity.
        entity_type: EntityType,
        /// Id of the referenced entity.
        entity_id: EntityId,
    },
    /// Matches zoneable entities in a security zone; `None` means no zone.
    SecurityZone {
        /// The zone.
        zone_id: Option<EntityId>,
    },
    /// Matches entities whose attribute has the given value.
    Attribute {
        /// Attribute name.
        name: String,
        /// Expected value.
        value: String,
        /// Comparison mode.
        #[serde(default)]
        mode: AttributeMode,
    },
}

/// A persisted scope predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopePredicate {
    /// Immutable identity of this predicate.
    pub id: PredicateId,
    /// The constraint.
    #[serde(flatten)]
    pub kind: ScopeKind,
}

impl ScopePredicate {
    /// Creates a predicate with a fresh id.
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            id: PredicateId::new(),
            kind,
        }
    }

    /// Matches a single entity.
    pub fn object_identity(target_id: EntityId) -> Self {
        Self::new(ScopeKind::ObjectIdentity { target_id })
    }

    /// Matches entities in a folder, optionally including subfolders.
    pub fn folder(folder_id: EntityId, transitive: bool) -> Self {
        Self::new(ScopeKind::Folder { folder_id, transitive })
    }

    /// Matches the folders containing an entity.
    pub fn folder_ancestry(entity_type: EntityType, entity_id: EntityId) -> Self {
        Self::new(ScopeKind::FolderAncestry { entity_type, entity_id })
    }

    /// Matches entities in a security zone.
    pub fn security_zone(zone_id: Option<EntityId>) -> Self {
        Self::new(ScopeKind::SecurityZone { zone_id })
    }

    /// Matches entities by attribute.
    pub fn attribute(name: impl Into<String>, value: impl Into<String>, mode: AttributeMode) -> Self {
        Self::new(ScopeKind::Attribute {
            name: name.into(),
            value: value.into(),
            mode,
        })
    }

    /// Returns the entity this predicate depends on, if any.
    ///
    /// When that entity is deleted the predicate can no longer match anything.
    #[must_use]
    pub fn requires_entity(&self) -> Option<(EntityType, EntityId)> {
        match &self.kind {
            ScopeKind::Folder { folder_id, .. } => Some((EntityType::Folder, *folder_id)),
            ScopeKind::FolderAncestry { entity_type, entity_id } => Some((*entity_type, *entity_id)),
            ScopeKind::SecurityZone { zone_id } => zone_id.map(|z| (EntityType::SecurityZone, z)),
            ScopeKind::ObjectIdentity { .. } | ScopeKind::Attribute { .. } => None,
        }
    }
}

/// Compiled matching logic for one predicate.
#[derive(Debug, Clone)]
pub enum ScopeEvaluator {
    /// Id comparison.
    ObjectIdentity(EntityId),
    /// Folder membership.
    Folder {
        /// The folder.
        folder_id: EntityId,
        /// Whether subfolders match.
        transitive: bool,
    },
    /// Ancestor folder of a referenced entity.
    FolderAncestry {
        /// Type of the referenced entity.
        entity_type: EntityType,
        /// Id of the referenced entity.
        entity_id: EntityId,
    },
    /// Zone membership.
    SecurityZone(Option<EntityId>),
    /// Attribute comparison.
    Attribute {
        /// Attribute name.
        name: String,
        /// Expected value.
        value: String,
        /// Comparison mode.
        mode: AttributeMode,
    },
}

impl ScopeEvaluator {
    /// Compiles the evaluator for a predicate.
    #[must_use]
    pub fn compile(predicate: &ScopePredicate) -> Self {
        match &predicate.kind {
            ScopeKind::ObjectIdentity { target_id } => Self::ObjectIdentity(*target_id),
            ScopeKind::Folder { folder_id, transitive } => Self::Folder {
                folder_id: *folder_id,
                transitive: *transitive,
            },
            ScopeKind::FolderAncestry { entity_type, entity_id } => Self::FolderAncestry {
                entity_type: *entity_type,
                entity_id: *entity_id,
            },
            ScopeKind::SecurityZone { zone_id } => Self::SecurityZone(*zone_id),
            ScopeKind::Attribute { name, value, mode } => Self::Attribute {
                name: name.clone(),
                value: value.clone(),
                mode: *mode,
            },
        }
    }

    /// Returns true if the candidate entity satisfies the predicate.
    pub fn matches(&self, candidate: &dyn Entity, resolver: &dyn EntityResolver) -> bool {
        match self {
            Self::ObjectIdentity(target_id) => candidate.id() == *target_id,
            Self::Folder { folder_id, transitive } => {
                let folder = candidate.as_folder().or_else(|| candidate.folder());
                match folder {
                    Some(folder) if *transitive => folder.is_within(*folder_id),
                    Some(folder) => folder.id() == *folder_id,
                    None => false,
                }
            }
            Self::FolderAncestry { entity_type, entity_id } => {
                Self::is_ancestor_folder(candidate, *entity_type, *entity_id, resolver)
            }
            Self::SecurityZone(zone_id) => {
                candidate.entity_type().is_security_zoneable() && candidate.security_zone() == *zone_id
            }
            Self::Attribute { name, value, mode } => match candidate.attribute(name) {
                Some(actual) => match mode {
                    AttributeMode::Equals => actual == *value,
                    AttributeMode::StartsWith => actual.starts_with(value.as_str()),
                },
                None => false,
            },
        }
    }

    fn is_ancestor_folder(
        candidate: &dyn Entity,
        entity_type: EntityType,
        entity_id: EntityId,
        resolver: &dyn EntityResolver,
    ) -> bool {
        let Some(candidate_folder) = candidate.as_folder() else {
            return false;
        };

        let target = match resolver.find(entity_type, entity_id) {
            Ok(Some(target)) => target,
            Ok(None) => {
                trace!(%entity_type, %entity_id, "Folder ancestry target not found");
                return false;
            }
            Err(e) => {
                warn!(%entity_type, %entity_id, error = %e, "Unable to resolve folder ancestry target");
                return false;
            }
        };

        match target.folder() {
            Some(folder) => folder.ancestry().any(|f| f.id() == candidate_folder.id()),
            None => false,
        }
    }
}

/// Process-wide cache of compiled evaluators keyed by predicate id.
#[derive(Debug, Default)]
pub struct ScopeEvaluatorCache {
    evaluators: DashMap<PredicateId, Arc<ScopeEvaluator>>,
}

impl ScopeEvaluatorCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the evaluator for a predicate, compiling it on first use.
    ///
    /// Concurrent first lookups race on the map entry; the first writer wins
    /// and every caller receives the same evaluator.
    pub fn evaluator(&self, predicate: &ScopePredicate) -> Arc<ScopeEvaluator> {
        if let Some(existing) = self.evaluators.get(&predicate.id) {
            return Arc::clone(existing.value());
        }
        let entry = self
            .evaluators
            .entry(predicate.id)
            .or_insert_with(|| Arc::new(ScopeEvaluator::compile(predicate)));
        Arc::clone(entry.value())
    }

    /// Evaluates a predicate against a candidate.
    pub fn matches(&self, predicate: &ScopePredicate, candidate: &dyn Entity, resolver: &dyn EntityResolver) -> bool {
        self.evaluator(predicate).matches(candidate, resolver)
    }

    /// Drops the cached evaluator for a predicate.
    pub fn invalidate(&self, id: &PredicateId) {
        self.evaluators.remove(id);
    }

    /// Returns the number of cached evaluators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}
