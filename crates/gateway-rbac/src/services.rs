//! User-facing authorization decisions.

use crate::config::RbacConfig;
use crate::error::RbacResult;
use crate::matcher::PermissionMatcher;
use crate::protection::{ProtectedEntityOracle, ProtectedEntityTracker, ProtectionContext};
use crate::role::Role;
use crate::scope::ScopeEvaluatorCache;
use crate::source::{CachedRoleSource, RoleAssignmentSource};
use crate::value::Securable;
use gateway_core::{Entity, EntityHeader, EntityRef, EntityResolver, EntityType, OperationType, User};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{trace, warn};

/// Answers authorization questions for a user.
///
/// Roles are fetched from the [`RoleAssignmentSource`] on every call; wrap it
/// in a [`CachedRoleSource`] to bound lookups.
pub struct RbacServices {
    roles: Arc<dyn RoleAssignmentSource>,
    resolver: Arc<dyn EntityResolver>,
    matcher: PermissionMatcher,
    governing_types: Vec<EntityType>,
}

impl RbacServices {
    /// Creates the decision service.
    pub fn new(
        roles: Arc<dyn RoleAssignmentSource>,
        resolver: Arc<dyn EntityResolver>,
        protection: Arc<dyn ProtectedEntityOracle>,
        evaluators: Arc<ScopeEvaluatorCache>,
    ) -> Self {
        let matcher = PermissionMatcher::new(evaluators, Arc::clone(&resolver), protection);
        Self {
            roles,
            resolver,
            matcher,
            governing_types: Vec::new(),
        }
    }

    /// Builds the service from configuration.
    ///
    /// The role source is wrapped in a TTL cache and the tracker's
    /// enforcement is set from `protection_enabled`.
    pub fn from_config(
        config: &RbacConfig,
        roles: Arc<dyn RoleAssignmentSource>,
        resolver: Arc<dyn EntityResolver>,
        tracker: Arc<ProtectedEntityTracker>,
    ) -> Self {
        tracker.set_enabled(config.protection_enabled);
        let cached = CachedRoleSource::with_ttls(
            roles,
            config.cache_capacity,
            config.role_cache_ttl(),
            config.admin_cache_ttl(),
        );
        Self::new(Arc::new(cached), resolver, tracker, Arc::new(ScopeEvaluatorCache::new()))
            .with_governing_types(config.filter_governing_types.iter().copied())
    }

    /// Sets the default governing types for header filtering.
    #[must_use]
    pub fn with_governing_types(mut self, types: impl IntoIterator<Item = EntityType>) -> Self {
        self.governing_types = types.into_iter().collect();
        self
    }

    /// Returns the entity resolver.
    pub fn resolver(&self) -> &Arc<dyn EntityResolver> {
        &self.resolver
    }

    /// Returns the roles assigned to a user.
    pub fn assigned_roles(&self, user: &User) -> RbacResult<Vec<Role>> {
        Ok(self.roles.assigned_roles(&user.key())?)
    }

    /// Returns true if the user holds an administrative role.
    pub fn is_administrative_user(&self, user: &User) -> RbacResult<bool> {
        Ok(self.roles.is_administrative_user(&user.key())?)
    }

    /// Returns true if the user may perform `operation` on every entity of `entity_type`.
    pub fn is_permitted_for_any_entity_of_type(
        &self,
        user: &User,
        operation: OperationType,
        entity_type: EntityType,
    ) -> RbacResult<bool> {
        let roles = self.assigned_roles(user)?;
        Ok(self.matcher.is_permitted_for_any(&roles, operation, entity_type))
    }

    /// Returns true if the user may perform `operation` on some entities of `entity_type`.
    pub fn is_permitted_for_some_entity_of_type(
        &self,
        user: &User,
        operation: OperationType,
        entity_type: EntityType,
    ) -> RbacResult<bool> {
        let roles = self.assigned_roles(user)?;
        Ok(self.matcher.is_permitted_for_some(&roles, operation, entity_type))
    }

    /// Returns true if the user holds blanket `operation` permission on every listed type.
    pub fn is_permitted_for_entities_of_types(
        &self,
        user: &User,
        operation: OperationType,
        entity_types: &[EntityType],
    ) -> RbacResult<bool> {
        let roles = self.assigned_roles(user)?;
        Ok(self.matcher.is_permitted_for_all(&roles, operation, entity_types))
    }

    /// Returns true if the user may perform `operation` on `entity`.
    pub fn is_permitted_for_entity(
        &self,
        user: &User,
        entity: &dyn Entity,
        operation: OperationType,
        other_operation: Option<&str>,
        context: &ProtectionContext,
    ) -> RbacResult<bool> {
        let roles = self.assigned_roles(user)?;
        Ok(self
            .matcher
            .is_permitted(&roles, entity, operation, other_operation, context))
    }

    /// Keeps the headers whose entities the user may perform `operation` on.
    ///
    /// If the user holds blanket permission on every governing type the input
    /// is returned untouched. Governing types come from `governing_types`,
    /// else the configured defaults, else the types present in `headers`.
    /// Headers that cannot be resolved are skipped.
    pub fn filter_permitted_headers(
        &self,
        user: &User,
        operation: OperationType,
        headers: Vec<EntityHeader>,
        governing_types: Option<&[EntityType]>,
        context: &ProtectionContext,
    ) -> RbacResult<Vec<EntityHeader>> {
        if headers.is_empty() {
            return Ok(headers);
        }

        let roles = self.assigned_roles(user)?;
        let present: Vec<EntityType>;
        let governing = match governing_types {
            Some(types) => types,
            None if !self.governing_types.is_empty() => self.governing_types.as_slice(),
            None => {
                present = headers
                    .iter()
                    .map(|h| h.entity_type)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                present.as_slice()
            }
        };

        if self.matcher.is_permitted_for_all(&roles, operation, governing) {
            trace!(count = headers.len(), %operation, "Blanket permission, skipping header filter");
            return Ok(headers);
        }

        let total = headers.len();
        let permitted: Vec<EntityHeader> = headers
            .into_iter()
            .filter(|header| match self.resolve(header) {
                Some(entity) => self
                    .matcher
                    .is_permitted(&roles, entity.as_ref(), operation, None, context),
                None => false,
            })
            .collect();

        trace!(total, permitted = permitted.len(), %operation, "Filtered headers");
        Ok(permitted)
    }

    /// Keeps the entities and headers the user may perform `operation` on.
    ///
    /// Relative order is preserved. Headers that cannot be resolved are skipped.
    pub fn filter_permitted(
        &self,
        user: &User,
        operation: OperationType,
        other_operation: Option<&str>,
        items: Vec<Securable>,
        context: &ProtectionContext,
    ) -> RbacResult<Vec<Securable>> {
        if items.is_empty() {
            return Ok(items);
        }

        let roles = self.assigned_roles(user)?;
        Ok(items
            .into_iter()
            .filter(|item| {
                let entity = match item {
                    Securable::Entity(entity) => Some(Arc::clone(entity)),
                    Securable::Header(header) => self.resolve(header),
                };
                entity.map_or(false, |e| {
                    self.matcher
                        .is_permitted(&roles, e.as_ref(), operation, other_operation, context)
                })
            })
            .collect())
    }

    fn resolve(&self, header: &EntityHeader) -> Option<EntityRef> {
        match self.resolver.find_by_header(header) {
            Ok(Some(entity)) => Some(entity),
            Ok(None) => {
                warn!(%header, "Header does not resolve to an entity, skipping");
                None
            }
            Err(e) => {
                warn!(%header, error = %e, "Header lookup failed, skipping");
                None
            }
        }
    }
}
