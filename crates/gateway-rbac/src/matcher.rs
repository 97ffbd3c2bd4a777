//! Matching of assigned roles against requested operations.

use crate::protection::{ProtectedEntityOracle, ProtectionContext};
use crate::role::{Permission, Role};
use crate::scope::ScopeEvaluatorCache;
use gateway_core::{Entity, EntityResolver, EntityType, OperationType};
use std::sync::Arc;
use tracing::trace;

/// Decides whether a set of roles grants an operation.
///
/// The matcher holds no per-request state; every answer depends only on its
/// arguments and the collaborators it was built with.
pub struct PermissionMatcher {
    evaluators: Arc<ScopeEvaluatorCache>,
    resolver: Arc<dyn EntityResolver>,
    protection: Arc<dyn ProtectedEntityOracle>,
}

impl PermissionMatcher {
    /// Creates a matcher.
    pub fn new(
        evaluators: Arc<ScopeEvaluatorCache>,
        resolver: Arc<dyn EntityResolver>,
        protection: Arc<dyn ProtectedEntityOracle>,
    ) -> Self {
        Self {
            evaluators,
            resolver,
            protection,
        }
    }

    /// Returns true if any role grants `operation` on `entity`.
    ///
    /// Read-only protection is checked first and overrides every grant for
    /// operations other than READ. For OTHER/NONE the permission's custom
    /// operation name must equal `other_operation`.
    pub fn is_permitted(
        &self,
        roles: &[Role],
        entity: &dyn Entity,
        operation: OperationType,
        other_operation: Option<&str>,
        context: &ProtectionContext,
    ) -> bool {
        if operation != OperationType::Read && self.is_protected(entity, context) {
            trace!(
                entity_type = %entity.entity_type(),
                entity_id = %entity.id(),
                %operation,
                "Entity is read-only"
            );
            return false;
        }

        let entity_type = entity.entity_type();
        for role in roles {
            for permission in &role.permissions {
                if !permission.applies_to(entity_type) || permission.operation != operation {
                    continue;
                }
                if operation.is_named() && permission.other_operation.as_deref() != other_operation {
                    continue;
                }
                if self.scope_matches(permission, entity) {
                    trace!(role = %role.name, %entity_type, %operation, "Permission matched");
                    return true;
                }
            }
        }
        false
    }

    /// Returns true if some role grants `operation` on every entity of `entity_type`.
    #[must_use]
    pub fn is_permitted_for_any(&self, roles: &[Role], operation: OperationType, entity_type: EntityType) -> bool {
        Self::permissions(roles).any(|p| p.operation == operation && p.applies_to(entity_type) && p.is_blanket())
    }

    /// Returns true if some role grants `operation` on at least some entities of `entity_type`.
    #[must_use]
    pub fn is_permitted_for_some(&self, roles: &[Role], operation: OperationType, entity_type: EntityType) -> bool {
        Self::permissions(roles).any(|p| p.operation == operation && p.applies_to(entity_type))
    }

    /// Returns true if `operation` is granted unconditionally on every listed type.
    ///
    /// An empty list is only satisfied by an unscoped ANY permission.
    #[must_use]
    pub fn is_permitted_for_all(&self, roles: &[Role], operation: OperationType, entity_types: &[EntityType]) -> bool {
        if self.is_permitted_for_any(roles, operation, EntityType::Any) {
            return true;
        }
        !entity_types.is_empty()
            && entity_types
                .iter()
                .all(|t| self.is_permitted_for_any(roles, operation, *t))
    }

    fn is_protected(&self, entity: &dyn Entity, context: &ProtectionContext) -> bool {
        context.is_enforced() && self.protection.is_enabled() && self.protection.is_read_only(entity)
    }

    fn scope_matches(&self, permission: &Permission, entity: &dyn Entity) -> bool {
        let mut all_match = true;
        for predicate in &permission.scope {
            all_match = all_match && self.evaluators.matches(predicate, entity, self.resolver.as_ref());
            if !all_match {
                break;
            }
        }
        all_match
    }

    fn permissions(roles: &[Role]) -> impl Iterator<Item = &Permission> {
        roles.iter().flat_map(|r| r.permissions.iter())
    }
}
