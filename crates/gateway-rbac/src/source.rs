//! Role assignment and current-user collaborators.

use crate::cache::{CacheConfig, CacheStats, TtlCache};
use crate::role::Role;
use gateway_core::{EntityType, LookupError, LookupResult, RoleId, User, UserKey};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Supplies the roles assigned to a user.
pub trait RoleAssignmentSource: Send + Sync {
    /// Returns every role assigned to the user.
    fn assigned_roles(&self, user: &UserKey) -> LookupResult<Vec<Role>>;

    /// Returns true if any assigned role is tagged administrative.
    fn is_administrative_user(&self, user: &UserKey) -> LookupResult<bool> {
        Ok(self.assigned_roles(user)?.iter().any(Role::is_admin))
    }
}

/// Supplies the user on whose behalf a secured operation runs.
pub trait CurrentUserContext: Send + Sync {
    /// Returns the current user, if one is authenticated.
    fn current_user(&self) -> Option<User>;
}

/// A settable current-user holder.
#[derive(Debug, Default)]
pub struct SessionUser {
    user: RwLock<Option<User>>,
}

impl SessionUser {
    /// Creates a holder for the given user.
    #[must_use]
    pub fn new(user: User) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Creates an empty holder.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replaces the current user.
    pub fn set(&self, user: Option<User>) {
        *self.user.write() = user;
    }
}

impl CurrentUserContext for SessionUser {
    fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }
}

/// In-memory role store.
pub struct InMemoryRoleSource {
    roles: RwLock<HashMap<RoleId, Role>>,
    user_roles: RwLock<HashMap<UserKey, HashSet<RoleId>>>,
}

impl InMemoryRoleSource {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            user_roles: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a role and returns its id.
    pub fn add_role(&self, role: Role) -> RoleId {
        let id = role.id;
        self.roles.write().insert(id, role);
        id
    }

    /// Gets a role by ID.
    pub fn get_role(&self, id: &RoleId) -> Option<Role> {
        self.roles.read().get(id).cloned()
    }

    /// Deletes a role and every assignment of it.
    pub fn remove_role(&self, id: &RoleId) -> Option<Role> {
        for assigned in self.user_roles.write().values_mut() {
            assigned.remove(id);
        }
        self.roles.write().remove(id)
    }

    /// Assigns a role to a user.
    pub fn assign_role(&self, user: &UserKey, role_id: RoleId) -> LookupResult<()> {
        if !self.roles.read().contains_key(&role_id) {
            return Err(LookupError::not_found(EntityType::Role, role_id));
        }

        self.user_roles.write().entry(*user).or_default().insert(role_id);

        Ok(())
    }

    /// Removes a role from a user.
    pub fn revoke_role(&self, user: &UserKey, role_id: &RoleId) {
        if let Some(roles) = self.user_roles.write().get_mut(user) {
            roles.remove(role_id);
        }
    }
}

impl Default for InMemoryRoleSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleAssignmentSource for InMemoryRoleSource {
    fn assigned_roles(&self, user: &UserKey) -> LookupResult<Vec<Role>> {
        let role_ids = self.user_roles.read().get(user).cloned().unwrap_or_default();
        let roles = self.roles.read();
        Ok(role_ids.iter().filter_map(|id| roles.get(id).cloned()).collect())
    }
}

/// Caches role lookups and administrative checks per user.
pub struct CachedRoleSource {
    inner: Arc<dyn RoleAssignmentSource>,
    roles: TtlCache<UserKey, Vec<Role>>,
    admins: TtlCache<UserKey, bool>,
}

impl CachedRoleSource {
    /// Default TTL for cached role assignments.
    pub const ROLE_TTL: Duration = Duration::from_secs(1);
    /// Default TTL for cached administrative checks.
    pub const ADMIN_TTL: Duration = Duration::from_secs(5);

    /// Wraps a source with the default TTLs.
    pub fn new(inner: Arc<dyn RoleAssignmentSource>, capacity: usize) -> Self {
        Self::with_ttls(inner, capacity, Self::ROLE_TTL, Self::ADMIN_TTL)
    }

    /// Wraps a source with explicit TTLs.
    pub fn with_ttls(
        inner: Arc<dyn RoleAssignmentSource>,
        capacity: usize,
        role_ttl: Duration,
        admin_ttl: Duration,
    ) -> Self {
        Self {
            inner,
            roles: TtlCache::new(CacheConfig::new(capacity, role_ttl)),
            admins: TtlCache::new(CacheConfig::new(capacity, admin_ttl)),
        }
    }

    /// Forgets everything cached for a user.
    pub fn invalidate(&self, user: &UserKey) {
        self.roles.invalidate(user);
        self.admins.invalidate(user);
    }

    /// Forgets everything.
    pub fn clear(&self) {
        self.roles.clear();
        self.admins.clear();
    }

    /// Returns role cache statistics.
    pub fn role_stats(&self) -> CacheStats {
        self.roles.stats()
    }
}

impl RoleAssignmentSource for CachedRoleSource {
    fn assigned_roles(&self, user: &UserKey) -> LookupResult<Vec<Role>> {
        self.roles.get_or_try_insert(*user, || {
            trace!(%user, "Loading role assignments");
            self.inner.assigned_roles(user)
        })
    }

    fn is_administrative_user(&self, user: &UserKey) -> LookupResult<bool> {
        self.admins
            .get_or_try_insert(*user, || self.inner.is_administrative_user(user))
    }
}
