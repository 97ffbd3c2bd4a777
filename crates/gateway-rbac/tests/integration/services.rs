//! Decision service and collection filtering integration tests.

use super::common::*;
use gateway_core::{Entity, EntityHeader, EntityId, EntityType, InMemoryEntityStore, OperationType};
use gateway_rbac::{
    CachedRoleSource, Permission, ProtectedEntityTracker, ProtectionContext, RbacConfig, RbacServices, Role,
    RoleAssignmentSource, ScopePredicate, Securable,
};
use std::sync::Arc;
use std::time::Duration;

fn headers_in(gw: &TestGateway, tree: &FolderTree, layout: &[bool]) -> (Vec<EntityHeader>, Vec<EntityId>) {
    let mut headers = Vec::new();
    let mut permitted = Vec::new();
    for (i, in_left) in layout.iter().enumerate() {
        let folder = if *in_left { &tree.left } else { &tree.right };
        let entity = gw.resolver.insert_entity(service_in(folder, &format!("svc-{i}")));
        if *in_left {
            permitted.push(entity.id());
        }
        headers.push(entity.header());
    }
    (headers, permitted)
}

/// Blanket permission on every contained type returns the input untouched.
#[test]
fn test_blanket_filter_is_identity() {
    let tree = FolderTree::new();
    let gw = TestGateway::with_role(TestRoles::service_reader());
    let (headers, _) = headers_in(&gw, &tree, &[true, false, true]);
    let expected = headers.clone();
    let ptr = headers.as_ptr();
    let finds_before = gw.resolver.find_count();

    let filtered = gw
        .rbac
        .filter_permitted_headers(&gw.user, OperationType::Read, headers, None, &ProtectionContext::enforcing())
        .unwrap();

    assert_eq!(filtered.as_ptr(), ptr);
    assert_eq!(filtered, expected);
    assert_eq!(gw.resolver.find_count(), finds_before);
}

/// Without any role nothing survives filtering.
#[test]
fn test_no_permissions_filters_everything() {
    let tree = FolderTree::new();
    let gw = TestGateway::new();
    let (headers, _) = headers_in(&gw, &tree, &[true, true, false]);

    let filtered = gw
        .rbac
        .filter_permitted_headers(&gw.user, OperationType::Read, headers, None, &ProtectionContext::enforcing())
        .unwrap();
    assert!(filtered.is_empty());
}

/// Partial permission removes exactly the unpermitted headers and keeps order.
#[test]
fn test_partial_filter_preserves_order() {
    let tree = FolderTree::new();
    let gw = TestGateway::with_role(Role::new("LeftReader").with_permission(
        Permission::new(EntityType::Service, OperationType::Read)
            .with_scope(ScopePredicate::folder(tree.left.id(), true)),
    ));
    let (headers, permitted) = headers_in(&gw, &tree, &[false, true, true, false, true, false]);

    let filtered = gw
        .rbac
        .filter_permitted_headers(&gw.user, OperationType::Read, headers, None, &ProtectionContext::enforcing())
        .unwrap();
    assert_eq!(filtered.iter().map(|h| h.id).collect::<Vec<_>>(), permitted);
}

/// Headers whose lookup fails are skipped rather than failing the filter.
#[test]
fn test_unresolvable_headers_are_skipped() {
    let gw = TestGateway::with_role(Role::new("PolicyOnly").with_permission(
        Permission::new(EntityType::Policy, OperationType::Read)
            .with_scope(ScopePredicate::attribute("owner", "ops", Default::default())),
    ));
    let owned = gw.resolver.insert_entity(
        gateway_core::ManagedEntity::new(EntityType::Policy, EntityId::new(), "p").with_attribute("owner", "ops"),
    );
    gw.resolver.fail_type(EntityType::Service);

    let headers = vec![
        EntityHeader::new(EntityType::Service, EntityId::new()),
        owned.header(),
        EntityHeader::new(EntityType::Policy, EntityId::new()),
    ];
    let filtered = gw
        .rbac
        .filter_permitted_headers(&gw.user, OperationType::Read, headers, None, &ProtectionContext::enforcing())
        .unwrap();
    assert_eq!(filtered, vec![owned.header()]);
}

/// Configured governing types replace the types found in the collection.
#[test]
fn test_configured_governing_types() {
    let tree = FolderTree::new();
    let roles = Arc::new(gateway_rbac::InMemoryRoleSource::new());
    let store = Arc::new(FlakyResolver::new());
    let user = TestUsers::operator();
    let reader = roles.add_role(TestRoles::service_reader());
    roles.assign_role(&user.key(), reader).unwrap();

    let config = RbacConfig {
        filter_governing_types: vec![EntityType::Service, EntityType::Policy],
        ..RbacConfig::default()
    };
    let rbac = RbacServices::from_config(&config, roles, store.clone(), Arc::new(ProtectedEntityTracker::default()));

    let left = store.insert_entity(service_in(&tree.left, "kept"));
    let dangling = EntityHeader::new(EntityType::Service, EntityId::new());
    let filtered = rbac
        .filter_permitted_headers(
            &user,
            OperationType::Read,
            vec![left.header(), dangling],
            None,
            &ProtectionContext::enforcing(),
        )
        .unwrap();

    // Reader lacks blanket READ on POLICY, so every header is checked.
    assert_eq!(filtered, vec![left.header()]);
}

/// Mixed entities and headers are filtered in place.
#[test]
fn test_filter_mixed_items() {
    let tree = FolderTree::new();
    let gw = TestGateway::with_role(Role::new("LeftReader").with_permission(
        Permission::new(EntityType::Service, OperationType::Read)
            .with_scope(ScopePredicate::folder(tree.left.id(), true)),
    ));
    let kept_entity = service_in(&tree.deep, "entity").into_ref();
    let dropped_entity = service_in(&tree.right, "entity").into_ref();
    let kept_header = gw.resolver.insert_entity(service_in(&tree.left, "header"));

    let items = vec![
        Securable::Entity(dropped_entity),
        Securable::Entity(kept_entity.clone()),
        Securable::Header(kept_header.header()),
    ];
    let filtered = gw
        .rbac
        .filter_permitted(&gw.user, OperationType::Read, None, items, &ProtectionContext::enforcing())
        .unwrap();

    let ids: Vec<_> = filtered.iter().map(|i| i.identity().1).collect();
    assert_eq!(ids, vec![kept_entity.id(), kept_header.id()]);
}

/// Cached role answers expire after their TTL.
#[test]
fn test_cached_roles_expire() {
    let inner = Arc::new(gateway_rbac::InMemoryRoleSource::new());
    let user = TestUsers::operator();
    let cached = Arc::new(CachedRoleSource::with_ttls(
        inner.clone(),
        8,
        Duration::from_millis(20),
        Duration::from_millis(20),
    ));
    let rbac = RbacServices::new(
        cached.clone(),
        Arc::new(InMemoryEntityStore::new()),
        Arc::new(ProtectedEntityTracker::default()),
        Arc::new(gateway_rbac::ScopeEvaluatorCache::new()),
    );

    assert!(!rbac.is_administrative_user(&user).unwrap());
    let admin = inner.add_role(Role::admin("Administrator"));
    inner.assign_role(&user.key(), admin).unwrap();
    assert!(!rbac.is_administrative_user(&user).unwrap());

    std::thread::sleep(Duration::from_millis(40));
    assert!(rbac.is_administrative_user(&user).unwrap());
    assert_eq!(cached.assigned_roles(&user.key()).unwrap().len(), 1);
}
