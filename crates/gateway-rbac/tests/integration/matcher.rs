//! Permission matching, scope and protection integration tests.

use super::common::*;
use gateway_core::{Entity, EntityId, EntityType, ManagedEntity, OperationType};
use gateway_rbac::{
    AttributeMode, Permission, ProtectionContext, ProtectionInfo, Role, ScopePredicate,
};
use std::sync::Arc;

/// A reader may read every service but not update one.
#[test]
fn test_reader_has_blanket_read_only() {
    let gw = TestGateway::with_role(TestRoles::service_reader());

    assert!(gw
        .rbac
        .is_permitted_for_any_entity_of_type(&gw.user, OperationType::Read, EntityType::Service)
        .unwrap());
    assert!(!gw
        .rbac
        .is_permitted_for_any_entity_of_type(&gw.user, OperationType::Update, EntityType::Service)
        .unwrap());
}

/// A folder-scoped grant applies to entities anywhere below the folder only.
#[test]
fn test_folder_scoped_update() {
    let tree = FolderTree::new();
    let gw = TestGateway::with_role(Role::new("FolderAdmin").with_permission(
        Permission::new(EntityType::Service, OperationType::Update)
            .with_scope(ScopePredicate::folder(tree.left.id(), true)),
    ));
    let ctx = ProtectionContext::enforcing();

    let inside = service_in(&tree.left, "s1");
    let nested = service_in(&tree.deep, "s1b");
    let outside = service_in(&tree.right, "s2");

    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &inside, OperationType::Update, None, &ctx).unwrap());
    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &nested, OperationType::Update, None, &ctx).unwrap());
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &outside, OperationType::Update, None, &ctx).unwrap());

    assert!(!gw
        .rbac
        .is_permitted_for_any_entity_of_type(&gw.user, OperationType::Update, EntityType::Service)
        .unwrap());
    assert!(gw
        .rbac
        .is_permitted_for_some_entity_of_type(&gw.user, OperationType::Update, EntityType::Service)
        .unwrap());
}

/// A non-transitive folder grant stops at the named folder.
#[test]
fn test_direct_folder_scope() {
    let tree = FolderTree::new();
    let gw = TestGateway::with_role(Role::new("LeftOnly").with_permission(
        Permission::new(EntityType::Service, OperationType::Read)
            .with_scope(ScopePredicate::folder(tree.left.id(), false)),
    ));
    let ctx = ProtectionContext::enforcing();

    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &service_in(&tree.left, "a"), OperationType::Read, None, &ctx).unwrap());
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &service_in(&tree.deep, "b"), OperationType::Read, None, &ctx).unwrap());
}

/// Folders on the path to a referenced entity are readable; others are not.
#[test]
fn test_folder_ancestry_of_referenced_entity() {
    let tree = FolderTree::new();
    let gw = TestGateway::new();
    let target = gw.resolver.insert_entity(service_in(&tree.deep, "target"));
    gw.grant(Role::for_entity("Target folders", EntityType::Service, target.id()).with_permission(
        Permission::new(EntityType::Folder, OperationType::Read)
            .with_scope(ScopePredicate::folder_ancestry(EntityType::Service, target.id())),
    ));
    let ctx = ProtectionContext::enforcing();

    for folder in [&tree.deep, &tree.left, &tree.root] {
        assert!(
            gw.rbac.is_permitted_for_entity(&gw.user, &**folder, OperationType::Read, None, &ctx).unwrap(),
            "{} should be readable",
            folder.name().unwrap_or_default()
        );
    }
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &*tree.right, OperationType::Read, None, &ctx).unwrap());

    let not_a_folder = service_in(&tree.deep, "svc");
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &not_a_folder, OperationType::Read, None, &ctx).unwrap());
}

/// Ancestry scopes deny when the referenced entity cannot be resolved.
#[test]
fn test_folder_ancestry_unresolvable_target() {
    let tree = FolderTree::new();
    let gw = TestGateway::with_role(Role::new("Dangling").with_permission(
        Permission::new(EntityType::Folder, OperationType::Read)
            .with_scope(ScopePredicate::folder_ancestry(EntityType::Service, EntityId::new())),
    ));
    let ctx = ProtectionContext::enforcing();

    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &*tree.root, OperationType::Read, None, &ctx).unwrap());

    gw.resolver.fail_type(EntityType::Service);
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &*tree.root, OperationType::Read, None, &ctx).unwrap());
}

/// Read-only entities refuse every operation except READ.
#[test]
fn test_read_only_entity() {
    let gw = TestGateway::with_role(
        Role::new("Editor")
            .with_permission(Permission::new(EntityType::Service, OperationType::Read))
            .with_permission(Permission::new(EntityType::Service, OperationType::Update)),
    );
    let x = ManagedEntity::new(EntityType::Service, EntityId::new(), "bundled");
    gw.tracker.protect(x.id(), ProtectionInfo::read_only("installed by bundle"));
    let mut ctx = ProtectionContext::enforcing();

    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &x, OperationType::Update, None, &ctx).unwrap());
    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &x, OperationType::Read, None, &ctx).unwrap());

    {
        let suspended = ctx.suspend();
        assert!(gw.rbac.is_permitted_for_entity(&gw.user, &x, OperationType::Update, None, &suspended).unwrap());
    }
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &x, OperationType::Update, None, &ctx).unwrap());
}

/// Protection wins even over an administrator's ANY grant.
#[test]
fn test_read_only_beats_any_type_grant() {
    let gw = TestGateway::with_role(TestRoles::administrator());
    let x = ManagedEntity::new(EntityType::Policy, EntityId::new(), "system policy");
    gw.tracker.replace_all([(x.id(), ProtectionInfo::read_only("system"))]);
    let ctx = ProtectionContext::enforcing();

    for operation in [OperationType::Create, OperationType::Update, OperationType::Delete] {
        assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &x, operation, None, &ctx).unwrap());
    }
    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &x, OperationType::Read, None, &ctx).unwrap());
}

/// An unscoped grant ignores every other attribute of the entity.
#[test]
fn test_blanket_grant_ignores_attributes() {
    let tree = FolderTree::new();
    let gw = TestGateway::with_role(TestRoles::service_reader());
    let ctx = ProtectionContext::enforcing();

    let plain = ManagedEntity::new(EntityType::Service, EntityId::new(), "plain");
    let decorated = service_in(&tree.deep, "decorated")
        .in_zone(EntityId::new())
        .with_attribute("routing", "/internal");

    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &plain, OperationType::Read, None, &ctx).unwrap());
    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &decorated, OperationType::Read, None, &ctx).unwrap());
}

/// Every predicate of one permission must hold; predicates of separate permissions need not.
#[test]
fn test_scope_conjunction_within_permission() {
    let tree = FolderTree::new();
    let zone = EntityId::new();
    let gw = TestGateway::with_role(Role::new("ZoneAndFolder").with_permission(
        Permission::new(EntityType::Service, OperationType::Delete)
            .with_scope(ScopePredicate::folder(tree.left.id(), true))
            .with_scope(ScopePredicate::security_zone(Some(zone))),
    ));
    let ctx = ProtectionContext::enforcing();

    let both = service_in(&tree.deep, "both").in_zone(zone);
    let folder_only = service_in(&tree.deep, "folder");
    let zone_only = service_in(&tree.right, "zone").in_zone(zone);

    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &both, OperationType::Delete, None, &ctx).unwrap());
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &folder_only, OperationType::Delete, None, &ctx).unwrap());
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &zone_only, OperationType::Delete, None, &ctx).unwrap());

    gw.grant(Role::new("ZoneOnly").with_permission(
        Permission::new(EntityType::Service, OperationType::Delete).with_scope(ScopePredicate::security_zone(Some(zone))),
    ));
    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &zone_only, OperationType::Delete, None, &ctx).unwrap());
}

/// Attribute scopes compare named attributes.
#[test]
fn test_attribute_scope() {
    let gw = TestGateway::with_role(Role::new("Internal").with_permission(
        Permission::new(EntityType::Service, OperationType::Read)
            .with_scope(ScopePredicate::attribute("routing", "/internal", AttributeMode::StartsWith)),
    ));
    let ctx = ProtectionContext::enforcing();

    let internal = ManagedEntity::new(EntityType::Service, EntityId::new(), "a").with_attribute("routing", "/internal/billing");
    let public = ManagedEntity::new(EntityType::Service, EntityId::new(), "b").with_attribute("routing", "/public");

    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &internal, OperationType::Read, None, &ctx).unwrap());
    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &public, OperationType::Read, None, &ctx).unwrap());
}

/// Decisions are stable and safe to make from many threads at once.
#[test]
fn test_concurrent_decisions_are_stable() {
    let tree = FolderTree::new();
    let gw = Arc::new(TestGateway::with_role(Role::new("FolderAdmin").with_permission(
        Permission::new(EntityType::Service, OperationType::Update)
            .with_scope(ScopePredicate::folder(tree.left.id(), true)),
    )));
    let inside = Arc::new(service_in(&tree.deep, "inside"));
    let outside = Arc::new(service_in(&tree.right, "outside"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gw = Arc::clone(&gw);
            let inside = Arc::clone(&inside);
            let outside = Arc::clone(&outside);
            std::thread::spawn(move || {
                let ctx = ProtectionContext::enforcing();
                for _ in 0..100 {
                    assert!(gw.rbac.is_permitted_for_entity(&gw.user, &*inside, OperationType::Update, None, &ctx).unwrap());
                    assert!(!gw.rbac.is_permitted_for_entity(&gw.user, &*outside, OperationType::Update, None, &ctx).unwrap());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
