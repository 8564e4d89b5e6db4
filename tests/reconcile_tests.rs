/// Reconciliation tests
///
/// Snapshot merge scenarios checked for content and for reference identity.
/// Run with: cargo test --test reconcile_tests

use chrono::{DateTime, Duration, Utc};
use invsync::core::{FieldId, RecordId};
use invsync::model::FieldConstraints;
use invsync::reconcile::ValidationIssue;
use invsync::{
    Actor, ActorId, AssetRecord, ClientMirror, FieldDefinition, FieldType, FieldValue, LeaseKey,
    LeaseView, LocalCache, Snapshot, Validator, reconcile,
};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn viewer(id: &str) -> ActorId {
    ActorId::new(id)
}

fn asset_x(f1: &str) -> AssetRecord {
    AssetRecord::new("asset-x", "Laptop X")
        .with_field("f1", f1)
        .with_field("f2", "keep")
}

fn serial_definition(pattern: &str) -> FieldDefinition {
    FieldDefinition::new("f1", "Serial", FieldType::Text)
        .required()
        .with_constraints(FieldConstraints {
            pattern: Some(pattern.to_string()),
            ..Default::default()
        })
}

fn apply(cache: &LocalCache, snapshot: &Snapshot, validator: &Validator) -> (LocalCache, invsync::reconcile::ReconcileStats) {
    let outcome = reconcile(cache, snapshot, &viewer("alice"), validator);
    (outcome.cache, outcome.stats)
}

#[test]
fn test_three_snapshot_scenario() {
    let validator = Validator::default();
    let x = RecordId::new("asset-x");
    let (f1, f2) = (FieldId::new("f1"), FieldId::new("f2"));

    let s1 = Snapshot::new(t0()).with_asset(asset_x("v1"));
    let (c1, stats) = apply(&LocalCache::new(), &s1, &validator);
    assert_eq!(stats.records_inserted, 1);
    assert_eq!(
        **c1.asset(&x).unwrap().field(&f1).unwrap(),
        FieldValue::from("v1")
    );

    // Identical snapshot: nothing reassigned.
    let s2 = Snapshot::new(t0() + Duration::seconds(5)).with_asset(asset_x("v1"));
    let (c2, stats) = apply(&c1, &s2, &validator);
    assert!(stats.is_noop());
    assert_eq!(c2, c1);
    assert!(Arc::ptr_eq(c1.asset(&x).unwrap(), c2.asset(&x).unwrap()));

    // Only f1 changes; f2 keeps its reference.
    let s3 = Snapshot::new(t0() + Duration::seconds(10)).with_asset(asset_x("v2"));
    let (c3, stats) = apply(&c2, &s3, &validator);
    assert_eq!(stats.records_updated, 1);
    assert_eq!(stats.field_writes, 1);

    let before = c2.asset(&x).unwrap();
    let after = c3.asset(&x).unwrap();
    assert_eq!(**after.field(&f1).unwrap(), FieldValue::from("v2"));
    assert!(Arc::ptr_eq(
        before.field(&f2).unwrap(),
        after.field(&f2).unwrap()
    ));
    assert!(!Arc::ptr_eq(
        before.field(&f1).unwrap(),
        after.field(&f1).unwrap()
    ));
}

#[test]
fn test_reconcile_is_idempotent() {
    let validator = Validator::default();
    let snapshot = Snapshot::new(t0())
        .with_asset(asset_x("v1"))
        .with_asset(AssetRecord::new("asset-y", "Monitor Y").with_field("f1", 27.0))
        .with_definition(serial_definition(r"^v\d+$"))
        .with_lease(LeaseView {
            key: LeaseKey::field("asset-y", "f1"),
            holder: Actor::new("bob", "bob@example.com"),
            expires_at: t0() + Duration::seconds(60),
        });

    let (once, _) = apply(&LocalCache::new(), &snapshot, &validator);
    let (twice, stats) = apply(&once, &snapshot, &validator);

    assert!(stats.is_noop());
    assert_eq!(stats.field_writes, 0);
    assert_eq!(once, twice);
    for asset in once.assets() {
        assert!(Arc::ptr_eq(asset, twice.asset(&asset.id).unwrap()));
    }
}

#[test]
fn test_bookkeeping_changes_are_not_content_changes() {
    let validator = Validator::default();
    let x = RecordId::new("asset-x");

    let (c1, _) = apply(
        &LocalCache::new(),
        &Snapshot::new(t0()).with_asset(asset_x("v1").with_revision(1)),
        &validator,
    );
    let (c2, stats) = apply(
        &c1,
        &Snapshot::new(t0()).with_asset(asset_x("v1").with_revision(2)),
        &validator,
    );

    assert!(stats.is_noop());
    assert!(Arc::ptr_eq(c1.asset(&x).unwrap(), c2.asset(&x).unwrap()));
}

#[test]
fn test_vanished_and_deleted_records_leave_the_cache() {
    let validator = Validator::default();
    let first = Snapshot::new(t0())
        .with_asset(asset_x("v1"))
        .with_asset(AssetRecord::new("asset-y", "Monitor Y"))
        .with_asset(AssetRecord::new("asset-z", "Dock Z"));
    let (c1, _) = apply(&LocalCache::new(), &first, &validator);
    assert_eq!(c1.len(), 3);

    let mut deleted_y = AssetRecord::new("asset-y", "Monitor Y");
    deleted_y.deleted = true;
    let second = Snapshot::new(t0())
        .with_asset(asset_x("v1"))
        .with_asset(deleted_y);
    let (c2, stats) = apply(&c1, &second, &validator);

    assert_eq!(stats.records_removed, 2);
    assert_eq!(c2.len(), 1);
    assert!(c2.asset(&RecordId::new("asset-y")).is_none());
    assert!(c2.asset(&RecordId::new("asset-z")).is_none());
}

#[test]
fn test_repeated_record_id_last_entry_wins() {
    let validator = Validator::default();
    let x = RecordId::new("asset-x");
    let f1 = FieldId::new("f1");
    let snapshot = Snapshot::new(t0())
        .with_asset(asset_x("a"))
        .with_asset(asset_x("b"));

    let (once, stats) = apply(&LocalCache::new(), &snapshot, &validator);
    assert_eq!(stats.records_inserted, 1);
    assert_eq!(**once.asset(&x).unwrap().field(&f1).unwrap(), FieldValue::from("b"));

    let (twice, stats) = apply(&once, &snapshot, &validator);
    assert!(stats.is_noop());
    assert_eq!(**twice.asset(&x).unwrap().field(&f1).unwrap(), FieldValue::from("b"));
    assert!(Arc::ptr_eq(once.asset(&x).unwrap(), twice.asset(&x).unwrap()));

    // A trailing deleted entry removes the record.
    let mut gone = asset_x("b");
    gone.deleted = true;
    let (c3, stats) = apply(&twice, &snapshot.clone().with_asset(gone), &validator);
    assert_eq!(stats.records_removed, 1);
    assert!(c3.is_empty());
}

#[test]
fn test_repeated_definition_id_last_entry_wins() {
    let validator = Validator::default();
    let f1 = FieldId::new("f1");
    let snapshot = Snapshot::new(t0())
        .with_definition(serial_definition(r"^v\d+$"))
        .with_definition(serial_definition(r"^SN-\d+$"))
        .with_asset(asset_x("v1"));

    let (once, stats) = apply(&LocalCache::new(), &snapshot, &validator);
    assert_eq!(stats.definitions_changed, 1);
    assert_eq!(
        once.definition(&f1).unwrap().constraints.pattern.as_deref(),
        Some(r"^SN-\d+$")
    );
    assert!(!once.asset(&RecordId::new("asset-x")).unwrap().validation.is_valid());

    let (twice, stats) = apply(&once, &snapshot, &validator);
    assert!(stats.is_noop());
    assert!(Arc::ptr_eq(
        once.definition(&f1).unwrap(),
        twice.definition(&f1).unwrap()
    ));
}

#[test]
fn test_validation_reused_when_record_unchanged() {
    let validator = Validator::default();
    let x = RecordId::new("asset-x");
    let f1 = FieldId::new("f1");

    let s1 = Snapshot::new(t0())
        .with_definition(serial_definition(r"^SN-\d+$"))
        .with_asset(asset_x("bad"))
        .with_asset(AssetRecord::new("asset-y", "Monitor Y").with_field("f1", "SN-1"));
    let (c1, _) = apply(&LocalCache::new(), &s1, &validator);

    let report = &c1.asset(&x).unwrap().validation;
    assert!(!report.is_valid());
    assert!(matches!(
        report.issues_for(&f1),
        [ValidationIssue::PatternMismatch { .. }]
    ));

    // Only asset-y changes; asset-x keeps its report untouched.
    let s2 = Snapshot::new(t0())
        .with_definition(serial_definition(r"^SN-\d+$"))
        .with_asset(asset_x("bad"))
        .with_asset(AssetRecord::new("asset-y", "Monitor Y").with_field("f1", "oops"));
    let (c2, stats) = apply(&c1, &s2, &validator);

    assert_eq!(stats.records_revalidated, 1);
    assert!(Arc::ptr_eq(
        &c1.asset(&x).unwrap().validation,
        &c2.asset(&x).unwrap().validation
    ));
    assert!(
        !c2.asset(&RecordId::new("asset-y"))
            .unwrap()
            .validation
            .is_valid()
    );
}

#[test]
fn test_definition_change_revalidates_every_record() {
    let validator = Validator::default();
    let x = RecordId::new("asset-x");

    let s1 = Snapshot::new(t0())
        .with_definition(serial_definition(r"^SN-\d+$"))
        .with_asset(asset_x("v1"));
    let (c1, _) = apply(&LocalCache::new(), &s1, &validator);
    assert!(!c1.asset(&x).unwrap().validation.is_valid());

    let s2 = Snapshot::new(t0())
        .with_definition(serial_definition(r"^v\d+$"))
        .with_asset(asset_x("v1"));
    let (c2, stats) = apply(&c1, &s2, &validator);

    assert_eq!(stats.definitions_changed, 1);
    assert_eq!(stats.records_revalidated, 1);
    assert_eq!(stats.field_writes, 0);
    assert!(c2.asset(&x).unwrap().validation.is_valid());
    // Metadata cells are shared even though the asset node was replaced.
    assert!(Arc::ptr_eq(
        c1.asset(&x).unwrap().field(&FieldId::new("f1")).unwrap(),
        c2.asset(&x).unwrap().field(&FieldId::new("f1")).unwrap()
    ));
}

#[test]
fn test_required_field_missing_is_reported() {
    let validator = Validator::default();
    let snapshot = Snapshot::new(t0())
        .with_definition(serial_definition(r"^SN-\d+$"))
        .with_asset(AssetRecord::new("asset-q", "Unlabelled"));
    let (cache, _) = apply(&LocalCache::new(), &snapshot, &validator);

    let report = &cache.asset(&RecordId::new("asset-q")).unwrap().validation;
    assert_eq!(
        report.issues_for(&FieldId::new("f1")),
        &[ValidationIssue::Required]
    );
}

#[test]
fn test_lock_labels_depend_on_viewer() {
    let validator = Validator::default();
    let x = RecordId::new("asset-x");
    let f1 = FieldId::new("f1");
    let snapshot = Snapshot::new(t0())
        .with_asset(asset_x("v1"))
        .with_lease(LeaseView {
            key: LeaseKey::field("asset-x", "f1"),
            holder: Actor::new("alice", "alice@example.com"),
            expires_at: t0() + Duration::seconds(60),
        });

    let own = reconcile(&LocalCache::new(), &snapshot, &viewer("alice"), &validator).cache;
    let view = own.lock_view(&x, &f1);
    assert!(!view.locked);
    assert_eq!(view.locked_by_label, None);

    let other = reconcile(&LocalCache::new(), &snapshot, &viewer("bob"), &validator).cache;
    let view = other.lock_view(&x, &f1);
    assert!(view.locked);
    assert_eq!(view.locked_by_label.as_deref(), Some("alice@example.com"));

    // Other cells of the same record are not affected.
    assert!(!other.lock_view(&x, &FieldId::new("f2")).locked);
    assert!(!other.definition_lock_view(&x).locked);
}

#[test]
fn test_expired_lease_shows_no_label() {
    let validator = Validator::default();
    let snapshot = Snapshot::new(t0() + Duration::seconds(60))
        .with_asset(asset_x("v1"))
        .with_lease(LeaseView {
            key: LeaseKey::record("f1"),
            holder: Actor::new("alice", "alice@example.com"),
            expires_at: t0() + Duration::seconds(60),
        });

    let cache = reconcile(&LocalCache::new(), &snapshot, &viewer("bob"), &validator).cache;
    assert!(!cache.definition_lock_view(&RecordId::new("f1")).locked);
}

#[test]
fn test_released_lease_clears_label() {
    let validator = Validator::default();
    let key = LeaseKey::field("asset-x", "f1");
    let held = Snapshot::new(t0())
        .with_asset(asset_x("v1"))
        .with_lease(LeaseView {
            key: key.clone(),
            holder: Actor::new("alice", "alice@example.com"),
            expires_at: t0() + Duration::seconds(60),
        });
    let released = Snapshot::new(t0() + Duration::seconds(1)).with_asset(asset_x("v1"));

    let c1 = reconcile(&LocalCache::new(), &held, &viewer("bob"), &validator).cache;
    let outcome = reconcile(&c1, &released, &viewer("bob"), &validator);

    assert_eq!(outcome.stats.labels_changed, 1);
    assert!(outcome.cache.lock_label(&key).is_none());
}

#[tokio::test]
async fn test_client_mirror_applies_in_order() {
    let mirror = ClientMirror::new(viewer("bob"), Validator::default());
    let x = RecordId::new("asset-x");
    let snapshot = Snapshot::new(t0())
        .with_asset(asset_x("v1"))
        .with_lease(LeaseView {
            key: LeaseKey::field("asset-x", "f2"),
            holder: Actor::new("alice", "alice@example.com"),
            expires_at: t0() + Duration::seconds(60),
        });

    let first = mirror.apply(&snapshot).await;
    assert_eq!(first.records_inserted, 1);
    let before = mirror.current().await;

    let second = mirror.apply(&snapshot).await;
    assert!(second.is_noop());
    let after = mirror.current().await;
    assert!(Arc::ptr_eq(before.asset(&x).unwrap(), after.asset(&x).unwrap()));

    let view = mirror.lock_view(&x, &FieldId::new("f2")).await;
    assert_eq!(view.locked_by_label.as_deref(), Some("alice@example.com"));
}
