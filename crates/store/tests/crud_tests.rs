//! Integration tests for create, read, update, delete, and versioning.

mod common;

use serde_json::json;

use chartstore::error::{ConcurrencyError, ResourceError, StoreError, ValidationError};
use chartstore::{ResourceKind, SearchQuery};

use common::{memory_store, observation_json, patient_json};

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_assigns_id_and_stamps_version_one() {
    let store = memory_store();

    let created = store
        .create(ResourceKind::Patient, patient_json(None))
        .await
        .expect("create should succeed");

    assert!(!created.id().is_empty(), "id should be assigned");
    assert_eq!(created.version(), 1);
    assert!(!created.is_deleted());
    assert_eq!(created.body()["resourceType"], "Patient");
    assert_eq!(created.body()["id"], created.id());
}

#[tokio::test]
async fn test_create_trusts_caller_supplied_id() {
    let store = memory_store();

    let created = store
        .create(ResourceKind::Patient, patient_json(Some("p-42")))
        .await
        .unwrap();

    assert_eq!(created.id(), "p-42");
    assert_eq!(created.full_reference(), "Patient/p-42");
}

#[tokio::test]
async fn test_duplicate_create_leaves_first_version_intact() {
    let store = memory_store();
    store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();

    let mut second = patient_json(Some("p-1"));
    second["name"][0]["family"] = json!("Intruder");
    let err = store.create(ResourceKind::Patient, second).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Resource(ResourceError::AlreadyExists { .. })
    ));

    let stored = store.read(ResourceKind::Patient, "p-1").await.unwrap();
    assert_eq!(stored.version(), 1);
    assert_eq!(stored.body()["name"][0]["family"], "Smith");
}

#[tokio::test]
async fn test_create_rejects_kind_mismatch() {
    let store = memory_store();

    let err = store
        .create(ResourceKind::Patient, json!({"resourceType": "Observation"}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::KindMismatch { .. })
    ));
}

#[tokio::test]
async fn test_create_rejects_malformed_payload() {
    let store = memory_store();

    let err = store
        .create(ResourceKind::Patient, json!(["not", "an", "object"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::InvalidPayload { .. })
    ));
}

#[tokio::test]
async fn test_create_requires_owner_for_clinical_events() {
    let store = memory_store();

    let err = store
        .create(ResourceKind::Observation, json!({"status": "final"}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::MissingOwner { .. })
    ));
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn test_read_missing_resource_is_not_found() {
    let store = memory_store();

    let err = store.read(ResourceKind::Patient, "ghost").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Resource(ResourceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_read_returns_tombstone() {
    let store = memory_store();
    let created = store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();
    store.delete(ResourceKind::Patient, created.id()).await.unwrap();

    let read = store.read(ResourceKind::Patient, "p-1").await.unwrap();
    assert!(read.is_deleted(), "direct reads do not filter tombstones");
    assert_eq!(read.version(), 2);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_increments_version_and_replaces_body() {
    let store = memory_store();
    let created = store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();

    let updated = store
        .update(
            ResourceKind::Patient,
            created.id(),
            json!({"name": [{"family": "Jones"}]}),
        )
        .await
        .unwrap();
    assert_eq!(updated.version(), 2);
    assert_eq!(updated.etag(), "W/\"2\"");

    let read = store.read(ResourceKind::Patient, "p-1").await.unwrap();
    assert_eq!(read.version(), 2);
    assert_eq!(read.body()["name"][0]["family"], "Jones");
}

#[tokio::test]
async fn test_update_missing_resource_is_not_found() {
    let store = memory_store();

    let err = store
        .update(ResourceKind::Patient, "ghost", patient_json(None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Resource(ResourceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_update_cannot_resurrect_tombstone() {
    let store = memory_store();
    store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();
    store.delete(ResourceKind::Patient, "p-1").await.unwrap();

    let err = store
        .update(
            ResourceKind::Patient,
            "p-1",
            json!({"name": [{"family": "Lazarus"}]}),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Resource(ResourceError::NotFound { .. })
    ));

    // The tombstone is untouched: still deleted, still version 2, and
    // still hidden from default search.
    let read = store.read(ResourceKind::Patient, "p-1").await.unwrap();
    assert!(read.is_deleted());
    assert_eq!(read.version(), 2);

    let results = store
        .search(ResourceKind::Patient, SearchQuery::new())
        .await
        .unwrap();
    assert_eq!(results.total_hint, 0);
}

#[tokio::test]
async fn test_update_timestamps_move_forward() {
    let store = memory_store();
    let created = store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();

    let updated = store
        .update(ResourceKind::Patient, "p-1", patient_json(Some("p-1")))
        .await
        .unwrap();
    assert!(updated.last_modified() >= created.last_modified());
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_tombstones_with_new_version() {
    let store = memory_store();
    store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();

    store.delete(ResourceKind::Patient, "p-1").await.unwrap();

    let read = store.read(ResourceKind::Patient, "p-1").await.unwrap();
    assert!(read.is_deleted());
    assert_eq!(read.version(), 2);
    assert_eq!(read.body()["name"][0]["family"], "Smith", "body is retained");
}

#[tokio::test]
async fn test_delete_missing_resource_is_not_found() {
    let store = memory_store();

    let err = store.delete(ResourceKind::Patient, "ghost").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Resource(ResourceError::NotFound { .. })
    ));
}

// ============================================================================
// Versioning supplements
// ============================================================================

#[tokio::test]
async fn test_vread_returns_exact_historical_body() {
    let store = memory_store();
    store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();
    store
        .update(
            ResourceKind::Patient,
            "p-1",
            json!({"name": [{"family": "Jones"}]}),
        )
        .await
        .unwrap();

    let v1 = store.vread(ResourceKind::Patient, "p-1", 1).await.unwrap();
    assert_eq!(v1.version(), 1);
    assert_eq!(v1.body()["name"][0]["family"], "Smith");

    let v2 = store.vread(ResourceKind::Patient, "p-1", 2).await.unwrap();
    assert_eq!(v2.body()["name"][0]["family"], "Jones");

    let err = store.vread(ResourceKind::Patient, "p-1", 9).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Resource(ResourceError::VersionNotFound { .. })
    ));
}

#[tokio::test]
async fn test_history_is_gap_free_and_newest_first() {
    let store = memory_store();
    store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();
    store
        .update(ResourceKind::Patient, "p-1", patient_json(Some("p-1")))
        .await
        .unwrap();
    store.delete(ResourceKind::Patient, "p-1").await.unwrap();

    let history = store.history(ResourceKind::Patient, "p-1").await.unwrap();
    let versions: Vec<u64> = history.iter().map(|r| r.version()).collect();
    assert_eq!(versions, vec![3, 2, 1]);
    assert!(history[0].is_deleted());
    assert!(!history[2].is_deleted());
}

#[tokio::test]
async fn test_exists_sees_tombstones() {
    let store = memory_store();
    assert!(!store.exists(ResourceKind::Patient, "p-1").await.unwrap());

    store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();
    assert!(store.exists(ResourceKind::Patient, "p-1").await.unwrap());

    store.delete(ResourceKind::Patient, "p-1").await.unwrap();
    assert!(
        store.exists(ResourceKind::Patient, "p-1").await.unwrap(),
        "identity never returns to absent"
    );
}

// ============================================================================
// Full lifecycle
// ============================================================================

/// The create -> update -> delete -> search walk-through, end to end.
#[tokio::test]
async fn test_lifecycle_scenario() {
    let store = memory_store();

    let created = store
        .create(ResourceKind::Patient, json!({"name": [{"family": "A"}]}))
        .await
        .unwrap();
    assert_eq!(created.version(), 1);
    assert!(!created.id().is_empty());

    let updated = store
        .update(
            ResourceKind::Patient,
            created.id(),
            json!({"name": [{"family": "B"}]}),
        )
        .await
        .unwrap();
    assert_eq!(updated.version(), 2);
    let read = store.read(ResourceKind::Patient, created.id()).await.unwrap();
    assert_eq!(read.body()["name"][0]["family"], "B");

    store.delete(ResourceKind::Patient, created.id()).await.unwrap();
    let tombstone = store.read(ResourceKind::Patient, created.id()).await.unwrap();
    assert_eq!(tombstone.version(), 3);
    assert!(tombstone.is_deleted());

    let default_results = store
        .search(ResourceKind::Patient, SearchQuery::new())
        .await
        .unwrap();
    assert!(
        !default_results
            .resources()
            .any(|r| r.id() == created.id()),
        "tombstones are hidden by default"
    );

    let with_deleted = store
        .search(ResourceKind::Patient, SearchQuery::new().with_deleted(true))
        .await
        .unwrap();
    let found = with_deleted
        .resources()
        .find(|r| r.id() == created.id())
        .expect("includeDeleted should surface the tombstone");
    assert_eq!(found.version(), 3);
}

// ============================================================================
// Conflict surface
// ============================================================================

#[tokio::test]
async fn test_concurrent_updates_never_skip_versions() {
    use std::sync::Arc;

    let store = Arc::new(memory_store());
    store
        .create(ResourceKind::Patient, patient_json(Some("p-1")))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..4 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .update(
                    ResourceKind::Patient,
                    "p-1",
                    json!({"name": [{"family": format!("v{i}")}]}),
                )
                .await
        }));
    }

    let mut succeeded = 0u64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(StoreError::Concurrency(ConcurrencyError::Conflict { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let current = store.read(ResourceKind::Patient, "p-1").await.unwrap();
    assert_eq!(
        current.version(),
        1 + succeeded,
        "every successful update advances the version by exactly one"
    );

    let history = store.history(ResourceKind::Patient, "p-1").await.unwrap();
    let mut versions: Vec<u64> = history.iter().map(|r| r.version()).collect();
    versions.sort_unstable();
    let expected: Vec<u64> = (1..=1 + succeeded).collect();
    assert_eq!(versions, expected, "history carries no duplicate versions");
}

#[tokio::test]
async fn test_owner_survives_update_and_delete() {
    let store = memory_store();
    let created = store
        .create(ResourceKind::Observation, observation_json("p-9"))
        .await
        .unwrap();
    assert_eq!(created.owner().unwrap().reference(), "Patient/p-9");

    store
        .delete(ResourceKind::Observation, created.id())
        .await
        .unwrap();
    let tombstone = store
        .read(ResourceKind::Observation, created.id())
        .await
        .unwrap();
    assert_eq!(tombstone.owner().unwrap().reference(), "Patient/p-9");
}
