//! Contract tests for DiagnosticStore.
//!
//! Every conforming implementation must pass these. They run against the
//! in-memory fake and against SurrealDB's `mem://` engine.

use chrono::{Duration, Utc};
use serde_json::json;
use sitepilot_state::fakes::{FailingDiagnosticStore, MemoryDiagnosticStore};
use sitepilot_state::{
    DiagnosticPatch, DiagnosticRecord, DiagnosticStore, RunId, RunStatus, StorageError,
    SurrealDiagnosticStore,
};

fn record(run_id: &str, service_id: &str) -> DiagnosticRecord {
    DiagnosticRecord {
        run_id: RunId::from(run_id),
        service_id: service_id.to_string(),
        service_name: format!("{service_id} service"),
        site_id: Some("site-1".to_string()),
        status: RunStatus::Running,
        stages: json!([
            {"stage": "connectivity", "status": "pending", "message": ""},
            {"stage": "authentication", "status": "pending", "message": ""}
        ]),
        config_snapshot: None,
        started_at: Utc::now(),
        finished_at: None,
        duration_ms: None,
    }
}

async fn create_then_get(store: &dyn DiagnosticStore) {
    let rec = record("diag-1-aaaa", "ga4");
    store.create(rec.clone()).await.unwrap();

    let fetched = store.get(&rec.run_id).await.unwrap();
    assert_eq!(fetched.run_id, rec.run_id);
    assert_eq!(fetched.status, RunStatus::Running);
    assert_eq!(fetched.stages, rec.stages);
}

async fn duplicate_create_rejected(store: &dyn DiagnosticStore) {
    let rec = record("diag-2-bbbb", "ga4");
    store.create(rec.clone()).await.unwrap();
    let err = store.create(rec).await.unwrap_err();
    assert!(matches!(err, StorageError::DuplicateRun { .. }));
}

async fn update_applies_patch(store: &dyn DiagnosticStore) {
    let rec = record("diag-3-cccc", "gsc");
    store.create(rec.clone()).await.unwrap();

    let stages = json!([{"stage": "connectivity", "status": "pass", "message": "ok"}]);
    store
        .update(&rec.run_id, DiagnosticPatch::stages(stages.clone()))
        .await
        .unwrap();
    store
        .update(
            &rec.run_id,
            DiagnosticPatch::config_snapshot(json!({"auth_mode": "oauth"})),
        )
        .await
        .unwrap();

    let fetched = store.get(&rec.run_id).await.unwrap();
    assert_eq!(fetched.stages, stages);
    assert_eq!(fetched.config_snapshot, Some(json!({"auth_mode": "oauth"})));
    assert_eq!(fetched.status, RunStatus::Running);
}

async fn update_unknown_run_fails(store: &dyn DiagnosticStore) {
    let err = store
        .update(&RunId::from("diag-0-missing"), DiagnosticPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::RunNotFound { .. }));
}

async fn terminal_run_rejects_updates(store: &dyn DiagnosticStore) {
    let rec = record("diag-4-dddd", "serp");
    store.create(rec.clone()).await.unwrap();

    let finish = DiagnosticPatch {
        status: Some(RunStatus::Pass),
        finished_at: Some(Utc::now()),
        duration_ms: Some(120),
        ..DiagnosticPatch::default()
    };
    store.update(&rec.run_id, finish).await.unwrap();

    let fetched = store.get(&rec.run_id).await.unwrap();
    assert_eq!(fetched.status, RunStatus::Pass);
    assert_eq!(fetched.duration_ms, Some(120));
    assert!(fetched.finished_at.is_some());

    let err = store
        .update(&rec.run_id, DiagnosticPatch::stages(json!([])))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));
}

async fn list_filters_and_orders(store: &dyn DiagnosticStore) {
    let mut older = record("diag-5-eeee", "competitive");
    older.started_at = Utc::now() - Duration::minutes(5);
    let newer = record("diag-6-ffff", "competitive");
    let other = record("diag-7-gggg", "technical");

    store.create(older).await.unwrap();
    store.create(newer).await.unwrap();
    store.create(other).await.unwrap();

    let listed = store.list(Some("competitive")).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(ids, vec!["diag-6-ffff", "diag-5-eeee"]);

    let all = store.list(None).await.unwrap();
    assert!(all.len() >= 3);
}

async fn run_contract(store: &dyn DiagnosticStore) {
    create_then_get(store).await;
    duplicate_create_rejected(store).await;
    update_applies_patch(store).await;
    update_unknown_run_fails(store).await;
    terminal_run_rejects_updates(store).await;
    list_filters_and_orders(store).await;
}

#[tokio::test]
async fn memory_store_satisfies_contract() {
    let store = MemoryDiagnosticStore::new();
    run_contract(&store).await;
}

#[tokio::test]
async fn surreal_store_satisfies_contract() {
    let store = SurrealDiagnosticStore::in_memory().await.unwrap();
    run_contract(&store).await;
}

#[tokio::test]
async fn memory_store_counts_writes() {
    let store = MemoryDiagnosticStore::new();
    let rec = record("diag-9-iiii", "ga4");
    store.create(rec.clone()).await.unwrap();
    store
        .update(&rec.run_id, DiagnosticPatch::stages(json!([])))
        .await
        .unwrap();
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn failing_store_rejects_after_limit() {
    let store = FailingDiagnosticStore::new(1);
    let rec = record("diag-10-jjjj", "ga4");
    store.create(rec.clone()).await.unwrap();

    let err = store
        .update(&rec.run_id, DiagnosticPatch::stages(json!([])))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Backend(_)));
}
