//! End-to-end diagnostic runs against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sitepilot_core::{
    format_for_copy, AuthMode, DiagnosticRun, DiagnosticsError, DiagnosticsRunner, ExecutorError,
    OverallStatus, RunStatus, RunnerOptions, ScriptedExecutor, ServiceDiagnosticConfig,
    StageCatalog, StageExecutor, StageResultsExt, StageStatus,
};
use sitepilot_state::fakes::{FailingDiagnosticStore, MemoryDiagnosticStore};
use sitepilot_state::{DiagnosticStore, StorageError};

fn ga4_config() -> ServiceDiagnosticConfig {
    ServiceDiagnosticConfig::new("ga4", "Google Analytics 4")
        .with_site("site-42")
        .with_auth_mode(AuthMode::OAuth)
        .with_required_fields(["sessions", "users", "bounce_rate"])
}

/// Passes connectivity, then fails with a connection error.
struct FailsOnSecondStage;

#[async_trait]
impl StageExecutor for FailsOnSecondStage {
    async fn execute(&mut self, run: &mut DiagnosticRun) -> Result<(), ExecutorError> {
        run.pass_stage("connectivity", "reachable", Some(json!({"latency_ms": 40})))
            .await?;
        Err(ExecutorError::Connection("token endpoint refused".to_string()))
    }
}

/// Reports every stage as passed.
struct AllPass;

#[async_trait]
impl StageExecutor for AllPass {
    async fn execute(&mut self, run: &mut DiagnosticRun) -> Result<(), ExecutorError> {
        let ids: Vec<String> = run.stages().iter().map(|s| s.stage.clone()).collect();
        for id in ids {
            run.pass_stage(&id, "ok", None).await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn executor_error_on_second_stage_fails_run() {
    let store = Arc::new(MemoryDiagnosticStore::new());
    let runner = DiagnosticsRunner::new(store.clone());

    let outcome = runner
        .run_diagnostics_for_service(ga4_config(), &mut FailsOnSecondStage)
        .await
        .expect("run completes");

    assert_eq!(outcome.status, OverallStatus::Fail);
    assert_eq!(outcome.stages.len(), 5);

    assert_eq!(outcome.stages[0].status, StageStatus::Pass);
    assert_eq!(outcome.stages[0].message, "reachable");

    assert_eq!(outcome.stages[1].stage, "authentication");
    assert_eq!(outcome.stages[1].status, StageStatus::Fail);
    assert!(outcome.stages[1].message.contains("token endpoint refused"));
    let details = outcome.stages[1].details.as_ref().unwrap();
    assert_eq!(details["error_type"], "ConnectionError");

    for stage in &outcome.stages[2..] {
        assert_eq!(stage.status, StageStatus::Pending);
    }

    let record = store.get(&outcome.run_id).await.unwrap();
    assert_eq!(record.status, RunStatus::Fail);
    assert!(record.finished_at.is_some());
    assert!(record.duration_ms.is_some());
    assert_eq!(record.stage_results().unwrap(), outcome.stages);
}

#[tokio::test]
async fn all_stages_passing_yields_pass() {
    let runner = DiagnosticsRunner::new(Arc::new(MemoryDiagnosticStore::new()));
    let outcome = runner
        .run_diagnostics_for_service(ga4_config(), &mut AllPass)
        .await
        .unwrap();
    assert_eq!(outcome.status, OverallStatus::Pass);
}

#[tokio::test]
async fn unreported_stages_yield_partial() {
    let runner = DiagnosticsRunner::new(Arc::new(MemoryDiagnosticStore::new()));
    let mut script = ScriptedExecutor::from_json_str(
        r#"{"steps": [
            {"outcome": "pass", "stage": "connectivity", "message": "ok"},
            {"outcome": "skip", "stage": "authentication", "message": "no auth"}
        ]}"#,
    )
    .unwrap();

    let outcome = runner
        .run_diagnostics_for_service(ga4_config(), &mut script)
        .await
        .unwrap();
    assert_eq!(outcome.status, OverallStatus::Partial);
    assert_eq!(outcome.stages[1].status, StageStatus::Skipped);
}

#[tokio::test]
async fn pass_stage_sets_fields_and_redacts_details() {
    let store = Arc::new(MemoryDiagnosticStore::new());
    let runner = DiagnosticsRunner::new(store.clone());
    let mut run = runner.start(ga4_config()).await.unwrap();

    run.pass_stage(
        "data_fetch",
        "ok",
        Some(json!({"rows": 12, "request": {"headers": {"Authorization": "Bearer abc"}}})),
    )
    .await
    .unwrap();

    let stage = run.stage("data_fetch").unwrap();
    assert_eq!(stage.status, StageStatus::Pass);
    assert_eq!(stage.message, "ok");
    assert!(stage.finished_at.is_some());
    assert!(stage.duration_ms.is_some());
    let details = stage.details.as_ref().unwrap();
    assert_eq!(details["rows"], 12);
    assert_eq!(details["request"]["headers"]["Authorization"], "[REDACTED]");

    let record = store.get(run.run_id()).await.unwrap();
    let persisted = record.stage_results().unwrap();
    assert_eq!(persisted[3], *stage);
}

#[tokio::test]
async fn second_report_overwrites_first() {
    let runner = DiagnosticsRunner::new(Arc::new(MemoryDiagnosticStore::new()));
    let mut run = runner.start(ga4_config()).await.unwrap();

    run.fail_stage("connectivity", "dns failure", None).await.unwrap();
    run.pass_stage("connectivity", "recovered", None).await.unwrap();

    let stage = run.stage("connectivity").unwrap();
    assert_eq!(stage.status, StageStatus::Pass);
    assert_eq!(stage.message, "recovered");
}

#[tokio::test]
async fn unknown_stage_is_ignored_by_default() {
    let store = Arc::new(MemoryDiagnosticStore::new());
    let runner = DiagnosticsRunner::new(store.clone());
    let mut run = runner.start(ga4_config()).await.unwrap();
    let writes = store.write_count();

    run.pass_stage("dns_lookup", "ok", None).await.unwrap();

    assert_eq!(store.write_count(), writes);
    assert_eq!(run.current_stage_index(), 0);
    assert!(run
        .stages()
        .iter()
        .all(|s| s.status == StageStatus::Pending));
}

#[tokio::test]
async fn unknown_stage_is_rejected_in_strict_mode() {
    let runner = DiagnosticsRunner::new(Arc::new(MemoryDiagnosticStore::new()))
        .with_options(RunnerOptions { strict: true });
    let mut run = runner.start(ga4_config()).await.unwrap();

    let err = run.pass_stage("dns_lookup", "ok", None).await.unwrap_err();
    assert!(matches!(err, DiagnosticsError::UnknownStage { ref stage } if stage == "dns_lookup"));
}

#[tokio::test]
async fn strict_unknown_stage_propagates_from_wrapper() {
    let runner = DiagnosticsRunner::new(Arc::new(MemoryDiagnosticStore::new()))
        .with_options(RunnerOptions { strict: true });
    let mut script = ScriptedExecutor::from_json_str(
        r#"{"steps": [{"outcome": "pass", "stage": "quota"}]}"#,
    )
    .unwrap();

    let err = runner
        .run_diagnostics_for_service(ga4_config(), &mut script)
        .await
        .unwrap_err();
    assert!(matches!(err, DiagnosticsError::UnknownStage { .. }));
}

#[tokio::test]
async fn custom_catalog_stage_is_reportable() {
    let runner = DiagnosticsRunner::new(Arc::new(MemoryDiagnosticStore::new()))
        .with_catalog(StageCatalog::standard().with_custom("quota", "Quota check"));
    let mut run = runner.start(ga4_config()).await.unwrap();
    assert_eq!(run.stages().len(), 6);

    run.pass_stage("quota", "80% remaining", None).await.unwrap();
    assert_eq!(run.stages()[5].status, StageStatus::Pass);
    assert_eq!(run.current_stage_index(), 6);
}

#[tokio::test]
async fn persistence_failure_on_start_propagates() {
    let runner = DiagnosticsRunner::new(Arc::new(FailingDiagnosticStore::new(0)));
    let err = runner.start(ga4_config()).await.unwrap_err();
    assert!(matches!(err, DiagnosticsError::Storage(StorageError::Backend(_))));
}

#[tokio::test]
async fn persistence_failure_mid_run_propagates_from_wrapper() {
    // create succeeds, the first stage update does not
    let runner = DiagnosticsRunner::new(Arc::new(FailingDiagnosticStore::new(1)));
    let err = runner
        .run_diagnostics_for_service(ga4_config(), &mut AllPass)
        .await
        .unwrap_err();
    assert!(matches!(err, DiagnosticsError::Storage(_)));
}

#[tokio::test]
async fn config_snapshot_keeps_host_only() {
    let store = Arc::new(MemoryDiagnosticStore::new());
    let runner = DiagnosticsRunner::new(store.clone());
    let mut run = runner.start(ga4_config()).await.unwrap();

    run.set_config_snapshot(
        &["property_id", "client_secret"],
        Some("https://user:p@ssw0rd@analyticsdata.googleapis.com/v1beta?key=abc"),
    )
    .await
    .unwrap();

    let snapshot = run.config_snapshot().unwrap();
    assert_eq!(
        snapshot.base_url_host.as_deref(),
        Some("analyticsdata.googleapis.com")
    );
    assert_eq!(snapshot.auth_mode, AuthMode::OAuth);
    assert_eq!(snapshot.required_fields.len(), 3);

    let record = store.get(run.run_id()).await.unwrap();
    let persisted = record.config_snapshot.unwrap();
    assert_eq!(persisted["base_url_host"], "analyticsdata.googleapis.com");
    assert_eq!(persisted["present_keys"], json!(["property_id", "client_secret"]));
    assert!(!persisted.to_string().contains("ssw0rd"));
}

#[tokio::test]
async fn concurrent_runs_from_one_runner_are_independent() {
    let store = Arc::new(MemoryDiagnosticStore::new());
    let runner = DiagnosticsRunner::new(store.clone());

    let mut a = runner.start(ga4_config()).await.unwrap();
    let mut b = runner
        .start(ServiceDiagnosticConfig::new("gsc", "Search Console"))
        .await
        .unwrap();
    assert_ne!(a.run_id(), b.run_id());

    a.fail_stage("connectivity", "down", None).await.unwrap();
    b.pass_stage("connectivity", "up", None).await.unwrap();

    let a_status = a.compute_overall_status();
    let b_stages = b.finish(OverallStatus::Partial).await.unwrap();
    let a_stages = a.finish(a_status).await.unwrap();

    assert_eq!(a_status, OverallStatus::Fail);
    assert_eq!(a_stages[0].status, StageStatus::Fail);
    assert_eq!(b_stages[0].status, StageStatus::Pass);
    assert_eq!(store.list(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn finished_run_exports_redacted_json() {
    let store = Arc::new(MemoryDiagnosticStore::new());
    let runner = DiagnosticsRunner::new(store.clone());
    let mut run = runner.start(ga4_config()).await.unwrap();
    run.fail_stage(
        "authentication",
        "invalid_grant",
        Some(json!({"refresh_token": "1//0secret", "status": 400})),
    )
    .await
    .unwrap();
    let run_id = run.run_id().clone();
    run.finish(OverallStatus::Fail).await.unwrap();

    let record = store.get(&run_id).await.unwrap();
    let text = format_for_copy(&record).unwrap();
    assert!(text.contains(run_id.as_str()));
    assert!(text.contains("invalid_grant"));
    assert!(!text.contains("1//0secret"));
}
