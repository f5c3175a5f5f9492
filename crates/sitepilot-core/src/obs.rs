//! Structured lifecycle events for diagnostic runs and plan assembly.
//!
//! Every event carries an `event` field with a dotted name so log
//! pipelines can filter on it. Run lifecycle events are `info!`; anything
//! that means a caller did something odd is `warn!`.

use tracing::{debug, info, warn};

/// Span tagged with the run id.
///
/// Attach it to async work with `tracing::Instrument::instrument` rather
/// than entering it, so it is never held across an await point.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("sitepilot.diagnostics", run_id = %run_id)
}

pub fn emit_run_started(run_id: &str, service_id: &str, stage_count: usize) {
    info!(
        event = "diagnostics.run_started",
        run_id = %run_id,
        service_id = %service_id,
        stage_count = stage_count,
    );
}

pub fn emit_stage_reported(run_id: &str, stage: &str, status: &str, duration_ms: u64) {
    info!(
        event = "diagnostics.stage_reported",
        run_id = %run_id,
        stage = %stage,
        status = %status,
        duration_ms = duration_ms,
    );
}

/// A stage id outside the catalog was reported.
pub fn emit_unknown_stage(run_id: &str, stage: &str) {
    warn!(event = "diagnostics.unknown_stage", run_id = %run_id, stage = %stage);
}

/// The executor aborted; `stage` is where the failure gets recorded, if any
/// stage was still pending.
pub fn emit_executor_failed(
    run_id: &str,
    stage: Option<&str>,
    error_type: &str,
    error: &dyn std::fmt::Display,
) {
    warn!(
        event = "diagnostics.executor_failed",
        run_id = %run_id,
        stage = stage.unwrap_or("-"),
        error_type = %error_type,
        error = %error,
    );
}

pub fn emit_run_finished(run_id: &str, status: &str, duration_ms: u64) {
    info!(
        event = "diagnostics.run_finished",
        run_id = %run_id,
        status = %status,
        duration_ms = duration_ms,
    );
}

/// Emit event: recommendations assembled into a plan.
pub fn emit_plan_assembled(site_id: &str, total: usize, duplicates_dropped: usize, confidence: &str) {
    info!(
        event = "plan.assembled",
        site_id = %site_id,
        total = total,
        duplicates_dropped = duplicates_dropped,
        confidence = %confidence,
    );
}

pub fn emit_duplicate_dropped(fingerprint: &str, agent_source: &str) {
    debug!(
        event = "plan.duplicate_dropped",
        fingerprint = %fingerprint,
        agent_source = %agent_source,
    );
}
