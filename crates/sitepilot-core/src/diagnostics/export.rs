//! Copy/paste export of a stored diagnostic run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sitepilot_state::{DiagnosticRecord, RunId, RunStatus};

use super::error::DiagnosticsError;
use super::redact::SecretRedactor;
use crate::domain::{StageResultsExt, StageStatus};

#[derive(Serialize)]
struct ExportedStage {
    stage: String,
    status: StageStatus,
    message: String,
    duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Serialize)]
struct ExportedRun<'a> {
    run_id: &'a RunId,
    service_id: &'a str,
    service_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    site_id: Option<&'a str>,
    status: RunStatus,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    duration_ms: Option<u64>,
    stages: Vec<ExportedStage>,
    config_snapshot: Option<&'a Value>,
}

/// Render `record` as pretty JSON with every sensitive field redacted.
pub fn format_for_copy(record: &DiagnosticRecord) -> Result<String, DiagnosticsError> {
    format_for_copy_with(record, &SecretRedactor::new())
}

/// [`format_for_copy`] with a caller-supplied redactor.
///
/// The whole document is redacted again on the way out, so records
/// written by an older or misconfigured runner still export clean.
pub fn format_for_copy_with(
    record: &DiagnosticRecord,
    redactor: &SecretRedactor,
) -> Result<String, DiagnosticsError> {
    let stages = record
        .stage_results()?
        .into_iter()
        .map(|s| ExportedStage {
            stage: s.stage,
            status: s.status,
            message: s.message,
            duration_ms: s.duration_ms,
            details: s.details,
        })
        .collect();

    let export = ExportedRun {
        run_id: &record.run_id,
        service_id: &record.service_id,
        service_name: &record.service_name,
        site_id: record.site_id.as_deref(),
        status: record.status,
        started_at: record.started_at,
        finished_at: record.finished_at,
        duration_ms: record.duration_ms,
        stages,
        config_snapshot: record.config_snapshot.as_ref(),
    };

    let mut value = serde_json::to_value(&export)?;
    redactor.redact_in_place(&mut value);
    Ok(serde_json::to_string_pretty(&value)?)
}
