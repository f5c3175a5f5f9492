//! Storage trait definitions for sitepilot
//!
//! `DiagnosticStore` is the write-mostly persistence seam used by the
//! diagnostics runner:
//! - `create` stores the initial record when a run starts
//! - `update` applies a partial patch after every stage report and at finish
//!
//! Read-back (`get`, `list`) exists for tooling; the runner itself never reads.
//! In-memory fakes are provided for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// Unique identifier for a diagnostic run.
///
/// Generated ids combine a millisecond timestamp with a random suffix, so
/// they sort roughly by creation time and do not collide across processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new run id of the form `diag-<millis>-<suffix>`.
    pub fn generate() -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        RunId(format!(
            "diag-{}-{}",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        RunId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Lifecycle status of a persisted diagnostic run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Pass,
    Partial,
    Fail,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Pass => "pass",
            RunStatus::Partial => "partial",
            RunStatus::Fail => "fail",
        }
    }

    /// Terminal runs no longer accept updates.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn parse(s: &str) -> StorageResult<Self> {
        match s {
            "running" => Ok(RunStatus::Running),
            "pass" => Ok(RunStatus::Pass),
            "partial" => Ok(RunStatus::Partial),
            "fail" => Ok(RunStatus::Fail),
            other => Err(StorageError::Backend(format!(
                "unknown diagnostic run status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full diagnostic run record.
///
/// `stages` holds the ordered stage array as JSON; its shape is owned by
/// the diagnostics layer and stored verbatim here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub run_id: RunId,
    pub service_id: String,
    pub service_name: String,
    pub site_id: Option<String>,
    pub status: RunStatus,
    pub stages: serde_json::Value,
    pub config_snapshot: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

/// Partial update applied to an existing [`DiagnosticRecord`].
///
/// Fields left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticPatch {
    pub stages: Option<serde_json::Value>,
    pub config_snapshot: Option<serde_json::Value>,
    pub status: Option<RunStatus>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl DiagnosticPatch {
    /// Patch that replaces the stage array.
    pub fn stages(stages: serde_json::Value) -> Self {
        Self {
            stages: Some(stages),
            ..Self::default()
        }
    }

    /// Patch that replaces the config snapshot.
    pub fn config_snapshot(snapshot: serde_json::Value) -> Self {
        Self {
            config_snapshot: Some(snapshot),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_none()
            && self.config_snapshot.is_none()
            && self.status.is_none()
            && self.finished_at.is_none()
            && self.duration_ms.is_none()
    }

    /// Apply every populated field onto `record`.
    pub fn apply_to(&self, record: &mut DiagnosticRecord) {
        if let Some(stages) = &self.stages {
            record.stages = stages.clone();
        }
        if let Some(snapshot) = &self.config_snapshot {
            record.config_snapshot = Some(snapshot.clone());
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(finished_at) = self.finished_at {
            record.finished_at = Some(finished_at);
        }
        if let Some(duration_ms) = self.duration_ms {
            record.duration_ms = Some(duration_ms);
        }
    }
}

// ---------------------------------------------------------------------------
// DiagnosticStore
// ---------------------------------------------------------------------------

/// Diagnostic run persistence.
///
/// Guarantees:
/// - `create` fails with `DuplicateRun` if the run id is already stored.
/// - `update` fails with `RunNotFound` for unknown runs.
/// - A run transitions Running → Pass | Partial | Fail; terminal records
///   reject further updates with `InvalidRunState`.
#[async_trait]
pub trait DiagnosticStore: Send + Sync {
    /// Store the initial record of a run.
    async fn create(&self, record: DiagnosticRecord) -> StorageResult<()>;

    /// Apply a partial update to a running record.
    async fn update(&self, run_id: &RunId, patch: DiagnosticPatch) -> StorageResult<()>;

    /// Retrieve a record by run id.
    async fn get(&self, run_id: &RunId) -> StorageResult<DiagnosticRecord>;

    /// List records newest first, optionally filtered by service id.
    async fn list(&self, service_id: Option<&str>) -> StorageResult<Vec<DiagnosticRecord>>;
}
