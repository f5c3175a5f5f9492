//! Per-stage results and the aggregate run status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitepilot_state::{DiagnosticRecord, RunStatus};

/// Status of one diagnostic stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Pass,
    Fail,
    Skipped,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Pass => "pass",
            StageStatus::Fail => "fail",
            StageStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StageStatus::Pending)
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single stage within a diagnostic run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageResult {
    /// Catalog identifier of the stage.
    pub stage: String,
    pub status: StageStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Time since the previous stage finished (or the run started).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Redacted supporting data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl StageResult {
    pub fn pending(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            status: StageStatus::Pending,
            message: String::new(),
            started_at: None,
            finished_at: None,
            duration_ms: None,
            details: None,
        }
    }
}

/// Aggregate status of a finished run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Pass,
    Partial,
    Fail,
}

impl OverallStatus {
    /// Fail if any stage failed; pass if every stage passed or was skipped;
    /// partial otherwise.
    pub fn from_stages(stages: &[StageResult]) -> Self {
        if stages.iter().any(|s| s.status == StageStatus::Fail) {
            OverallStatus::Fail
        } else if stages
            .iter()
            .all(|s| matches!(s.status, StageStatus::Pass | StageStatus::Skipped))
        {
            OverallStatus::Pass
        } else {
            OverallStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Pass => "pass",
            OverallStatus::Partial => "partial",
            OverallStatus::Fail => "fail",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OverallStatus> for RunStatus {
    fn from(status: OverallStatus) -> Self {
        match status {
            OverallStatus::Pass => RunStatus::Pass,
            OverallStatus::Partial => RunStatus::Partial,
            OverallStatus::Fail => RunStatus::Fail,
        }
    }
}

/// Decode the stage array persisted on a [`DiagnosticRecord`].
pub trait StageResultsExt {
    fn stage_results(&self) -> Result<Vec<StageResult>, serde_json::Error>;
}

impl StageResultsExt for DiagnosticRecord {
    fn stage_results(&self) -> Result<Vec<StageResult>, serde_json::Error> {
        serde_json::from_value(self.stages.clone())
    }
}
