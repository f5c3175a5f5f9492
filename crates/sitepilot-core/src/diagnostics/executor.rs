//! Stage executor seam and a scripted implementation.
//!
//! A [`StageExecutor`] is the only component that talks to the real
//! service. It receives the run handle and reports each stage through
//! `pass_stage` / `fail_stage` / `skip_stage`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::DiagnosticsError;
use super::runner::DiagnosticRun;
use crate::domain::{Result as DomainResult, SitepilotError};

/// Error escaping a stage executor.
///
/// [`ExecutorError::Diagnostics`] wraps runner errors (persistence, strict
/// unknown stage) and is propagated as-is; every other variant is recorded
/// on the first pending stage.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ExecutorError {
    /// Short type name recorded in failed-stage details.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorError::Connection(_) => "ConnectionError",
            ExecutorError::Authentication(_) => "AuthenticationError",
            ExecutorError::Timeout(_) => "TimeoutError",
            ExecutorError::UnexpectedResponse(_) => "UnexpectedResponseError",
            ExecutorError::Diagnostics(_) => "DiagnosticsError",
            ExecutorError::Other(_) => "Error",
        }
    }
}

/// Performs the actual checks for one service.
#[async_trait]
pub trait StageExecutor: Send {
    async fn execute(&mut self, run: &mut DiagnosticRun) -> Result<(), ExecutorError>;
}

/// Error category a scripted `error` step raises.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedErrorKind {
    Connection,
    Authentication,
    Timeout,
    UnexpectedResponse,
    #[default]
    Other,
}

/// One step of a [`ScriptedExecutor`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScriptedStep {
    Pass {
        stage: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
    Fail {
        stage: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        details: Option<serde_json::Value>,
    },
    Skip {
        stage: String,
        #[serde(default)]
        message: String,
    },
    /// Record a config snapshot.
    Snapshot {
        #[serde(default)]
        present_keys: Vec<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    /// Abort the executor with an error.
    Error {
        #[serde(default)]
        kind: ScriptedErrorKind,
        message: String,
    },
}

/// Executor that replays pre-recorded outcomes in order.
///
/// Useful for reproducing a customer's run from a saved script and for
/// tests. Execution stops at the first `error` step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptedExecutor {
    #[serde(default)]
    pub steps: Vec<ScriptedStep>,
}

impl ScriptedExecutor {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self { steps }
    }

    pub fn from_json_str(s: &str) -> DomainResult<Self> {
        let script: Self = serde_json::from_str(s)?;
        script.validate()?;
        Ok(script)
    }

    /// Reject steps that name no stage.
    pub fn validate(&self) -> DomainResult<()> {
        for (i, step) in self.steps.iter().enumerate() {
            let stage = match step {
                ScriptedStep::Pass { stage, .. }
                | ScriptedStep::Fail { stage, .. }
                | ScriptedStep::Skip { stage, .. } => stage,
                _ => continue,
            };
            if stage.trim().is_empty() {
                return Err(SitepilotError::InvalidScript(format!(
                    "step {} has an empty stage",
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StageExecutor for ScriptedExecutor {
    async fn execute(&mut self, run: &mut DiagnosticRun) -> Result<(), ExecutorError> {
        for step in self.steps.clone() {
            match step {
                ScriptedStep::Pass {
                    stage,
                    message,
                    details,
                } => run.pass_stage(stage.as_str(), message, details).await?,
                ScriptedStep::Fail {
                    stage,
                    message,
                    details,
                } => run.fail_stage(stage.as_str(), message, details).await?,
                ScriptedStep::Skip { stage, message } => {
                    run.skip_stage(stage.as_str(), message).await?
                }
                ScriptedStep::Snapshot {
                    present_keys,
                    base_url,
                } => {
                    run.set_config_snapshot(present_keys.as_slice(), base_url.as_deref())
                        .await?
                }
                ScriptedStep::Error { kind, message } => {
                    return Err(match kind {
                        ScriptedErrorKind::Connection => ExecutorError::Connection(message),
                        ScriptedErrorKind::Authentication => {
                            ExecutorError::Authentication(message)
                        }
                        ScriptedErrorKind::Timeout => ExecutorError::Timeout(message),
                        ScriptedErrorKind::UnexpectedResponse => {
                            ExecutorError::UnexpectedResponse(message)
                        }
                        ScriptedErrorKind::Other => ExecutorError::Other(anyhow::anyhow!(message)),
                    });
                }
            }
        }
        Ok(())
    }
}
