//! Diagnostic run lifecycle.
//!
//! [`DiagnosticsRunner`] is a cheap, cloneable factory holding the store,
//! catalog and redactor. Each [`DiagnosticsRunner::start`] returns an
//! independent [`DiagnosticRun`] handle that owns the run's mutable state;
//! [`DiagnosticRun::finish`] consumes the handle, so a finished run cannot
//! be reported to again.
//!
//! Every mutation is persisted before the call returns. Storage errors are
//! never swallowed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sitepilot_state::{DiagnosticPatch, DiagnosticRecord, DiagnosticStore, RunId, RunStatus};
use tracing::Instrument;

use super::catalog::StageCatalog;
use super::error::DiagnosticsError;
use super::executor::{ExecutorError, StageExecutor};
use super::redact::SecretRedactor;
use super::snapshot::ConfigSnapshot;
use crate::domain::{OverallStatus, ServiceDiagnosticConfig, StageResult, StageStatus};
use crate::metrics::METRICS;
use crate::obs;

pub type Result<T> = std::result::Result<T, DiagnosticsError>;

/// Runner behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Reject reports for stages outside the catalog instead of ignoring them.
    pub strict: bool,
}

/// Result of [`DiagnosticsRunner::run_diagnostics_for_service`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticOutcome {
    pub run_id: RunId,
    pub stages: Vec<StageResult>,
    pub status: OverallStatus,
}

/// Factory for diagnostic runs.
#[derive(Clone)]
pub struct DiagnosticsRunner {
    store: Arc<dyn DiagnosticStore>,
    catalog: Arc<StageCatalog>,
    redactor: Arc<SecretRedactor>,
    options: RunnerOptions,
}

impl DiagnosticsRunner {
    pub fn new(store: Arc<dyn DiagnosticStore>) -> Self {
        Self {
            store,
            catalog: Arc::new(StageCatalog::standard()),
            redactor: Arc::new(SecretRedactor::new()),
            options: RunnerOptions::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: StageCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_redactor(mut self, redactor: SecretRedactor) -> Self {
        self.redactor = Arc::new(redactor);
        self
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Begin a run: every catalog stage pending, initial record persisted.
    pub async fn start(&self, config: ServiceDiagnosticConfig) -> Result<DiagnosticRun> {
        let run_id = RunId::generate();
        let started_at = Utc::now();
        let stages: Vec<StageResult> = self.catalog.ids().map(StageResult::pending).collect();

        let record = DiagnosticRecord {
            run_id: run_id.clone(),
            service_id: config.service_id.clone(),
            service_name: config.service_name.clone(),
            site_id: config.site_id.clone(),
            status: RunStatus::Running,
            stages: serde_json::to_value(&stages)?,
            config_snapshot: None,
            started_at,
            finished_at: None,
            duration_ms: None,
        };
        self.store.create(record).await?;

        obs::emit_run_started(run_id.as_str(), &config.service_id, stages.len());
        METRICS.inc_runs_started();

        Ok(DiagnosticRun {
            run_id,
            config,
            stages,
            current_stage_index: 0,
            started_at,
            config_snapshot: None,
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            redactor: Arc::clone(&self.redactor),
            options: self.options,
        })
    }

    /// Start a run, hand it to `executor`, and always finish it.
    ///
    /// If the executor fails with anything other than a runner error, the
    /// first still-pending stage is marked failed with the error's kind and
    /// message. Runner errors (storage, strict unknown stage) propagate.
    pub async fn run_diagnostics_for_service(
        &self,
        config: ServiceDiagnosticConfig,
        executor: &mut dyn StageExecutor,
    ) -> Result<DiagnosticOutcome> {
        let mut run = self.start(config).await?;
        let span = obs::run_span(run.run_id().as_str());

        async move {
            match executor.execute(&mut run).await {
                Ok(()) => {}
                Err(ExecutorError::Diagnostics(err)) => return Err(err),
                Err(err) => {
                    let pending = run.first_pending_stage().map(str::to_string);
                    obs::emit_executor_failed(
                        run.run_id().as_str(),
                        pending.as_deref(),
                        err.kind(),
                        &err,
                    );
                    if let Some(stage) = pending {
                        let details = serde_json::json!({
                            "error_type": err.kind(),
                            "message": err.to_string(),
                        });
                        run.fail_stage(stage.as_str(), err.to_string(), Some(details))
                            .await?;
                    }
                }
            }

            let status = run.compute_overall_status();
            let run_id = run.run_id().clone();
            let stages = run.finish(status).await?;
            Ok::<_, DiagnosticsError>(DiagnosticOutcome {
                run_id,
                stages,
                status,
            })
        }
        .instrument(span)
        .await
    }
}

/// One in-flight diagnostic run.
pub struct DiagnosticRun {
    run_id: RunId,
    config: ServiceDiagnosticConfig,
    stages: Vec<StageResult>,
    current_stage_index: usize,
    started_at: DateTime<Utc>,
    config_snapshot: Option<ConfigSnapshot>,
    store: Arc<dyn DiagnosticStore>,
    catalog: Arc<StageCatalog>,
    redactor: Arc<SecretRedactor>,
    options: RunnerOptions,
}

impl std::fmt::Debug for DiagnosticRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticRun")
            .field("run_id", &self.run_id)
            .field("service_id", &self.config.service_id)
            .field("stages", &self.stages)
            .field("current_stage_index", &self.current_stage_index)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl DiagnosticRun {
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn config(&self) -> &ServiceDiagnosticConfig {
        &self.config
    }

    /// Stages in catalog order.
    pub fn stages(&self) -> &[StageResult] {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&StageResult> {
        self.catalog.index_of(id).and_then(|i| self.stages.get(i))
    }

    /// Index just past the most recently reported stage.
    pub fn current_stage_index(&self) -> usize {
        self.current_stage_index
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn config_snapshot(&self) -> Option<&ConfigSnapshot> {
        self.config_snapshot.as_ref()
    }

    /// First stage, in catalog order, that has not been reported.
    pub fn first_pending_stage(&self) -> Option<&str> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Pending)
            .map(|s| s.stage.as_str())
    }

    pub async fn pass_stage(
        &mut self,
        stage: impl AsRef<str>,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Result<()> {
        self.report(stage.as_ref(), StageStatus::Pass, message.into(), details)
            .await
    }

    pub async fn fail_stage(
        &mut self,
        stage: impl AsRef<str>,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Result<()> {
        self.report(stage.as_ref(), StageStatus::Fail, message.into(), details)
            .await
    }

    pub async fn skip_stage(
        &mut self,
        stage: impl AsRef<str>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.report(stage.as_ref(), StageStatus::Skipped, message.into(), None)
            .await
    }

    async fn report(
        &mut self,
        stage: &str,
        status: StageStatus,
        message: String,
        details: Option<Value>,
    ) -> Result<()> {
        let Some(index) = self.catalog.index_of(stage) else {
            obs::emit_unknown_stage(self.run_id.as_str(), stage);
            METRICS.inc_unknown_stages();
            if self.options.strict {
                return Err(DiagnosticsError::UnknownStage {
                    stage: stage.to_string(),
                });
            }
            return Ok(());
        };

        let now = Utc::now();
        // duration approximates stage time: measured from the nearest earlier
        // finished stage, or the run start
        let anchor = self.stages[..index]
            .iter()
            .rev()
            .find_map(|s| s.finished_at)
            .unwrap_or(self.started_at);
        let duration_ms = (now - anchor).num_milliseconds().max(0) as u64;

        let entry = &mut self.stages[index];
        entry.status = status;
        entry.message = message;
        entry.started_at = Some(anchor);
        entry.finished_at = Some(now);
        entry.duration_ms = Some(duration_ms);
        entry.details = details.map(|d| self.redactor.redact(&d));
        self.current_stage_index = index + 1;

        self.store
            .update(
                &self.run_id,
                DiagnosticPatch::stages(serde_json::to_value(&self.stages)?),
            )
            .await?;

        obs::emit_stage_reported(self.run_id.as_str(), stage, status.as_str(), duration_ms);
        METRICS.inc_stages_reported();
        Ok(())
    }

    /// Record which config keys are present, the base URL host and auth
    /// mode, plus up to five required output fields.
    pub async fn set_config_snapshot<S>(
        &mut self,
        present_keys: &[S],
        base_url: Option<&str>,
    ) -> Result<()>
    where
        S: AsRef<str> + Sync,
    {
        let snapshot = ConfigSnapshot::new(
            present_keys,
            base_url,
            self.config.auth_mode,
            &self.config.required_output_fields,
        );
        let value = self.redactor.redact(&serde_json::to_value(&snapshot)?);
        self.store
            .update(&self.run_id, DiagnosticPatch::config_snapshot(value))
            .await?;
        self.config_snapshot = Some(snapshot);
        Ok(())
    }

    pub fn compute_overall_status(&self) -> OverallStatus {
        OverallStatus::from_stages(&self.stages)
    }

    /// Seal the run with `status` and return its stages.
    pub async fn finish(self, status: OverallStatus) -> Result<Vec<StageResult>> {
        let finished_at = Utc::now();
        let duration_ms = (finished_at - self.started_at).num_milliseconds().max(0) as u64;

        let patch = DiagnosticPatch {
            stages: Some(serde_json::to_value(&self.stages)?),
            status: Some(status.into()),
            finished_at: Some(finished_at),
            duration_ms: Some(duration_ms),
            ..DiagnosticPatch::default()
        };
        self.store.update(&self.run_id, patch).await?;

        obs::emit_run_finished(self.run_id.as_str(), status.as_str(), duration_ms);
        METRICS.inc_runs_finished();
        Ok(self.stages)
    }
}
