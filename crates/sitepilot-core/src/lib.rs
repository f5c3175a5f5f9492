//! Sitepilot core library.
//!
//! Service-integration diagnostics (stage catalog, run handle, secret
//! redaction, export) and recommendation plan assembly.

pub mod diagnostics;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod recommendations;
pub mod telemetry;

pub use diagnostics::{
    extract_host, format_for_copy, format_for_copy_with, redact_secrets, BuiltinStage,
    ConfigSnapshot, DiagnosticOutcome, DiagnosticRun, DiagnosticsError, DiagnosticsRunner,
    ExecutorError, RegexKeyPredicate, RunnerOptions, ScriptedErrorKind, ScriptedExecutor,
    ScriptedStep, SecretRedactor, SensitiveKeyPredicate, StageCatalog, StageDefinition,
    StageExecutor, REDACTED,
};

pub use domain::{
    AuthMode, ExpectedResponseType, OverallStatus, Result, ServiceDiagnosticConfig,
    SitepilotError, StageResult, StageResultsExt, StageStatus,
};

pub use recommendations::{
    assemble_recommendations, assemble_with_options, fingerprint, merge_agent_sources,
    AssembledRecommendation, AssemblyContext, AssemblyOptions, AvailableInputs, BucketPolicy,
    Confidence, InputSource, Phase, PlanSummary, RawRecommendation, RecommendationStatus,
};

pub use sitepilot_state::{
    DiagnosticPatch, DiagnosticRecord, DiagnosticStore, RunId, RunStatus, StorageError,
};

pub use metrics::METRICS;
pub use obs::{
    emit_executor_failed, emit_plan_assembled, emit_run_finished, emit_run_started,
    emit_stage_reported, emit_unknown_stage, run_span,
};
pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
