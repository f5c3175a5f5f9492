//! Service-integration diagnostics.
//!
//! A run walks the [`StageCatalog`] in order. An external
//! [`StageExecutor`] reports each stage's outcome through the
//! [`DiagnosticRun`] handle; every report is redacted and persisted
//! through a [`sitepilot_state::DiagnosticStore`].

pub mod catalog;
pub mod error;
pub mod executor;
pub mod export;
pub mod redact;
pub mod runner;
pub mod snapshot;

pub use catalog::{BuiltinStage, StageCatalog, StageDefinition};
pub use error::DiagnosticsError;
pub use executor::{ExecutorError, ScriptedErrorKind, ScriptedExecutor, ScriptedStep, StageExecutor};
pub use export::{format_for_copy, format_for_copy_with};
pub use redact::{
    redact_secrets, RegexKeyPredicate, SecretRedactor, SensitiveKeyPredicate,
    DEFAULT_SENSITIVE_KEY_PATTERN, REDACTED,
};
pub use runner::{DiagnosticOutcome, DiagnosticRun, DiagnosticsRunner, RunnerOptions};
pub use snapshot::{extract_host, ConfigSnapshot, MAX_SNAPSHOT_REQUIRED_FIELDS};
