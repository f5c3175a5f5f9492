use sitepilot_state::StorageError;
use thiserror::Error;

/// Errors raised by the diagnostics runner.
///
/// Stage failures are data, not errors; these cover persistence and
/// caller misuse only.
#[derive(Debug, Error)]
pub enum DiagnosticsError {
    #[error("unknown diagnostic stage '{stage}'")]
    UnknownStage { stage: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
