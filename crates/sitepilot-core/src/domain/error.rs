//! Domain-level error taxonomy for sitepilot.

use crate::diagnostics::DiagnosticsError;
use sitepilot_state::StorageError;

/// sitepilot domain errors.
#[derive(Debug, thiserror::Error)]
pub enum SitepilotError {
    #[error("invalid service config: {0}")]
    InvalidConfig(String),

    #[error("invalid executor script: {0}")]
    InvalidScript(String),

    #[error("diagnostics error: {0}")]
    Diagnostics(#[from] DiagnosticsError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for sitepilot domain operations.
pub type Result<T> = std::result::Result<T, SitepilotError>;
