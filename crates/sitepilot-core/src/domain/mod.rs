//! Domain models for sitepilot.
//!
//! Canonical definitions for the core entities:
//! - `ServiceDiagnosticConfig`: the integration being diagnosed
//! - `StageResult` / `OverallStatus`: per-stage and aggregate outcomes

pub mod error;
pub mod service;
pub mod stage;

// Re-export main types and errors
pub use error::{Result, SitepilotError};
pub use service::{AuthMode, ExpectedResponseType, ServiceDiagnosticConfig};
pub use stage::{OverallStatus, StageResult, StageResultsExt, StageStatus};
