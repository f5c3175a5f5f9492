//! sitepilot-state: SurrealDB Backend for sitepilot
//!
//! Persistence layer for diagnostic runs. The diagnostics runner only ever
//! writes (`create` once, then `update` per stage report and at finish);
//! read-back exists for tooling.
//!
//! ## Key Components
//!
//! - `DiagnosticStore`: backend-agnostic storage trait
//! - `SurrealDiagnosticStore`: SurrealDB implementation (`mem://`,
//!   `surrealkv://`, or remote)
//! - `fakes`: in-memory stores for tests

pub mod config;
mod error;
pub mod fakes;
pub mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use config::{resolve_db_url, RemoteAuth, DB_URL_ENV, DEFAULT_DB_DIR};
pub use error::{StateError, StorageError};
pub use schema::DiagnosticRunRow;
pub use storage_traits::{
    DiagnosticPatch, DiagnosticRecord, DiagnosticStore, RunId, RunStatus, StorageResult,
};
pub use surreal_store::SurrealDiagnosticStore;

/// Result type for sitepilot-state operations
pub type Result<T> = std::result::Result<T, StateError>;
