//! SurrealDB schema migrations and initialization
//!
//! Sets up the `diagnostic_runs` table with its indexes.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all sitepilot tables in SurrealDB.
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing sitepilot SurrealDB schema");
    init_diagnostic_runs_table(db).await?;
    info!("sitepilot schema initialization complete");
    Ok(())
}

/// Initialize `diagnostic_runs` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE diagnostic_runs {
///   run_id:          STRING (unique)
///   service_id:      STRING (indexed)
///   service_name:    STRING
///   site_id:         STRING? (indexed)
///   status:          STRING (enum: running | pass | partial | fail)
///   stages:          ARRAY<OBJECT> (catalog order)
///   config_snapshot: OBJECT?
///   started_at:      DATETIME (indexed)
///   finished_at:     DATETIME?
///   duration_ms:     INT?
/// }
/// ```
///
/// Status transitions (running → terminal) are enforced by the store, not
/// the schema. Rows are never deleted.
async fn init_diagnostic_runs_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing diagnostic_runs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS diagnostic_runs AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_diag_run_id ON TABLE diagnostic_runs COLUMNS run_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_diag_service_id ON TABLE diagnostic_runs COLUMNS service_id;
        DEFINE INDEX IF NOT EXISTS idx_diag_site_id ON TABLE diagnostic_runs COLUMNS site_id;
        DEFINE INDEX IF NOT EXISTS idx_diag_started_at ON TABLE diagnostic_runs COLUMNS started_at;
    "#;

    db.query(sql).await?.check()?;
    info!("diagnostic_runs table initialized");
    Ok(())
}
