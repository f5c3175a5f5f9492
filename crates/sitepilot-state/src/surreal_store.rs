//! SurrealDB-backed DiagnosticStore implementation
//!
//! Uses `schema::DiagnosticRunRow` for persistence, converting to/from
//! `storage_traits` types at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::config::{resolve_db_url, RemoteAuth};
use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::DiagnosticRunRow;
use crate::storage_traits::{
    DiagnosticPatch, DiagnosticRecord, DiagnosticStore, RunId, RunStatus, StorageResult,
};

const TABLE: &str = "diagnostic_runs";

/// SurrealDB-backed implementation of [`DiagnosticStore`].
#[derive(Clone)]
pub struct SurrealDiagnosticStore {
    db: Surreal<Any>,
}

impl SurrealDiagnosticStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `sitepilot/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect("mem://").await
    }

    /// Connect to an unauthenticated endpoint (`mem://`, `surrealkv://<dir>`,
    /// `ws://...`) and initialize the schema.
    pub async fn connect(url: &str) -> crate::Result<Self> {
        if let Some(path) = url.strip_prefix("surrealkv://") {
            std::fs::create_dir_all(path).map_err(|e| {
                StateError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path, e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns("sitepilot")
            .use_db("main")
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!(url = %url, "SurrealDiagnosticStore connected");
        Ok(Self { db })
    }

    /// Connect to an authenticated remote instance.
    pub async fn connect_remote(config: &RemoteAuth) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        if config.root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!(endpoint = %config.endpoint, "SurrealDiagnosticStore connected (remote)");
        Ok(Self { db })
    }

    /// Connect using the environment.
    ///
    /// Remote credentials (`SITEPILOT_REMOTE_*`) take precedence;
    /// otherwise the URL from [`resolve_db_url`] is used.
    pub async fn from_env(explicit_url: Option<&str>) -> crate::Result<Self> {
        if explicit_url.is_none() {
            if let Some(auth) = RemoteAuth::from_env() {
                return Self::connect_remote(&auth).await;
            }
        }
        let url = resolve_db_url(explicit_url);
        Self::connect(&url).await
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_row(&self, rid: &str) -> StorageResult<Option<DiagnosticRunRow>> {
        let rid_owned = rid.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM diagnostic_runs WHERE run_id = $rid")
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<DiagnosticRunRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn fetch_existing(&self, rid: &str) -> StorageResult<DiagnosticRunRow> {
        self.fetch_row(rid)
            .await?
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: rid.to_string(),
            })
    }
}

#[async_trait]
impl DiagnosticStore for SurrealDiagnosticStore {
    async fn create(&self, record: DiagnosticRecord) -> StorageResult<()> {
        if self.fetch_row(record.run_id.as_str()).await?.is_some() {
            return Err(StorageError::DuplicateRun {
                run_id: record.run_id.0,
            });
        }

        debug!(run_id = %record.run_id, "creating diagnostic run");
        let row = DiagnosticRunRow::from_record(record);

        let _created: Option<DiagnosticRunRow> = self
            .db
            .create(TABLE)
            .content(row)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn update(&self, run_id: &RunId, patch: DiagnosticPatch) -> StorageResult<()> {
        let row = self.fetch_existing(run_id.as_str()).await?;
        let mut record = row.into_record()?;
        if record.status.is_terminal() {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: record.status.to_string(),
                expected: RunStatus::Running.to_string(),
            });
        }

        patch.apply_to(&mut record);
        let updated = DiagnosticRunRow::from_record(record);
        let rid_owned = run_id.0.clone();

        debug!(run_id = %run_id, status = %updated.status, "updating diagnostic run");
        self.db
            .query("UPDATE diagnostic_runs CONTENT $row WHERE run_id = $rid")
            .bind(("row", updated))
            .bind(("rid", rid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, run_id: &RunId) -> StorageResult<DiagnosticRecord> {
        self.fetch_existing(run_id.as_str()).await?.into_record()
    }

    async fn list(&self, service_id: Option<&str>) -> StorageResult<Vec<DiagnosticRecord>> {
        let rows: Vec<DiagnosticRunRow> = if let Some(service) = service_id {
            let sid = service.to_string();
            let mut res = self
                .db
                .query("SELECT * FROM diagnostic_runs WHERE service_id = $sid ORDER BY started_at DESC")
                .bind(("sid", sid))
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            res.take(0)
                .map_err(|e| StorageError::Backend(e.to_string()))?
        } else {
            let mut res = self
                .db
                .query("SELECT * FROM diagnostic_runs ORDER BY started_at DESC")
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            res.take(0)
                .map_err(|e| StorageError::Backend(e.to_string()))?
        };

        rows.into_iter().map(DiagnosticRunRow::into_record).collect()
    }
}
