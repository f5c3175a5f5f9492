//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryDiagnosticStore`, which satisfies the `DiagnosticStore`
//! contract without external dependencies, and `FailingDiagnosticStore`,
//! which rejects writes after a configurable number of calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryDiagnosticStore
// ---------------------------------------------------------------------------

/// In-memory diagnostic store backed by a `HashMap<run_id, record>`.
#[derive(Debug, Default)]
pub struct MemoryDiagnosticStore {
    runs: Mutex<HashMap<String, DiagnosticRecord>>,
    writes: AtomicUsize,
}

impl MemoryDiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `create` + `update` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosticStore for MemoryDiagnosticStore {
    async fn create(&self, record: DiagnosticRecord) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        if runs.contains_key(record.run_id.as_str()) {
            return Err(StorageError::DuplicateRun {
                run_id: record.run_id.0.clone(),
            });
        }
        runs.insert(record.run_id.0.clone(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, run_id: &RunId, patch: DiagnosticPatch) -> StorageResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let record = runs
            .get_mut(run_id.as_str())
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        if record.status.is_terminal() {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: record.status.to_string(),
                expected: RunStatus::Running.to_string(),
            });
        }
        patch.apply_to(record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, run_id: &RunId) -> StorageResult<DiagnosticRecord> {
        let runs = self.runs.lock().unwrap();
        runs.get(run_id.as_str())
            .cloned()
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })
    }

    async fn list(&self, service_id: Option<&str>) -> StorageResult<Vec<DiagnosticRecord>> {
        let runs = self.runs.lock().unwrap();
        let mut records: Vec<DiagnosticRecord> = runs
            .values()
            .filter(|r| service_id.map_or(true, |s| r.service_id == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// FailingDiagnosticStore
// ---------------------------------------------------------------------------

/// Store that delegates to a [`MemoryDiagnosticStore`] for the first
/// `allowed_writes` writes and returns `StorageError::Backend` afterwards.
#[derive(Debug)]
pub struct FailingDiagnosticStore {
    inner: MemoryDiagnosticStore,
    allowed_writes: usize,
    attempts: AtomicUsize,
}

impl FailingDiagnosticStore {
    pub fn new(allowed_writes: usize) -> Self {
        Self {
            inner: MemoryDiagnosticStore::new(),
            allowed_writes,
            attempts: AtomicUsize::new(0),
        }
    }

    fn check(&self) -> StorageResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.allowed_writes {
            return Err(StorageError::Backend(format!(
                "write {} rejected (limit {})",
                attempt + 1,
                self.allowed_writes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DiagnosticStore for FailingDiagnosticStore {
    async fn create(&self, record: DiagnosticRecord) -> StorageResult<()> {
        self.check()?;
        self.inner.create(record).await
    }

    async fn update(&self, run_id: &RunId, patch: DiagnosticPatch) -> StorageResult<()> {
        self.check()?;
        self.inner.update(run_id, patch).await
    }

    async fn get(&self, run_id: &RunId) -> StorageResult<DiagnosticRecord> {
        self.inner.get(run_id).await
    }

    async fn list(&self, service_id: Option<&str>) -> StorageResult<Vec<DiagnosticRecord>> {
        self.inner.list(service_id).await
    }
}
