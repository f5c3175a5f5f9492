//! SurrealDB row mapping for diagnostic runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage_traits::{DiagnosticRecord, RunId, RunStatus, StorageResult};

/// Diagnostic run row as stored in the `diagnostic_runs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRunRow {
    /// SurrealDB record ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique run ID
    pub run_id: String,
    pub service_id: String,
    pub service_name: String,
    pub site_id: Option<String>,
    /// Run status: "running" | "pass" | "partial" | "fail"
    pub status: String,
    /// Ordered stage array (JSON)
    pub stages: serde_json::Value,
    /// Non-secret config summary (JSON)
    pub config_snapshot: Option<serde_json::Value>,
    #[serde(with = "surreal_datetime")]
    pub started_at: DateTime<Utc>,
    #[serde(default, with = "surreal_datetime_opt")]
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl DiagnosticRunRow {
    pub fn from_record(record: DiagnosticRecord) -> Self {
        Self {
            id: None,
            run_id: record.run_id.0,
            service_id: record.service_id,
            service_name: record.service_name,
            site_id: record.site_id,
            status: record.status.as_str().to_string(),
            stages: record.stages,
            config_snapshot: record.config_snapshot,
            started_at: record.started_at,
            finished_at: record.finished_at,
            duration_ms: record.duration_ms,
        }
    }

    pub fn into_record(self) -> StorageResult<DiagnosticRecord> {
        Ok(DiagnosticRecord {
            run_id: RunId(self.run_id),
            service_id: self.service_id,
            service_name: self.service_name,
            site_id: self.site_id,
            status: RunStatus::parse(&self.status)?,
            stages: self.stages,
            config_snapshot: self.config_snapshot,
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms: self.duration_ms,
        })
    }
}

/// Serialize chrono DateTime as a SurrealDB datetime.
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Serialize optional chrono DateTime as an optional SurrealDB datetime.
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}
