//! Connection configuration for the SurrealDB backend.

/// Environment variable holding a SurrealDB connection URL.
pub const DB_URL_ENV: &str = "SITEPILOT_DB_URL";

/// Default local database directory when nothing else is configured.
pub const DEFAULT_DB_DIR: &str = ".sitepilot/db";

/// Credentials for an authenticated remote SurrealDB instance.
///
/// Only built from `SITEPILOT_REMOTE_*` variables; see [`RemoteAuth::from_env`].
#[derive(Clone)]
pub struct RemoteAuth {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    /// Sign in at root level instead of against `namespace`/`database`.
    pub root: bool,
}

impl std::fmt::Debug for RemoteAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAuth")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl RemoteAuth {
    /// Endpoint, user and password must all be present and non-blank.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let var = |suffix: &str| {
            get(&format!("SITEPILOT_REMOTE_{suffix}")).filter(|v| !v.trim().is_empty())
        };
        Some(Self {
            endpoint: var("ENDPOINT")?,
            username: var("USER")?,
            password: var("PASSWORD")?,
            namespace: var("NS").unwrap_or_else(|| "sitepilot".into()),
            database: var("DB").unwrap_or_else(|| "main".into()),
            root: var("ROOT").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }
}

/// Pick the connection URL for an unauthenticated connection.
///
/// An explicit URL wins; otherwise `SITEPILOT_DB_URL`; otherwise a local
/// SurrealKV directory under [`DEFAULT_DB_DIR`].
pub fn resolve_db_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit.filter(|u| !u.trim().is_empty()) {
        return url.to_string();
    }
    if let Ok(url) = std::env::var(DB_URL_ENV) {
        if !url.trim().is_empty() {
            return url;
        }
    }
    format!("surrealkv://{DEFAULT_DB_DIR}")
}
