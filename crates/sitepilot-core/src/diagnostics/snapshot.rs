//! Non-secret summary of a service's configuration.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::AuthMode;

/// Maximum number of required output fields kept in a snapshot.
pub const MAX_SNAPSHOT_REQUIRED_FIELDS: usize = 5;

// scheme? userinfo (through the last @ before any path)? then host
static HOST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://)?(?:[^/?#]*@)?(\[[^\]]*\]|[^:/?#@\s]+)")
        .expect("host pattern is valid")
});

/// What the run knew about the integration's config, minus any values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Names of config keys that were set.
    pub present_keys: Vec<String>,
    /// Host component of the base URL, never the full URL.
    pub base_url_host: Option<String>,
    pub auth_mode: AuthMode,
    /// First few required output field names.
    pub required_fields: Vec<String>,
}

impl ConfigSnapshot {
    pub fn new<S: AsRef<str>>(
        present_keys: &[S],
        base_url: Option<&str>,
        auth_mode: AuthMode,
        required_fields: &[String],
    ) -> Self {
        let mut keys: Vec<String> = Vec::with_capacity(present_keys.len());
        for key in present_keys {
            let key = key.as_ref().trim();
            if !key.is_empty() && !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }

        Self {
            present_keys: keys,
            base_url_host: base_url.and_then(extract_host),
            auth_mode,
            required_fields: required_fields
                .iter()
                .take(MAX_SNAPSHOT_REQUIRED_FIELDS)
                .cloned()
                .collect(),
        }
    }
}

/// Extract the lowercase host from a URL-ish string, dropping scheme,
/// credentials, port, path and query.
pub fn extract_host(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    HOST_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
}
