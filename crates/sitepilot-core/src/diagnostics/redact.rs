//! Key-based secret redaction for structured values.
//!
//! Any object field whose *name* is classified as sensitive has its value
//! replaced by a fixed placeholder, at any nesting depth. The shape of the
//! value is preserved; values under non-sensitive keys are walked
//! recursively but never rewritten.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

/// Placeholder written in place of sensitive values.
pub const REDACTED: &str = "[REDACTED]";

/// Default case-insensitive pattern for sensitive field names.
pub const DEFAULT_SENSITIVE_KEY_PATTERN: &str = r"(?i)(token|secret|passw(or)?d|api[_-]?key|authorization|cookie|credential|private[_-]?key|bearer|session[_-]?id|signature)";

static DEFAULT_SENSITIVE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DEFAULT_SENSITIVE_KEY_PATTERN).expect("default sensitive key pattern is valid")
});

/// Decides whether a field name holds secret material.
pub trait SensitiveKeyPredicate: Send + Sync {
    fn is_sensitive_key(&self, name: &str) -> bool;
}

impl<F> SensitiveKeyPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_sensitive_key(&self, name: &str) -> bool {
        self(name)
    }
}

/// Regex-backed [`SensitiveKeyPredicate`].
#[derive(Debug, Clone)]
pub struct RegexKeyPredicate {
    regex: Regex,
}

impl RegexKeyPredicate {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl Default for RegexKeyPredicate {
    fn default() -> Self {
        Self {
            regex: DEFAULT_SENSITIVE_KEY_RE.clone(),
        }
    }
}

impl SensitiveKeyPredicate for RegexKeyPredicate {
    fn is_sensitive_key(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Either of two predicates.
struct AnyOf(Arc<dyn SensitiveKeyPredicate>, Arc<dyn SensitiveKeyPredicate>);

impl SensitiveKeyPredicate for AnyOf {
    fn is_sensitive_key(&self, name: &str) -> bool {
        self.0.is_sensitive_key(name) || self.1.is_sensitive_key(name)
    }
}

/// Recursive key-based redactor.
#[derive(Clone)]
pub struct SecretRedactor {
    predicate: Arc<dyn SensitiveKeyPredicate>,
    placeholder: String,
}

impl std::fmt::Debug for SecretRedactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRedactor")
            .field("placeholder", &self.placeholder)
            .finish_non_exhaustive()
    }
}

impl Default for SecretRedactor {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretRedactor {
    /// Redactor using [`DEFAULT_SENSITIVE_KEY_PATTERN`] and [`REDACTED`].
    pub fn new() -> Self {
        Self::with_predicate(RegexKeyPredicate::default())
    }

    /// Redactor with a custom key classifier.
    pub fn with_predicate(predicate: impl SensitiveKeyPredicate + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
            placeholder: REDACTED.to_string(),
        }
    }

    /// Keep the current classifier and additionally redact keys matched by
    /// `extra`.
    pub fn also(self, extra: impl SensitiveKeyPredicate + 'static) -> Self {
        Self {
            predicate: Arc::new(AnyOf(self.predicate, Arc::new(extra))),
            placeholder: self.placeholder,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn is_sensitive_key(&self, name: &str) -> bool {
        self.predicate.is_sensitive_key(name)
    }

    /// Return a redacted copy of `value`.
    pub fn redact(&self, value: &Value) -> Value {
        let mut out = value.clone();
        self.redact_in_place(&mut out);
        out
    }

    /// Redact `value` without copying.
    pub fn redact_in_place(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if self.predicate.is_sensitive_key(key) {
                        *child = Value::String(self.placeholder.clone());
                    } else {
                        self.redact_in_place(child);
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.redact_in_place(item);
                }
            }
            _ => {}
        }
    }
}

/// Redact with the default classifier and placeholder.
pub fn redact_secrets(value: &Value) -> Value {
    static DEFAULT: LazyLock<SecretRedactor> = LazyLock::new(SecretRedactor::new);
    DEFAULT.redact(value)
}
