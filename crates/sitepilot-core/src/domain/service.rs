//! Service integration config consumed by the diagnostics runner.

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, SitepilotError};

/// How the integration authenticates against the external service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[serde(rename = "oauth")]
    OAuth,
    ApiKey,
    #[default]
    None,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::OAuth => "oauth",
            AuthMode::ApiKey => "api_key",
            AuthMode::None => "none",
        }
    }
}

/// Body format the integration expects back from the service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedResponseType {
    #[default]
    Json,
    Html,
    Text,
}

/// Description of one external service integration to diagnose.
///
/// Contains identifiers and shape expectations only; credentials stay with
/// the stage executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceDiagnosticConfig {
    pub service_id: String,
    pub service_name: String,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default)]
    pub expected_response_type: ExpectedResponseType,
    #[serde(default)]
    pub required_output_fields: Vec<String>,
}

impl ServiceDiagnosticConfig {
    pub fn new(service_id: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            service_name: service_name.into(),
            site_id: None,
            auth_mode: AuthMode::None,
            expected_response_type: ExpectedResponseType::Json,
            required_output_fields: Vec::new(),
        }
    }

    pub fn with_site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    pub fn with_response_type(mut self, response_type: ExpectedResponseType) -> Self {
        self.expected_response_type = response_type;
        self
    }

    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_output_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Reject configs that cannot identify the service.
    pub fn validate(&self) -> Result<()> {
        if self.service_id.trim().is_empty() {
            return Err(SitepilotError::InvalidConfig(
                "service_id must not be empty".to_string(),
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err(SitepilotError::InvalidConfig(
                "service_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
