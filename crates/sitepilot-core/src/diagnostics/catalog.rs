//! Ordered catalog of diagnostic stages.

use serde::{Deserialize, Serialize};

/// Builtin diagnostic stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// Endpoint reachable
    Connectivity,

    /// Credentials accepted
    Authentication,

    /// Service-side settings match what the integration expects
    ConfigValidation,

    /// A representative payload can be fetched
    DataFetch,

    /// Payload maps onto the required output fields
    OutputNormalization,
}

impl BuiltinStage {
    pub const ALL: [BuiltinStage; 5] = [
        BuiltinStage::Connectivity,
        BuiltinStage::Authentication,
        BuiltinStage::ConfigValidation,
        BuiltinStage::DataFetch,
        BuiltinStage::OutputNormalization,
    ];

    /// Get the stage identifier.
    pub fn id(&self) -> &'static str {
        match self {
            BuiltinStage::Connectivity => "connectivity",
            BuiltinStage::Authentication => "authentication",
            BuiltinStage::ConfigValidation => "config_validation",
            BuiltinStage::DataFetch => "data_fetch",
            BuiltinStage::OutputNormalization => "output_normalization",
        }
    }

    /// Get the human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            BuiltinStage::Connectivity => "Connectivity check",
            BuiltinStage::Authentication => "Authentication check",
            BuiltinStage::ConfigValidation => "Configuration validation",
            BuiltinStage::DataFetch => "Data fetch",
            BuiltinStage::OutputNormalization => "Output normalization",
        }
    }
}

impl AsRef<str> for BuiltinStage {
    fn as_ref(&self) -> &str {
        self.id()
    }
}

/// One entry in a [`StageCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub id: String,
    pub label: String,
}

/// Fixed, ordered list of stages shared by every run of a runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCatalog {
    stages: Vec<StageDefinition>,
}

impl StageCatalog {
    /// The builtin five-stage catalog.
    pub fn standard() -> Self {
        Self {
            stages: BuiltinStage::ALL
                .iter()
                .map(|s| StageDefinition {
                    id: s.id().to_string(),
                    label: s.label().to_string(),
                })
                .collect(),
        }
    }

    /// Append a custom stage after the existing ones.
    ///
    /// Ids already in the catalog are ignored so ordering stays stable.
    pub fn with_custom(mut self, id: impl Into<String>, label: impl Into<String>) -> Self {
        let id = id.into();
        if self.contains(&id) {
            tracing::warn!(stage = %id, "stage already in catalog; ignoring");
            return self;
        }
        self.stages.push(StageDefinition {
            id,
            label: label.into(),
        });
        self
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&StageDefinition> {
        self.stages.get(index)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
