//! Recommendation and plan types.
//!
//! Field names serialize in camelCase to match the JSON produced by the
//! upstream analysis agents.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Priority assumed when a raw recommendation carries none.
pub const DEFAULT_PRIORITY: f64 = 50.0;

/// Seeding threshold for [`Phase::Now`].
pub const NOW_PRIORITY_THRESHOLD: f64 = 70.0;

/// Seeding threshold for [`Phase::Next`].
pub const NEXT_PRIORITY_THRESHOLD: f64 = 40.0;

/// Scheduling tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Now,
    Next,
    Later,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Now, Phase::Next, Phase::Later];

    /// Phase implied by priority alone, before capacity is applied.
    /// Agents score freely, so fractional and negative values are accepted.
    pub fn seed(priority: f64) -> Self {
        if priority >= NOW_PRIORITY_THRESHOLD {
            Phase::Now
        } else if priority >= NEXT_PRIORITY_THRESHOLD {
            Phase::Next
        } else {
            Phase::Later
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Now => "now",
            Phase::Next => "next",
            Phase::Later => "later",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Full,
    Degraded,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Full => "full",
            Confidence::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data inputs a plan's confidence is judged against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum InputSource {
    Ga4,
    Gsc,
    Serp,
    TechnicalSeo,
    Competitive,
}

impl InputSource {
    pub const ALL: [InputSource; 5] = [
        InputSource::Ga4,
        InputSource::Gsc,
        InputSource::Serp,
        InputSource::TechnicalSeo,
        InputSource::Competitive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputSource::Ga4 => "ga4",
            InputSource::Gsc => "gsc",
            InputSource::Serp => "serp",
            InputSource::TechnicalSeo => "technicalSeo",
            InputSource::Competitive => "competitive",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    #[default]
    Open,
    InProgress,
    Done,
    Dismissed,
}

/// Which inputs were available when the raw recommendations were produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailableInputs {
    pub ga4: bool,
    pub gsc: bool,
    pub serp: bool,
    pub technical_seo: bool,
    pub competitive: bool,
}

impl AvailableInputs {
    pub fn all() -> Self {
        Self {
            ga4: true,
            gsc: true,
            serp: true,
            technical_seo: true,
            competitive: true,
        }
    }

    pub fn is_available(&self, source: InputSource) -> bool {
        match source {
            InputSource::Ga4 => self.ga4,
            InputSource::Gsc => self.gsc,
            InputSource::Serp => self.serp,
            InputSource::TechnicalSeo => self.technical_seo,
            InputSource::Competitive => self.competitive,
        }
    }

    pub fn with(mut self, source: InputSource, available: bool) -> Self {
        match source {
            InputSource::Ga4 => self.ga4 = available,
            InputSource::Gsc => self.gsc = available,
            InputSource::Serp => self.serp = available,
            InputSource::TechnicalSeo => self.technical_seo = available,
            InputSource::Competitive => self.competitive = available,
        }
        self
    }

    pub fn available_count(&self) -> usize {
        InputSource::ALL
            .iter()
            .filter(|s| self.is_available(**s))
            .count()
    }

    pub fn missing(&self) -> BTreeSet<InputSource> {
        InputSource::ALL
            .into_iter()
            .filter(|s| !self.is_available(*s))
            .collect()
    }
}

/// Site the plan is for and the inputs behind it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyContext {
    pub site_id: String,
    pub domain: String,
    #[serde(default)]
    pub available_inputs: AvailableInputs,
}

/// Work item as emitted by one analysis agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawRecommendation {
    pub category: String,
    pub agent_source: String,
    pub action: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<Value>,
    #[serde(default)]
    pub priority: Option<f64>,
    #[serde(default)]
    pub definition_of_done: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub kbase_refs: Vec<String>,
}

impl RawRecommendation {
    pub fn new(
        category: impl Into<String>,
        agent_source: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            agent_source: agent_source.into(),
            action: action.into(),
            steps: Vec::new(),
            evidence: Vec::new(),
            priority: None,
            definition_of_done: None,
            dependencies: Vec::new(),
            risks: Vec::new(),
            kbase_refs: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: impl Into<f64>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn effective_priority(&self) -> f64 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// A deduplicated, phased plan entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssembledRecommendation {
    pub id: String,
    pub site_id: String,
    /// Stable key for `category` + normalized `action`.
    pub fingerprint: String,
    pub category: String,
    pub action: String,
    pub steps: Vec<String>,
    pub evidence: Vec<Value>,
    pub priority: f64,
    pub definition_of_done: Option<String>,
    pub dependencies: Vec<String>,
    pub risks: Vec<String>,
    pub kbase_refs: Vec<String>,
    pub agent_sources: BTreeSet<String>,
    pub confidence: Confidence,
    pub missing_inputs: BTreeSet<InputSource>,
    pub phase: Phase,
    pub status: RecommendationStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phase_seed_thresholds() {
        assert_eq!(Phase::seed(100.0), Phase::Now);
        assert_eq!(Phase::seed(70.0), Phase::Now);
        assert_eq!(Phase::seed(69.9), Phase::Next);
        assert_eq!(Phase::seed(40.0), Phase::Next);
        assert_eq!(Phase::seed(39.5), Phase::Later);
        assert_eq!(Phase::seed(-5.0), Phase::Later);
        assert_eq!(Phase::seed(DEFAULT_PRIORITY), Phase::Next);
    }

    #[test]
    fn test_raw_recommendation_parses_camel_case_with_defaults() {
        let raw: RawRecommendation = serde_json::from_value(json!({
            "category": "technical",
            "agentSource": "crawler",
            "action": "Fix broken canonical tags",
            "definitionOfDone": "No duplicate canonicals",
            "kbaseRefs": ["kb-12"]
        }))
        .unwrap();
        assert_eq!(raw.agent_source, "crawler");
        assert_eq!(raw.effective_priority(), DEFAULT_PRIORITY);
        assert_eq!(raw.kbase_refs, vec!["kb-12"]);
        assert!(raw.steps.is_empty());
    }

    #[test]
    fn test_raw_recommendation_accepts_fractional_and_negative_priority() {
        let parsed: Vec<RawRecommendation> = serde_json::from_value(json!([
            {"category": "content", "agentSource": "serp", "action": "Refresh hub page", "priority": 85.5},
            {"category": "content", "agentSource": "serp", "action": "Prune thin tags", "priority": -5}
        ]))
        .unwrap();
        assert_eq!(parsed[0].effective_priority(), 85.5);
        assert_eq!(Phase::seed(parsed[0].effective_priority()), Phase::Now);
        assert_eq!(parsed[1].effective_priority(), -5.0);
        assert_eq!(Phase::seed(parsed[1].effective_priority()), Phase::Later);
    }

    #[test]
    fn test_available_inputs_missing_and_count() {
        let inputs: AvailableInputs =
            serde_json::from_value(json!({"ga4": true, "technicalSeo": true})).unwrap();
        assert_eq!(inputs.available_count(), 2);
        assert_eq!(
            inputs.missing().into_iter().collect::<Vec<_>>(),
            vec![InputSource::Gsc, InputSource::Serp, InputSource::Competitive]
        );
    }

    #[test]
    fn test_input_source_serializes_camel_case() {
        assert_eq!(
            serde_json::to_value(InputSource::TechnicalSeo).unwrap(),
            json!("technicalSeo")
        );
    }
}
