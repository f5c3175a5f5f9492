//! Turning raw agent output into a phased plan.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::model::{
    AssembledRecommendation, AssemblyContext, Confidence, Phase, RawRecommendation,
    RecommendationStatus,
};
use crate::metrics::METRICS;
use crate::obs;

/// How sorted items are distributed over phases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BucketPolicy {
    /// Each item takes the first phase with room, in `now, next, later`
    /// order, regardless of its seeded phase.
    #[default]
    Greedy,
    /// Each item starts at its seeded phase and only overflows downward:
    /// full `now` spills to `next`, full `next` spills to `later`.
    SeededCascade,
}

/// Tunables for [`assemble_with_options`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssemblyOptions {
    pub now_capacity: usize,
    pub next_capacity: usize,
    /// Inputs that must be available for [`Confidence::Full`].
    pub min_inputs_for_full: usize,
    pub bucket_policy: BucketPolicy,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            now_capacity: 3,
            next_capacity: 5,
            min_inputs_for_full: 3,
            bucket_policy: BucketPolicy::Greedy,
        }
    }
}

/// Stable hex key for a recommendation's category and action.
///
/// Action text is compared case-insensitively with runs of whitespace
/// collapsed and ends trimmed. The category is length-prefixed so no
/// split of the same bytes between the two fields can collide.
pub fn fingerprint(category: &str, action: &str) -> String {
    let normalized = action
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let category = category.trim();
    let mut hasher = Sha256::new();
    hasher.update((category.len() as u64).to_be_bytes());
    hasher.update(category.as_bytes());
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Assemble with [`AssemblyOptions::default`].
pub fn assemble_recommendations(
    context: &AssemblyContext,
    raw: Vec<RawRecommendation>,
) -> Vec<AssembledRecommendation> {
    assemble_with_options(context, raw, &AssemblyOptions::default())
}

/// Deduplicate, sort by priority and bucket `raw` into phases.
///
/// The first item per fingerprint wins; later duplicates are dropped
/// without merging their sources. Output is sorted by priority
/// descending, ties keeping input order.
pub fn assemble_with_options(
    context: &AssemblyContext,
    raw: Vec<RawRecommendation>,
    options: &AssemblyOptions,
) -> Vec<AssembledRecommendation> {
    let total_raw = raw.len();
    let mut seen = HashSet::with_capacity(total_raw);
    let mut kept: Vec<(String, RawRecommendation)> = Vec::with_capacity(total_raw);
    for item in raw {
        let fp = fingerprint(&item.category, &item.action);
        if seen.insert(fp.clone()) {
            kept.push((fp, item));
        } else {
            obs::emit_duplicate_dropped(&fp, &item.agent_source);
        }
    }
    let duplicates = total_raw - kept.len();

    // stable: equal priorities keep input order
    kept.sort_by(|a, b| b.1.effective_priority().total_cmp(&a.1.effective_priority()));

    let confidence = if context.available_inputs.available_count() >= options.min_inputs_for_full
    {
        Confidence::Full
    } else {
        Confidence::Degraded
    };
    let missing_inputs = context.available_inputs.missing();
    let created_at = Utc::now();

    let mut buckets = BucketFill::new(options);
    let plan: Vec<AssembledRecommendation> = kept
        .into_iter()
        .map(|(fingerprint, item)| {
            let priority = item.effective_priority();
            let phase = buckets.place(Phase::seed(priority));
            AssembledRecommendation {
                id: Uuid::new_v4().to_string(),
                site_id: context.site_id.clone(),
                fingerprint,
                category: item.category,
                action: item.action,
                steps: item.steps,
                evidence: item.evidence,
                priority,
                definition_of_done: item.definition_of_done,
                dependencies: item.dependencies,
                risks: item.risks,
                kbase_refs: item.kbase_refs,
                agent_sources: BTreeSet::from([item.agent_source]),
                confidence,
                missing_inputs: missing_inputs.clone(),
                phase,
                status: RecommendationStatus::Open,
                created_at,
            }
        })
        .collect();

    obs::emit_plan_assembled(&context.site_id, plan.len(), duplicates, confidence.as_str());
    METRICS.add_assembled(plan.len(), duplicates);
    plan
}

struct BucketFill {
    policy: BucketPolicy,
    now_capacity: usize,
    next_capacity: usize,
    now: usize,
    next: usize,
}

impl BucketFill {
    fn new(options: &AssemblyOptions) -> Self {
        Self {
            policy: options.bucket_policy,
            now_capacity: options.now_capacity,
            next_capacity: options.next_capacity,
            now: 0,
            next: 0,
        }
    }

    fn place(&mut self, seeded: Phase) -> Phase {
        let start = match self.policy {
            BucketPolicy::Greedy => Phase::Now,
            BucketPolicy::SeededCascade => seeded,
        };
        if start == Phase::Now && self.now < self.now_capacity {
            self.now += 1;
            return Phase::Now;
        }
        if start != Phase::Later && self.next < self.next_capacity {
            self.next += 1;
            return Phase::Next;
        }
        Phase::Later
    }
}

/// Copy of `existing` with `agent_source` added to its sources.
pub fn merge_agent_sources(
    existing: &AssembledRecommendation,
    agent_source: &str,
) -> AssembledRecommendation {
    let mut merged = existing.clone();
    merged.agent_sources.insert(agent_source.to_string());
    merged
}

/// Per-phase counts for a plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub total: usize,
    pub now: usize,
    pub next: usize,
    pub later: usize,
    /// `None` for an empty plan.
    pub confidence: Option<Confidence>,
}

impl PlanSummary {
    pub fn of(plan: &[AssembledRecommendation]) -> Self {
        let mut summary = Self {
            total: plan.len(),
            confidence: plan.first().map(|r| r.confidence),
            ..Self::default()
        };
        for item in plan {
            match item.phase {
                Phase::Now => summary.now += 1,
                Phase::Next => summary.next += 1,
                Phase::Later => summary.later += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::model::{AvailableInputs, InputSource};

    fn context(inputs: AvailableInputs) -> AssemblyContext {
        AssemblyContext {
            site_id: "site-1".to_string(),
            domain: "example.com".to_string(),
            available_inputs: inputs,
        }
    }

    fn raw(action: &str, priority: u32) -> RawRecommendation {
        RawRecommendation::new("content", "agent-a", action).with_priority(priority)
    }

    fn phases(plan: &[AssembledRecommendation]) -> Vec<Phase> {
        plan.iter().map(|r| r.phase).collect()
    }

    #[test]
    fn test_fingerprint_normalizes_action() {
        assert_eq!(
            fingerprint("content", "Add  FAQ schema "),
            fingerprint("content", "add faq schema")
        );
        assert_ne!(
            fingerprint("content", "add faq schema"),
            fingerprint("technical", "add faq schema")
        );
        assert_eq!(fingerprint("c", "a").len(), 64);
    }

    #[test]
    fn test_fingerprint_field_boundary_is_unambiguous() {
        assert_ne!(fingerprint("a:b", "c"), fingerprint("a", "b:c"));
        assert_ne!(fingerprint("ab", "c"), fingerprint("a", "bc"));
    }

    #[test]
    fn test_top_three_now_fourth_next() {
        let plan = assemble_recommendations(
            &context(AvailableInputs::all()),
            vec![raw("a", 90), raw("b", 85), raw("c", 80), raw("d", 75)],
        );
        assert_eq!(
            phases(&plan),
            vec![Phase::Now, Phase::Now, Phase::Now, Phase::Next]
        );
        assert_eq!(plan[3].action, "d");
    }

    #[test]
    fn test_output_sorted_descending_and_stable() {
        let plan = assemble_recommendations(
            &context(AvailableInputs::all()),
            vec![raw("low", 10), raw("tie-1", 60), raw("high", 95), raw("tie-2", 60)],
        );
        let actions: Vec<&str> = plan.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(actions, vec!["high", "tie-1", "tie-2", "low"]);
    }

    #[test]
    fn test_greedy_promotes_low_priority_into_free_slots() {
        let plan = assemble_recommendations(
            &context(AvailableInputs::all()),
            vec![raw("a", 20), raw("b", 10)],
        );
        assert_eq!(phases(&plan), vec![Phase::Now, Phase::Now]);
    }

    #[test]
    fn test_seeded_cascade_keeps_seeded_phase() {
        let options = AssemblyOptions {
            bucket_policy: BucketPolicy::SeededCascade,
            ..AssemblyOptions::default()
        };
        let plan = assemble_with_options(
            &context(AvailableInputs::all()),
            vec![raw("a", 90), raw("b", 50), raw("c", 20)],
            &options,
        );
        assert_eq!(phases(&plan), vec![Phase::Now, Phase::Next, Phase::Later]);
    }

    fn seeded_cascade() -> AssemblyOptions {
        AssemblyOptions {
            bucket_policy: BucketPolicy::SeededCascade,
            ..AssemblyOptions::default()
        }
    }

    #[test]
    fn test_seeded_cascade_full_now_spills_to_next() {
        let plan = assemble_with_options(
            &context(AvailableInputs::all()),
            vec![raw("a", 90), raw("b", 85), raw("c", 80), raw("d", 75)],
            &seeded_cascade(),
        );
        assert_eq!(
            phases(&plan),
            vec![Phase::Now, Phase::Now, Phase::Now, Phase::Next]
        );
        assert_eq!(plan[3].action, "d");
    }

    #[test]
    fn test_seeded_cascade_nine_urgent_items_fill_every_phase() {
        let items: Vec<_> = (0..9).map(|i| raw(&format!("urgent {i}"), 98 - i)).collect();
        let plan = assemble_with_options(&context(AvailableInputs::all()), items, &seeded_cascade());
        let summary = PlanSummary::of(&plan);
        assert_eq!((summary.now, summary.next, summary.later), (3, 5, 1));
        assert_eq!(plan[8].action, "urgent 8");
        assert_eq!(plan[8].phase, Phase::Later);
    }

    #[test]
    fn test_seeded_cascade_next_item_after_next_is_full_goes_later() {
        let mut items: Vec<_> = (0..8).map(|i| raw(&format!("urgent {i}"), 95 - i)).collect();
        items.push(raw("medium", 55));
        let plan = assemble_with_options(&context(AvailableInputs::all()), items, &seeded_cascade());
        let medium = plan.iter().find(|r| r.action == "medium").unwrap();
        assert_eq!(Phase::seed(medium.priority), Phase::Next);
        assert_eq!(medium.phase, Phase::Later);
        assert_eq!(PlanSummary::of(&plan).next, 5);
    }

    #[test]
    fn test_fractional_priorities_sort_between_integers() {
        let plan = assemble_recommendations(
            &context(AvailableInputs::all()),
            vec![
                raw("low", 10),
                RawRecommendation::new("content", "agent-a", "negative").with_priority(-5.0),
                RawRecommendation::new("content", "agent-a", "fractional").with_priority(85.5),
                raw("high", 86),
            ],
        );
        let order: Vec<_> = plan.iter().map(|r| r.action.as_str()).collect();
        assert_eq!(order, vec!["high", "fractional", "low", "negative"]);
        assert_eq!(plan[1].priority, 85.5);
    }

    #[test]
    fn test_capacity_overflow_reaches_later() {
        let items: Vec<_> = (0..10).map(|i| raw(&format!("item {i}"), 90 - i)).collect();
        let plan = assemble_recommendations(&context(AvailableInputs::all()), items);
        let summary = PlanSummary::of(&plan);
        assert_eq!(summary.now, 3);
        assert_eq!(summary.next, 5);
        assert_eq!(summary.later, 2);
        assert_eq!(summary.total, 10);
    }

    #[test]
    fn test_missing_priority_defaults_to_fifty() {
        let plan = assemble_recommendations(
            &context(AvailableInputs::all()),
            vec![RawRecommendation::new("content", "agent-a", "no priority"), raw("x", 51)],
        );
        assert_eq!(plan[1].priority, 50.0);
        assert_eq!(plan[1].action, "no priority");
    }

    #[test]
    fn test_three_of_five_inputs_is_full() {
        let inputs = AvailableInputs::default()
            .with(InputSource::Ga4, true)
            .with(InputSource::Gsc, true)
            .with(InputSource::Serp, true);
        let plan = assemble_recommendations(&context(inputs), vec![raw("a", 50)]);
        assert_eq!(plan[0].confidence, Confidence::Full);
        assert_eq!(
            plan[0].missing_inputs,
            BTreeSet::from([InputSource::TechnicalSeo, InputSource::Competitive])
        );
    }

    #[test]
    fn test_two_of_five_inputs_is_degraded() {
        let inputs = AvailableInputs::default()
            .with(InputSource::Ga4, true)
            .with(InputSource::Competitive, true);
        let plan = assemble_recommendations(&context(inputs), vec![raw("a", 50)]);
        assert_eq!(plan[0].confidence, Confidence::Degraded);
        assert_eq!(plan[0].missing_inputs.len(), 3);
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let first = RawRecommendation::new("content", "agent-a", "Add FAQ schema").with_priority(60);
        let second =
            RawRecommendation::new("content", "agent-b", "  add   faq SCHEMA").with_priority(99);
        let plan = assemble_recommendations(&context(AvailableInputs::all()), vec![first, second]);

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].action, "Add FAQ schema");
        assert_eq!(plan[0].priority, 60.0);
        assert_eq!(plan[0].agent_sources, BTreeSet::from(["agent-a".to_string()]));
    }

    #[test]
    fn test_emitted_entries_are_open_with_unique_ids() {
        let plan = assemble_recommendations(
            &context(AvailableInputs::all()),
            vec![raw("a", 50), raw("b", 50)],
        );
        assert!(plan.iter().all(|r| r.status == RecommendationStatus::Open));
        assert!(plan.iter().all(|r| r.site_id == "site-1"));
        assert_ne!(plan[0].id, plan[1].id);
    }

    #[test]
    fn test_merge_agent_sources_is_idempotent() {
        let plan = assemble_recommendations(&context(AvailableInputs::all()), vec![raw("a", 50)]);
        let ab = merge_agent_sources(&plan[0], "agent-b");
        let again = merge_agent_sources(&ab, "agent-a");
        assert_eq!(
            again.agent_sources,
            BTreeSet::from(["agent-a".to_string(), "agent-b".to_string()])
        );
        assert_eq!(merge_agent_sources(&again, "agent-b"), again);
        // input untouched
        assert_eq!(plan[0].agent_sources.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let plan = assemble_recommendations(&context(AvailableInputs::default()), Vec::new());
        assert!(plan.is_empty());
        assert_eq!(PlanSummary::of(&plan), PlanSummary::default());
    }
}
