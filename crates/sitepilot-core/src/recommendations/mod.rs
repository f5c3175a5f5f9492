//! Recommendation plan assembly.
//!
//! No storage or network access. Assembly does emit `tracing` events and
//! bumps the process-wide [`crate::metrics::METRICS`] counters.

pub mod assemble;
pub mod model;

pub use assemble::{
    assemble_recommendations, assemble_with_options, fingerprint, merge_agent_sources,
    AssemblyOptions, BucketPolicy, PlanSummary,
};
pub use model::{
    AssembledRecommendation, AssemblyContext, AvailableInputs, Confidence, InputSource, Phase,
    RawRecommendation, RecommendationStatus, DEFAULT_PRIORITY,
};
