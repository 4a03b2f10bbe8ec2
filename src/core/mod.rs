// Core algorithm exports
pub mod error;
pub mod filters;
pub mod matcher;
pub mod roster;
pub mod sample;
pub mod scoring;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ConfigValidationError, MatchError, ScoringError};
pub use filters::{apply_hard_filters, has_availability_overlap, passes_hard_filters};
pub use matcher::{MatchRanker, RankedMatches};
pub use roster::{
    FallbackSource, FreshSource, RefreshOutcome, RosterManager, RosterOrigin, RosterSettings, RosterSnapshot,
};
pub use sample::sample_roster;
pub use scoring::{ExactSkillLookup, ScoreCalculator, SkillLookup};
pub use stats::{StatsAggregator, StatsSample, StatsSnapshot};
