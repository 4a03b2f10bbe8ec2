//! Coach Match - provider matching engine
//!
//! Ranks coaches against a structured matching request: hard filters remove
//! infeasible providers, five weighted sub-scores rank the rest, and the
//! roster is kept fresh from cache or the upstream API with a built-in
//! fallback.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::config::{MatchingConfig, Settings};
pub use crate::core::{MatchError, MatchRanker, RankedMatches, RefreshOutcome, RosterManager, ScoreCalculator};
pub use crate::models::{MatchResult, MatchingRequest, MatchingResponse, ProviderProfile, ScoringWeights};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = MatchingConfig::default();
        let calculator = ScoreCalculator::new(config.weights);
        assert!((calculator.weights().get().sum() - 1.0).abs() < 1e-9);
    }
}
