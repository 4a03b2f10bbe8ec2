use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;

use crate::config::MatchingConfig;
use crate::core::error::MatchError;
use crate::core::filters::apply_hard_filters;
use crate::core::roster::{RefreshOutcome, RosterManager};
use crate::core::scoring::ScoreCalculator;
use crate::core::stats::{StatsAggregator, StatsSample};
use crate::models::{CachedMatchResults, MatchResult, MatchingRequest, MatchingResponse, ProviderProfile};
use crate::services::cache::{set_json, CacheKey, RosterCache, StatsSink};

/// Result of one matching pass
#[derive(Debug, Clone)]
pub struct RankedMatches {
    pub matches: Vec<MatchResult>,
    /// Eligible providers considered before hard filtering
    pub total_evaluated: usize,
    pub processing_time_ms: u64,
}

impl RankedMatches {
    fn empty(started: Instant) -> Self {
        Self {
            matches: Vec::new(),
            total_evaluated: 0,
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    pub fn average_score(&self) -> f64 {
        if self.matches.is_empty() {
            return 0.0;
        }
        self.matches.iter().map(|m| m.match_score).sum::<f64>() / self.matches.len() as f64
    }

    pub fn into_response(self, request: &MatchingRequest, algorithm_version: &str) -> MatchingResponse {
        MatchingResponse::build(
            request,
            self.matches,
            self.total_evaluated,
            self.processing_time_ms,
            algorithm_version,
        )
    }
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Roster refresh-or-cache, eligible providers only
/// 2. Hard filtering
/// 3. Parallel scoring and minimum-score threshold
/// 4. Stable sort by score, truncate
/// 5. Persist results and report statistics
pub struct MatchRanker {
    config: Arc<MatchingConfig>,
    calculator: ScoreCalculator,
    roster: Arc<RosterManager>,
    cache: Arc<dyn RosterCache>,
    stats: Arc<StatsAggregator>,
    sink: Arc<dyn StatsSink>,
}

impl MatchRanker {
    pub fn new(
        config: Arc<MatchingConfig>,
        roster: Arc<RosterManager>,
        cache: Arc<dyn RosterCache>,
        stats: Arc<StatsAggregator>,
        sink: Arc<dyn StatsSink>,
    ) -> Self {
        let calculator = ScoreCalculator::new(config.weights);
        Self {
            config,
            calculator,
            roster,
            cache,
            stats,
            sink,
        }
    }

    /// Replace the score calculator, e.g. to plug in a different skill lookup
    pub fn with_calculator(mut self, calculator: ScoreCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn roster(&self) -> &Arc<RosterManager> {
        &self.roster
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    /// Filter, score, order and truncate a provider set.
    ///
    /// Pure apart from logging. Providers whose records cannot be scored are
    /// skipped; ties keep their input order.
    pub fn rank(&self, request: &MatchingRequest, providers: Vec<ProviderProfile>) -> Vec<MatchResult> {
        let survivors = apply_hard_filters(providers, request);
        score_and_order(
            &self.calculator,
            self.config.min_match_score,
            self.config.max_results,
            request,
            &survivors,
        )
    }

    /// Run a full matching pass for a request
    pub async fn find_matches(&self, request: &MatchingRequest) -> Result<RankedMatches, MatchError> {
        let started = Instant::now();
        request.check()?;

        tracing::info!(request_id = %request.request_id, "Processing matching request");

        if self.roster.refresh_if_stale().await == RefreshOutcome::Exhausted {
            return Err(MatchError::UpstreamUnavailable(
                "no roster source produced providers and no fallback roster is configured".to_string(),
            ));
        }

        let providers = self.roster.snapshot().await.eligible();
        if providers.is_empty() {
            tracing::warn!(request_id = %request.request_id, "No eligible providers in roster");
            return Ok(RankedMatches::empty(started));
        }

        let total_evaluated = providers.len();
        let survivors = apply_hard_filters(providers, request);
        if survivors.is_empty() {
            tracing::info!(
                request_id = %request.request_id,
                evaluated = total_evaluated,
                "No providers passed hard filters"
            );
            return Ok(RankedMatches {
                matches: Vec::new(),
                total_evaluated,
                processing_time_ms: started.elapsed().as_millis() as u64,
            });
        }

        // Rayon scoring runs on the blocking pool
        let calculator = self.calculator.clone();
        let (min_score, max_results) = (self.config.min_match_score, self.config.max_results);
        let owned = request.clone();
        let matches = tokio::task::spawn_blocking(move || {
            score_and_order(&calculator, min_score, max_results, &owned, &survivors)
        })
        .await
        .map_err(|e| MatchError::Internal(format!("scoring task failed: {}", e)))?;

        let ranked = RankedMatches {
            matches,
            total_evaluated,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        self.persist(request, &ranked).await;
        self.report(request, &ranked).await;

        tracing::info!(
            request_id = %request.request_id,
            matches = ranked.matches.len(),
            evaluated = ranked.total_evaluated,
            processing_time_ms = ranked.processing_time_ms,
            "Matching request completed"
        );
        Ok(ranked)
    }

    /// [`find_matches`](Self::find_matches) wrapped in the response envelope
    pub async fn match_request(&self, request: &MatchingRequest) -> Result<MatchingResponse, MatchError> {
        let ranked = self.find_matches(request).await?;
        Ok(ranked.into_response(request, &self.config.algorithm_version))
    }

    async fn persist(&self, request: &MatchingRequest, ranked: &RankedMatches) {
        let record = CachedMatchResults {
            matches: ranked.matches.clone(),
            generated_at: Utc::now(),
            algorithm_version: self.config.algorithm_version.clone(),
        };
        let key = CacheKey::match_result(&request.request_id);
        if let Err(e) = set_json(self.cache.as_ref(), &key, &record, self.config.result_ttl).await {
            tracing::error!(request_id = %request.request_id, "Failed to cache match results: {}", e);
        }
    }

    async fn report(&self, request: &MatchingRequest, ranked: &RankedMatches) {
        let sample = StatsSample {
            timestamp: Utc::now(),
            request_id: request.request_id.clone(),
            total_coaches: ranked.total_evaluated,
            matches_found: ranked.matches.len(),
            processing_time_ms: ranked.processing_time_ms,
            average_score: ranked.average_score(),
            algorithm_version: self.config.algorithm_version.clone(),
        };

        self.stats.record(sample.clone()).await;

        let sink = self.sink.clone();
        tokio::spawn(async move {
            sink.record(&sample).await;
        });
    }
}

/// Score survivors in parallel, drop those under the threshold, order and truncate
fn score_and_order(
    calculator: &ScoreCalculator,
    min_score: f64,
    max_results: usize,
    request: &MatchingRequest,
    survivors: &[ProviderProfile],
) -> Vec<MatchResult> {
    if survivors.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<MatchResult> = survivors
        .par_iter()
        .filter_map(|provider| match calculator.score(provider, request) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::error!(request_id = %request.request_id, "Skipping provider: {}", e);
                None
            }
        })
        .filter(|result| result.match_score >= min_score)
        .collect();

    // Stable sort, no secondary key
    matches.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(max_results);
    matches
}
