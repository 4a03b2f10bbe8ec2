use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::stats::StatsSnapshot;
use crate::models::domain::{MatchResult, ProviderProfile};
use crate::models::requests::MatchingRequest;

/// Response for a completed matching request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingResponse {
    pub request_id: String,
    pub matches: Vec<MatchResult>,
    pub total_coaches_evaluated: usize,
    pub processing_time_ms: u64,
    pub algorithm_version: String,
    pub timestamp: DateTime<Utc>,
    pub average_match_score: f64,
    pub best_match_score: f64,
    #[serde(default)]
    pub filters_applied: BTreeMap<String, serde_json::Value>,
}

impl MatchingResponse {
    pub fn build(
        request: &MatchingRequest,
        matches: Vec<MatchResult>,
        total_coaches_evaluated: usize,
        processing_time_ms: u64,
        algorithm_version: &str,
    ) -> Self {
        let best_match_score = matches
            .iter()
            .map(|m| m.match_score)
            .fold(0.0_f64, f64::max);
        let average_match_score = if matches.is_empty() {
            0.0
        } else {
            matches.iter().map(|m| m.match_score).sum::<f64>() / matches.len() as f64
        };

        Self {
            request_id: request.request_id.clone(),
            matches,
            total_coaches_evaluated,
            processing_time_ms,
            algorithm_version: algorithm_version.to_string(),
            timestamp: Utc::now(),
            average_match_score,
            best_match_score,
            filters_applied: filters_applied(request),
        }
    }
}

/// The hard constraints that were in force for a request
fn filters_applied(request: &MatchingRequest) -> BTreeMap<String, serde_json::Value> {
    let mut filters = BTreeMap::new();
    filters.insert("session_type".to_string(), serde_json::json!(request.session_type));
    if let Some(ceiling) = request.budget_ceiling() {
        filters.insert("max_hourly_rate".to_string(), serde_json::json!(ceiling));
    }
    filters.insert("participants_count".to_string(), serde_json::json!(request.participants_count));
    filters.insert("preferred_languages".to_string(), serde_json::json!(request.preferred_languages));
    filters.insert(
        "days_of_week".to_string(),
        serde_json::json!(request.availability_requirements.days_of_week),
    );
    filters
}

/// Error envelope published when an asynchronously submitted request fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingErrorResponse {
    pub request_id: String,
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Acknowledgement for a queued request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedResponse {
    pub request_id: String,
    pub status: String,
}

/// Match results persisted under `match_result:<request_id>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMatchResults {
    pub matches: Vec<MatchResult>,
    pub generated_at: DateTime<Utc>,
    pub algorithm_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachesResponse {
    pub coaches: Vec<ProviderProfile>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub active_coaches: usize,
    pub roster_origin: String,
    /// Samples recorded within `window_minutes`
    pub recent_samples: usize,
    pub window_minutes: i64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: BTreeMap<String, String>,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
