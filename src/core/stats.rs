use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One matching pass as recorded for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSample {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub total_coaches: usize,
    pub matches_found: usize,
    pub processing_time_ms: u64,
    pub average_score: f64,
    pub algorithm_version: String,
}

/// Read-only view of the aggregator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests_processed: u64,
    pub total_matches_generated: u64,
    pub average_processing_time_ms: f64,
    pub last_processing_time_ms: u64,
    pub algorithm_version: String,
    pub samples_retained: usize,
    pub last_sample_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StatsState {
    requests: u64,
    matches: u64,
    mean_processing_ms: f64,
    last_processing_ms: u64,
    samples: VecDeque<StatsSample>,
}

/// Rolling counters plus a bounded, time-ordered sample log
#[derive(Debug)]
pub struct StatsAggregator {
    capacity: usize,
    algorithm_version: String,
    state: Mutex<StatsState>,
}

impl StatsAggregator {
    pub fn new(capacity: usize, algorithm_version: impl Into<String>) -> Self {
        Self {
            capacity: capacity.max(1),
            algorithm_version: algorithm_version.into(),
            state: Mutex::new(StatsState::default()),
        }
    }

    pub async fn record(&self, sample: StatsSample) {
        let mut state = self.state.lock().await;

        state.requests += 1;
        state.matches += sample.matches_found as u64;
        state.last_processing_ms = sample.processing_time_ms;
        // Incremental mean
        let n = state.requests as f64;
        state.mean_processing_ms += (sample.processing_time_ms as f64 - state.mean_processing_ms) / n;

        state.samples.push_back(sample);
        while state.samples.len() > self.capacity {
            state.samples.pop_front();
        }
    }

    pub async fn snapshot(&self) -> StatsSnapshot {
        let state = self.state.lock().await;
        StatsSnapshot {
            total_requests_processed: state.requests,
            total_matches_generated: state.matches,
            average_processing_time_ms: state.mean_processing_ms,
            last_processing_time_ms: state.last_processing_ms,
            algorithm_version: self.algorithm_version.clone(),
            samples_retained: state.samples.len(),
            last_sample_at: state.samples.back().map(|s| s.timestamp),
        }
    }

    /// Samples recorded within the trailing window, oldest first
    pub async fn samples_since(&self, window: Duration) -> Vec<StatsSample> {
        let cutoff = Utc::now() - window;
        let state = self.state.lock().await;
        state
            .samples
            .iter()
            .filter(|s| s.timestamp >= cutoff)
            .cloned()
            .collect()
    }
}
