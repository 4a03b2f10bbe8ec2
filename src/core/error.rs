use thiserror::Error;

/// Errors surfaced to callers of the matching engine
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatchError {
    /// Stable machine-readable code for error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidRequest(_) => "invalid_request",
            MatchError::UpstreamUnavailable(_) => "upstream_unavailable",
            MatchError::Internal(_) => "internal_error",
        }
    }
}

/// A single provider record could not be scored.
///
/// The ranker logs these and skips the provider.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Malformed provider {provider_id}: {reason}")]
    MalformedProvider { provider_id: String, reason: String },
}

/// Startup-time configuration problems
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("Weight '{name}' must be within [0, 1], got {value}")]
    WeightOutOfRange { name: &'static str, value: f64 },

    #[error("Weights must sum to a positive value, got {0}")]
    WeightSumNotPositive(f64),

    #[error("Invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}
