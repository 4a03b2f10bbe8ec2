// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AvailabilitySlot, ExpertiseLevel, MatchResult, NormalizedWeights, PriorityLevel, ProviderProfile,
    ProviderSkill, ScoringWeights, SessionType,
};
pub use requests::{AvailabilityRequirement, BudgetConstraint, MatchingRequest, SkillRequirement};
pub use responses::{
    CachedMatchResults, CoachesResponse, ErrorResponse, HealthResponse, MatchingErrorResponse,
    MatchingResponse, QueuedResponse, StatsResponse,
};
