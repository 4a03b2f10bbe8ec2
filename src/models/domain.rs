use serde::{Deserialize, Serialize};

use crate::core::error::ConfigValidationError;

/// Expertise tier used both for skills and for the request's minimum experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpertiseLevel {
    Beginner,
    Intermediate,
    Expert,
    Master,
}

impl ExpertiseLevel {
    /// Ordinal tier used when comparing skill levels (beginner=1 ... master=4)
    pub fn tier(self) -> u8 {
        match self {
            ExpertiseLevel::Beginner => 1,
            ExpertiseLevel::Intermediate => 2,
            ExpertiseLevel::Expert => 3,
            ExpertiseLevel::Master => 4,
        }
    }

    /// Minimum years of overall experience implied by this level
    pub fn required_years(self) -> u32 {
        match self {
            ExpertiseLevel::Beginner => 1,
            ExpertiseLevel::Intermediate => 3,
            ExpertiseLevel::Expert => 6,
            ExpertiseLevel::Master => 10,
        }
    }

    /// Lenient parse used for upstream data; unknown values map to intermediate
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "beginner" => ExpertiseLevel::Beginner,
            "expert" => ExpertiseLevel::Expert,
            "master" => ExpertiseLevel::Master,
            _ => ExpertiseLevel::Intermediate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    OneOnOne,
    Group,
    Workshop,
    Mentoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// A single skill held by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSkill {
    pub name: String,
    pub level: ExpertiseLevel,
    #[serde(default)]
    pub years_experience: u32,
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// Weekly availability slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day_of_week: u8,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_end_time")]
    pub end_time: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_start_time() -> String { "09:00".to_string() }
fn default_end_time() -> String { "17:00".to_string() }
pub(crate) fn default_timezone() -> String { "UTC".to_string() }
pub(crate) fn default_currency() -> String { "USD".to_string() }
pub(crate) fn default_languages() -> Vec<String> { vec!["English".to_string()] }
fn default_true() -> bool { true }
fn default_one() -> u32 { 1 }
fn default_response_time() -> f64 { 24.0 }

/// Provider ("coach") profile as held in the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    #[serde(alias = "coach_id")]
    pub provider_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<ProviderSkill>,
    #[serde(default)]
    pub total_experience_years: u32,
    #[serde(default)]
    pub availability: Vec<AvailabilitySlot>,
    pub hourly_rate: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default = "default_response_time")]
    pub response_time_hours: f64,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_one")]
    pub max_participants: u32,
    #[serde(default)]
    pub session_types: Vec<SessionType>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub can_accept_new_clients: bool,
}

impl ProviderProfile {
    /// Only active providers that accept new clients take part in matching
    pub fn is_eligible(&self) -> bool {
        self.is_active && self.can_accept_new_clients
    }

    /// Distinct weekdays on which the provider has at least one slot
    pub fn available_days(&self) -> std::collections::BTreeSet<u8> {
        self.availability.iter().map(|slot| slot.day_of_week).collect()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Scored pairing of a request with one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub request_id: String,
    pub provider: ProviderProfile,
    pub match_score: f64,
    pub skill_score: f64,
    pub experience_score: f64,
    pub availability_score: f64,
    pub price_score: f64,
    pub rating_score: f64,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub availability_overlap: f64,
    pub price_difference_percent: f64,
    pub confidence_level: f64,
    pub recommendation_reason: String,
}

/// Raw scoring weights as configured
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skill: f64,
    pub experience: f64,
    pub availability: f64,
    pub price: f64,
    pub rating: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill: 0.30,
            experience: 0.25,
            availability: 0.15,
            price: 0.10,
            rating: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.skill + self.experience + self.availability + self.price + self.rating
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("skill", self.skill),
            ("experience", self.experience),
            ("availability", self.availability),
            ("price", self.price),
            ("rating", self.rating),
        ]
    }

    /// Validate every weight and rescale so the five sum to 1.0
    pub fn normalize(self) -> Result<NormalizedWeights, ConfigValidationError> {
        for (name, value) in self.named() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::WeightOutOfRange { name, value });
            }
        }

        let total = self.sum();
        if total <= 0.0 {
            return Err(ConfigValidationError::WeightSumNotPositive(total));
        }

        Ok(NormalizedWeights(ScoringWeights {
            skill: self.skill / total,
            experience: self.experience / total,
            availability: self.availability / total,
            price: self.price / total,
            rating: self.rating / total,
        }))
    }
}

/// Weights that passed validation and sum to 1.0.
///
/// Only [`ScoringWeights::normalize`] can build one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedWeights(ScoringWeights);

impl NormalizedWeights {
    pub fn get(&self) -> &ScoringWeights {
        &self.0
    }
}

impl Default for NormalizedWeights {
    fn default() -> Self {
        // The defaults already sum to 1.0
        NormalizedWeights(ScoringWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((ScoringWeights::default().sum() - 1.0).abs() < 1e-9);
        assert!((NormalizedWeights::default().get().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_rescales() {
        let weights = ScoringWeights {
            skill: 1.0,
            experience: 1.0,
            availability: 0.0,
            price: 0.0,
            rating: 0.0,
        };
        let normalized = weights.normalize().unwrap();
        assert!((normalized.get().skill - 0.5).abs() < 1e-9);
        assert!((normalized.get().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_rejects_bad_weights() {
        let zero = ScoringWeights {
            skill: 0.0,
            experience: 0.0,
            availability: 0.0,
            price: 0.0,
            rating: 0.0,
        };
        assert!(matches!(zero.normalize(), Err(ConfigValidationError::WeightSumNotPositive(_))));

        let negative = ScoringWeights { skill: -0.1, ..ScoringWeights::default() };
        assert!(matches!(
            negative.normalize(),
            Err(ConfigValidationError::WeightOutOfRange { name: "skill", .. })
        ));

        let too_big = ScoringWeights { price: 1.5, ..ScoringWeights::default() };
        assert!(too_big.normalize().is_err());
    }

    #[test]
    fn test_expertise_tiers() {
        assert_eq!(ExpertiseLevel::Beginner.tier(), 1);
        assert_eq!(ExpertiseLevel::Master.tier(), 4);
        assert_eq!(ExpertiseLevel::Expert.required_years(), 6);
        assert_eq!(ExpertiseLevel::parse_lenient("MASTER"), ExpertiseLevel::Master);
        assert_eq!(ExpertiseLevel::parse_lenient("guru"), ExpertiseLevel::Intermediate);
    }

    #[test]
    fn test_provider_deserializes_with_defaults() {
        let json = r#"{"coach_id": "c1", "hourly_rate": 90.0}"#;
        let provider: ProviderProfile = serde_json::from_str(json).unwrap();
        assert_eq!(provider.provider_id, "c1");
        assert_eq!(provider.languages, vec!["English"]);
        assert_eq!(provider.max_participants, 1);
        assert!(provider.is_eligible());
    }
}
