use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::error::MatchError;
use crate::models::domain::{default_currency, default_languages, default_timezone, ExpertiseLevel, PriorityLevel, SessionType};

/// Skill the requester needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SkillRequirement {
    #[validate(length(min = 1))]
    pub name: String,
    pub level: ExpertiseLevel,
    #[serde(default = "default_weight")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub weight: f64,
    #[serde(default)]
    pub mandatory: bool,
}

fn default_weight() -> f64 { 1.0 }

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct BudgetConstraint {
    #[serde(default)]
    pub max_hourly_rate: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub total_budget: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_payment_frequency")]
    pub payment_frequency: String,
}

fn default_payment_frequency() -> String { "hourly".to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AvailabilityRequirement {
    /// 0 = Monday ... 6 = Sunday
    pub days_of_week: Vec<u8>,
    #[serde(default)]
    pub time_slots: Vec<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_flexibility")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub flexibility: f64,
}

fn default_flexibility() -> f64 { 0.5 }

/// Matching request submitted by the orchestration layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MatchingRequest {
    #[serde(default = "generate_request_id")]
    #[validate(length(min = 1))]
    pub request_id: String,
    #[validate(length(min = 1))]
    pub company_id: String,
    #[validate(length(min = 1))]
    pub program_id: String,

    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub session_type: SessionType,
    #[serde(default)]
    pub priority: PriorityLevel,

    #[serde(default)]
    #[validate(nested)]
    pub skills_required: Vec<SkillRequirement>,
    pub experience_level: ExpertiseLevel,
    #[serde(default)]
    #[validate(nested)]
    pub budget_constraints: BudgetConstraint,
    #[validate(nested)]
    pub availability_requirements: AvailabilityRequirement,

    #[serde(default = "default_languages")]
    #[validate(length(min = 1))]
    pub preferred_languages: Vec<String>,
    #[serde(default)]
    pub location_preference: Option<String>,
    #[serde(default)]
    pub coach_gender_preference: Option<String>,

    #[serde(default = "default_participants")]
    #[validate(range(min = 1))]
    pub participants_count: u32,
    #[serde(default = "default_session_duration")]
    #[validate(range(min = 15))]
    pub session_duration_minutes: u32,
    #[serde(default = "default_participants")]
    #[validate(range(min = 1))]
    pub total_sessions: u32,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_participants() -> u32 { 1 }
fn default_session_duration() -> u32 { 60 }

impl MatchingRequest {
    /// Budget ceiling, when one is set
    pub fn budget_ceiling(&self) -> Option<f64> {
        self.budget_constraints.max_hourly_rate
    }

    /// Run field validation plus the semantic checks the derive can't express
    pub fn check(&self) -> Result<(), MatchError> {
        self.validate()
            .map_err(|errors| MatchError::InvalidRequest(errors.to_string()))?;

        if let Some(day) = self
            .availability_requirements
            .days_of_week
            .iter()
            .find(|day| **day > 6)
        {
            return Err(MatchError::InvalidRequest(format!(
                "days_of_week must be between 0 (Monday) and 6 (Sunday), got {}",
                day
            )));
        }

        if let Some(ceiling) = self.budget_ceiling() {
            if !ceiling.is_finite() || ceiling <= 0.0 {
                return Err(MatchError::InvalidRequest(format!(
                    "max_hourly_rate must be a positive number, got {}",
                    ceiling
                )));
            }
        }

        if !self.availability_requirements.flexibility.is_finite() {
            return Err(MatchError::InvalidRequest("flexibility must be finite".to_string()));
        }

        if self.skills_required.iter().any(|skill| !skill.weight.is_finite()) {
            return Err(MatchError::InvalidRequest("skill weights must be finite".to_string()));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(MatchError::InvalidRequest("end_date precedes start_date".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> serde_json::Value {
        json!({
            "request_id": "req-1",
            "company_id": "acme",
            "program_id": "leaders",
            "session_type": "one_on_one",
            "experience_level": "expert",
            "skills_required": [
                {"name": "Leadership", "level": "expert", "weight": 1.0, "mandatory": true}
            ],
            "budget_constraints": {"max_hourly_rate": 150.0},
            "availability_requirements": {"days_of_week": [0, 2], "flexibility": 0.5}
        })
    }

    #[test]
    fn test_valid_request_passes() {
        let request: MatchingRequest = serde_json::from_value(base()).unwrap();
        assert!(request.check().is_ok());
        assert_eq!(request.preferred_languages, vec!["English"]);
        assert_eq!(request.participants_count, 1);
        assert_eq!(request.budget_ceiling(), Some(150.0));
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let mut value = base();
        value.as_object_mut().unwrap().remove("request_id");
        let request: MatchingRequest = serde_json::from_value(value).unwrap();
        assert!(!request.request_id.is_empty());
    }

    #[test]
    fn test_rejects_bad_weekday() {
        let mut value = base();
        value["availability_requirements"]["days_of_week"] = json!([0, 7]);
        let request: MatchingRequest = serde_json::from_value(value).unwrap();
        assert!(matches!(request.check(), Err(MatchError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_out_of_range_skill_weight() {
        let mut value = base();
        value["skills_required"][0]["weight"] = json!(1.5);
        let request: MatchingRequest = serde_json::from_value(value).unwrap();
        assert!(matches!(request.check(), Err(MatchError::InvalidRequest(_))));
    }

    #[test]
    fn test_rejects_zero_budget_ceiling() {
        let mut value = base();
        value["budget_constraints"]["max_hourly_rate"] = json!(0.0);
        let request: MatchingRequest = serde_json::from_value(value).unwrap();
        assert!(request.check().is_err());
    }

    #[test]
    fn test_rejects_empty_languages_and_zero_participants() {
        let mut value = base();
        value["preferred_languages"] = json!([]);
        let request: MatchingRequest = serde_json::from_value(value).unwrap();
        assert!(request.check().is_err());

        let mut value = base();
        value["participants_count"] = json!(0);
        let request: MatchingRequest = serde_json::from_value(value).unwrap();
        assert!(request.check().is_err());
    }
}
