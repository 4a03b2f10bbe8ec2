//! Builders shared by the engine's unit tests.

use chrono::Utc;

use crate::models::{
    AvailabilityRequirement, AvailabilitySlot, BudgetConstraint, ExpertiseLevel, MatchingRequest,
    PriorityLevel, ProviderProfile, ProviderSkill, SessionType, SkillRequirement,
};
use crate::services::roster_source::{RosterSource, RosterSourceError};

pub fn provider(id: &str, rate: f64, days: &[u8]) -> ProviderProfile {
    ProviderProfile {
        provider_id: id.to_string(),
        user_id: format!("user_{}", id),
        first_name: "Test".to_string(),
        last_name: "Coach".to_string(),
        email: String::new(),
        title: String::new(),
        company: String::new(),
        bio: String::new(),
        skills: vec![],
        total_experience_years: 5,
        availability: days
            .iter()
            .map(|day| AvailabilitySlot {
                day_of_week: *day,
                start_time: "09:00".to_string(),
                end_time: "17:00".to_string(),
                timezone: "UTC".to_string(),
            })
            .collect(),
        hourly_rate: rate,
        currency: "USD".to_string(),
        rating: 4.0,
        total_sessions: 10,
        success_rate: 0.8,
        response_time_hours: 4.0,
        languages: vec!["English".to_string(), "Spanish".to_string()],
        max_participants: 5,
        session_types: vec![SessionType::OneOnOne, SessionType::Group],
        is_active: true,
        can_accept_new_clients: true,
    }
}

pub fn skill(name: &str, level: ExpertiseLevel, years: u32) -> ProviderSkill {
    ProviderSkill {
        name: name.to_string(),
        level,
        years_experience: years,
        certifications: vec![],
    }
}

pub fn requirement(name: &str, level: ExpertiseLevel, weight: f64, mandatory: bool) -> SkillRequirement {
    SkillRequirement {
        name: name.to_string(),
        level,
        weight,
        mandatory,
    }
}

pub fn request(ceiling: Option<f64>, days: Vec<u8>) -> MatchingRequest {
    MatchingRequest {
        request_id: "req".to_string(),
        company_id: "company".to_string(),
        program_id: "program".to_string(),
        title: String::new(),
        description: String::new(),
        session_type: SessionType::OneOnOne,
        priority: PriorityLevel::Medium,
        skills_required: vec![],
        experience_level: ExpertiseLevel::Intermediate,
        budget_constraints: BudgetConstraint {
            max_hourly_rate: ceiling,
            ..BudgetConstraint::default()
        },
        availability_requirements: AvailabilityRequirement {
            days_of_week: days,
            time_slots: vec![],
            timezone: "UTC".to_string(),
            flexibility: 0.5,
        },
        preferred_languages: vec!["english".to_string()],
        location_preference: None,
        coach_gender_preference: None,
        participants_count: 1,
        session_duration_minutes: 60,
        total_sessions: 1,
        start_date: None,
        end_date: None,
        created_at: Utc::now(),
    }
}

/// Roster source that always serves the same providers, or always fails
pub struct StaticSource(pub Option<Vec<ProviderProfile>>);

#[async_trait::async_trait]
impl RosterSource for StaticSource {
    async fn fetch_roster(&self) -> Result<Vec<ProviderProfile>, RosterSourceError> {
        self.0
            .clone()
            .ok_or_else(|| RosterSourceError::ApiError("upstream down".to_string()))
    }
}
