use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{AvailabilitySlot, ExpertiseLevel, ProviderProfile, ProviderSkill, SessionType};

/// Errors that can occur when fetching the upstream roster
#[derive(Debug, Error)]
pub enum RosterSourceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Roster request timed out after {0:?}")]
    Timeout(Duration),
}

/// Where the authoritative roster comes from
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn fetch_roster(&self) -> Result<Vec<ProviderProfile>, RosterSourceError>;
}

/// Roster source backed by the platform's coach API
///
/// Issues `GET {base_url}/coaches` and maps the camelCase coach records onto
/// [`ProviderProfile`]. Records that fail to parse are skipped.
pub struct HttpRosterSource {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpRosterSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RosterSourceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            timeout,
            client,
        })
    }

    fn coaches_url(&self) -> String {
        format!("{}/coaches", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RosterSource for HttpRosterSource {
    async fn fetch_roster(&self) -> Result<Vec<ProviderProfile>, RosterSourceError> {
        let url = self.coaches_url();
        tracing::debug!("Fetching roster from: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                RosterSourceError::Timeout(self.timeout)
            } else {
                RosterSourceError::RequestError(e)
            }
        })?;

        if !response.status().is_success() {
            return Err(RosterSourceError::ApiError(format!(
                "Failed to fetch coaches: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                RosterSourceError::Timeout(self.timeout)
            } else {
                RosterSourceError::InvalidResponse(e.to_string())
            }
        })?;

        let records = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| RosterSourceError::InvalidResponse("Missing data array".into()))?;

        let providers: Vec<ProviderProfile> = records.iter().filter_map(parse_coach).collect();

        if providers.is_empty() {
            return Err(RosterSourceError::InvalidResponse(format!(
                "No usable coaches in {} upstream records",
                records.len()
            )));
        }

        tracing::info!("Fetched {} coaches from API", providers.len());
        Ok(providers)
    }
}

fn parse_coach(value: &Value) -> Option<ProviderProfile> {
    match serde_json::from_value::<UpstreamCoach>(value.clone()) {
        Ok(coach) => Some(coach.into_profile()),
        Err(e) => {
            let id = value.get("id").and_then(|v| v.as_str()).unwrap_or("<unknown>");
            tracing::warn!("Failed to parse coach {}: {}", id, e);
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamCoach {
    id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    bio: String,
    #[serde(default)]
    expertise: Vec<UpstreamExpertise>,
    #[serde(default)]
    availability: Vec<UpstreamSlot>,
    #[serde(default = "default_hourly_rate")]
    hourly_rate: f64,
    #[serde(default = "crate::models::domain::default_currency")]
    currency: String,
    #[serde(default)]
    metrics: UpstreamMetrics,
    #[serde(default = "crate::models::domain::default_languages")]
    languages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamExpertise {
    #[serde(default)]
    subcategory: String,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    years_experience: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamSlot {
    #[serde(default)]
    day_of_week: u8,
    #[serde(default = "default_start_time")]
    start_time: String,
    #[serde(default = "default_end_time")]
    end_time: String,
    #[serde(default = "crate::models::domain::default_timezone")]
    timezone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamMetrics {
    #[serde(default)]
    average_rating: f64,
    #[serde(default)]
    total_sessions: u32,
    #[serde(default)]
    success_rate: f64,
    #[serde(default = "default_response_time")]
    response_time: f64,
}

impl Default for UpstreamMetrics {
    fn default() -> Self {
        Self {
            average_rating: 0.0,
            total_sessions: 0,
            success_rate: 0.0,
            response_time: default_response_time(),
        }
    }
}

fn default_hourly_rate() -> f64 { 100.0 }
fn default_start_time() -> String { "09:00".to_string() }
fn default_end_time() -> String { "17:00".to_string() }
fn default_response_time() -> f64 { 24.0 }

impl UpstreamCoach {
    fn into_profile(self) -> ProviderProfile {
        let total_experience_years = self
            .expertise
            .iter()
            .map(|e| e.years_experience)
            .max()
            .unwrap_or(0);

        let skills = self
            .expertise
            .into_iter()
            .map(|e| ProviderSkill {
                name: e.subcategory,
                level: e
                    .level
                    .as_deref()
                    .map(ExpertiseLevel::parse_lenient)
                    .unwrap_or(ExpertiseLevel::Intermediate),
                years_experience: e.years_experience,
                certifications: Vec::new(),
            })
            .collect();

        let availability = self
            .availability
            .into_iter()
            .map(|slot| AvailabilitySlot {
                day_of_week: slot.day_of_week,
                start_time: slot.start_time,
                end_time: slot.end_time,
                timezone: slot.timezone,
            })
            .collect();

        ProviderProfile {
            provider_id: self.id,
            user_id: self.user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            title: self.title,
            company: self.company,
            bio: self.bio,
            skills,
            total_experience_years,
            availability,
            hourly_rate: self.hourly_rate,
            currency: self.currency,
            rating: self.metrics.average_rating,
            total_sessions: self.metrics.total_sessions,
            success_rate: self.metrics.success_rate,
            response_time_hours: self.metrics.response_time,
            languages: self.languages,
            max_participants: 1,
            session_types: vec![SessionType::OneOnOne],
            is_active: true,
            can_accept_new_clients: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upstream_coach_mapping() {
        let value = json!({
            "id": "c-42",
            "userId": "u-42",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "expertise": [
                {"subcategory": "Leadership", "level": "EXPERT", "yearsExperience": 7},
                {"subcategory": "Strategy", "level": "guru", "yearsExperience": 3}
            ],
            "availability": [{"dayOfWeek": 2, "startTime": "10:00"}],
            "metrics": {"averageRating": 4.5, "totalSessions": 30, "successRate": 0.9}
        });

        let profile = parse_coach(&value).expect("coach should parse");
        assert_eq!(profile.provider_id, "c-42");
        assert_eq!(profile.total_experience_years, 7);
        assert_eq!(profile.skills[0].level, ExpertiseLevel::Expert);
        assert_eq!(profile.skills[1].level, ExpertiseLevel::Intermediate);
        assert_eq!(profile.availability[0].end_time, "17:00");
        assert_eq!(profile.availability[0].timezone, "UTC");
        assert_eq!(profile.hourly_rate, 100.0);
        assert_eq!(profile.response_time_hours, 24.0);
        assert_eq!(profile.languages, vec!["English"]);
        assert_eq!(profile.max_participants, 1);
        assert_eq!(profile.session_types, vec![SessionType::OneOnOne]);
        assert!(profile.is_eligible());
    }

    #[test]
    fn test_unparseable_coach_skipped() {
        assert!(parse_coach(&json!({"firstName": "No id"})).is_none());
        assert!(parse_coach(&json!({"id": "x", "hourlyRate": "cheap"})).is_none());
    }

    #[test]
    fn test_coaches_url_trims_slash() {
        let source = HttpRosterSource::new("http://backend:3001/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.coaches_url(), "http://backend:3001/api/coaches");
    }
}
