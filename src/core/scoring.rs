use std::fmt;
use std::sync::Arc;

use crate::core::error::ScoringError;
use crate::core::filters::has_availability_overlap;
use crate::models::{
    ExpertiseLevel, MatchResult, MatchingRequest, NormalizedWeights, ProviderProfile, ProviderSkill,
};

/// Sub-score used when one side carries no data for a dimension
const NEUTRAL_SCORE: f64 = 0.5;

/// Resolves a required skill name against a provider's skills.
///
/// The default is a case-insensitive exact match. Fuzzier matching (synonyms,
/// embeddings) plugs in here without touching the scoring formulas.
pub trait SkillLookup: Send + Sync + fmt::Debug {
    fn find<'a>(&self, skills: &'a [ProviderSkill], name: &str) -> Option<&'a ProviderSkill>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSkillLookup;

impl SkillLookup for ExactSkillLookup {
    fn find<'a>(&self, skills: &'a [ProviderSkill], name: &str) -> Option<&'a ProviderSkill> {
        let wanted = name.trim().to_lowercase();
        skills
            .iter()
            .find(|skill| skill.name.trim().to_lowercase() == wanted)
    }
}

/// Computes the five sub-scores for a (request, provider) pair and combines
/// them with the configured weights.
///
/// Scoring formula:
/// overall = (
///     skill * w_skill +
///     experience * w_experience +
///     availability * w_availability +
///     price * w_price +
///     rating * w_rating
/// ) clamped to [0, 1]
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    weights: NormalizedWeights,
    skills: Arc<dyn SkillLookup>,
}

impl ScoreCalculator {
    pub fn new(weights: NormalizedWeights) -> Self {
        Self {
            weights,
            skills: Arc::new(ExactSkillLookup),
        }
    }

    pub fn with_skill_lookup(mut self, lookup: Arc<dyn SkillLookup>) -> Self {
        self.skills = lookup;
        self
    }

    pub fn weights(&self) -> &NormalizedWeights {
        &self.weights
    }

    /// Score one provider against a request
    pub fn score(
        &self,
        provider: &ProviderProfile,
        request: &MatchingRequest,
    ) -> Result<MatchResult, ScoringError> {
        check_provider(provider)?;

        let skill_score = clamp_unit(calculate_skill_score(self.skills.as_ref(), provider, request));
        let experience_score = clamp_unit(calculate_experience_score(
            provider.total_experience_years,
            request.experience_level,
        ));
        let availability_score = clamp_unit(calculate_availability_score(provider, request));
        let price_score = clamp_unit(calculate_price_score(provider.hourly_rate, request.budget_ceiling()));
        let rating_score = clamp_unit(calculate_rating_score(provider));

        let w = self.weights.get();
        let overall = skill_score * w.skill
            + experience_score * w.experience
            + availability_score * w.availability
            + price_score * w.price
            + rating_score * w.rating;

        let (matching_skills, missing_skills): (Vec<_>, Vec<_>) = request
            .skills_required
            .iter()
            .map(|required| required.name.clone())
            .partition(|name| self.skills.find(&provider.skills, name).is_some());

        Ok(MatchResult {
            request_id: request.request_id.clone(),
            provider: provider.clone(),
            match_score: clamp_unit(overall),
            skill_score,
            experience_score,
            availability_score,
            price_score,
            rating_score,
            matching_skills,
            missing_skills,
            availability_overlap: clamp_unit(availability_overlap(provider, request)),
            price_difference_percent: price_difference_percent(provider.hourly_rate, request.budget_ceiling()),
            confidence_level: confidence_level(skill_score, experience_score, availability_score, provider),
            recommendation_reason: recommendation_reason(provider, skill_score, experience_score, rating_score),
        })
    }
}

#[inline]
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Reject records whose numbers would poison the arithmetic
fn check_provider(provider: &ProviderProfile) -> Result<(), ScoringError> {
    let malformed = |reason: String| ScoringError::MalformedProvider {
        provider_id: provider.provider_id.clone(),
        reason,
    };

    if !provider.hourly_rate.is_finite() || provider.hourly_rate < 0.0 {
        return Err(malformed(format!("hourly rate {} is not a valid amount", provider.hourly_rate)));
    }
    if !provider.rating.is_finite() || !(0.0..=5.0).contains(&provider.rating) {
        return Err(malformed(format!("rating {} outside [0, 5]", provider.rating)));
    }
    if !provider.success_rate.is_finite() || !(0.0..=1.0).contains(&provider.success_rate) {
        return Err(malformed(format!("success rate {} outside [0, 1]", provider.success_rate)));
    }
    if let Some(slot) = provider.availability.iter().find(|slot| slot.day_of_week > 6) {
        return Err(malformed(format!("weekday {} outside 0..=6", slot.day_of_week)));
    }
    Ok(())
}

/// Weighted skill coverage; missing mandatory skills subtract from the sum
fn calculate_skill_score(
    lookup: &dyn SkillLookup,
    provider: &ProviderProfile,
    request: &MatchingRequest,
) -> f64 {
    if request.skills_required.is_empty() {
        return NEUTRAL_SCORE;
    }

    let total_weight: f64 = request.skills_required.iter().map(|s| s.weight).sum();
    if total_weight <= 0.0 {
        return NEUTRAL_SCORE;
    }

    let mut score = 0.0;
    for required in &request.skills_required {
        match lookup.find(&provider.skills, &required.name) {
            Some(found) => {
                let level_match = calculate_skill_level_match(found.level, required.level);
                let years_bonus = (found.years_experience as f64 / 5.0).min(0.2);
                score += (level_match + years_bonus).min(1.0) * required.weight;
            }
            None if required.mandatory => score -= 0.5 * required.weight,
            None => {}
        }
    }

    (score / total_weight).max(0.0)
}

#[inline]
fn calculate_skill_level_match(provider_level: ExpertiseLevel, required_level: ExpertiseLevel) -> f64 {
    let have = provider_level.tier();
    let need = required_level.tier();
    if have >= need {
        1.0
    } else {
        have as f64 / need as f64
    }
}

/// Linear partial credit below the level's year floor, parity at or above it
#[inline]
fn calculate_experience_score(years: u32, level: ExpertiseLevel) -> f64 {
    let required = level.required_years() as f64;
    let years = years as f64;

    if years >= required {
        // The extra-years bonus is capped at parity
        let bonus = ((years - required) / 10.0).min(0.3);
        tracing::trace!("experience bonus {:.2} capped at parity", bonus);
        (1.0 + bonus).min(1.0)
    } else {
        years / required
    }
}

#[inline]
fn calculate_availability_score(provider: &ProviderProfile, request: &MatchingRequest) -> f64 {
    let requirements = &request.availability_requirements;
    if provider.availability.is_empty() || requirements.days_of_week.is_empty() {
        return NEUTRAL_SCORE;
    }

    if !has_availability_overlap(provider, request) {
        return 0.0;
    }

    let flexibility_bonus = requirements.flexibility * 0.2;
    (availability_overlap(provider, request) + flexibility_bonus).min(1.0)
}

/// Share of the requested weekdays the provider covers
#[inline]
fn availability_overlap(provider: &ProviderProfile, request: &MatchingRequest) -> f64 {
    let requested: std::collections::BTreeSet<u8> = request
        .availability_requirements
        .days_of_week
        .iter()
        .copied()
        .collect();
    if requested.is_empty() {
        return 0.0;
    }

    let provider_days = provider.available_days();
    let shared = requested.intersection(&provider_days).count();
    shared as f64 / requested.len() as f64
}

#[inline]
fn calculate_price_score(rate: f64, ceiling: Option<f64>) -> f64 {
    let Some(ceiling) = ceiling.filter(|c| *c > 0.0) else {
        return NEUTRAL_SCORE;
    };

    if rate <= ceiling {
        if rate <= ceiling * 0.8 {
            1.0
        } else {
            0.8
        }
    } else {
        let overage = (rate - ceiling) / ceiling;
        (0.5 - overage).max(0.0)
    }
}

#[inline]
fn price_difference_percent(rate: f64, ceiling: Option<f64>) -> f64 {
    match ceiling.filter(|c| *c > 0.0) {
        Some(ceiling) => (rate - ceiling) / ceiling * 100.0,
        None => 0.0,
    }
}

#[inline]
fn calculate_rating_score(provider: &ProviderProfile) -> f64 {
    if provider.rating == 0.0 {
        return NEUTRAL_SCORE;
    }

    let base = provider.rating / 5.0;
    let session_bonus = (provider.total_sessions as f64 / 100.0).min(0.2);
    let success_bonus = provider.success_rate * 0.1;
    (base + session_bonus + success_bonus).min(1.0)
}

fn confidence_level(
    skill_score: f64,
    experience_score: f64,
    availability_score: f64,
    provider: &ProviderProfile,
) -> f64 {
    let mut confidence = (skill_score + experience_score + availability_score) / 3.0;
    if provider.total_sessions > 20 {
        confidence += 0.1;
    }
    if provider.rating > 4.5 {
        confidence += 0.1;
    }
    clamp_unit(confidence)
}

fn recommendation_reason(
    provider: &ProviderProfile,
    skill_score: f64,
    experience_score: f64,
    rating_score: f64,
) -> String {
    let mut reasons = Vec::new();

    if skill_score > 0.8 {
        reasons.push("excellent skill match");
    } else if skill_score > 0.6 {
        reasons.push("good skill alignment");
    }
    if experience_score > 0.8 {
        reasons.push("extensive experience");
    }
    if rating_score > 0.8 {
        reasons.push("highly rated");
    }
    if provider.total_sessions > 50 {
        reasons.push("proven track record");
    }
    if reasons.is_empty() {
        reasons.push("meets basic requirements");
    }

    format!("Recommended for {}", reasons.join(", "))
}
