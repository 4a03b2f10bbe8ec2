use crate::models::{MatchingRequest, ProviderProfile};

/// Check whether a provider can serve the request at all
///
/// Every rule here is binary: one violation makes the engagement infeasible
/// no matter how well the provider would score.
#[inline]
pub fn passes_hard_filters(provider: &ProviderProfile, request: &MatchingRequest) -> bool {
    // Session type must be supported
    if !provider.session_types.contains(&request.session_type) {
        return false;
    }

    // Budget ceiling
    if let Some(ceiling) = request.budget_ceiling() {
        if provider.hourly_rate > ceiling {
            return false;
        }
    }

    // Participant capacity
    if provider.max_participants < request.participants_count {
        return false;
    }

    // At least one shared language
    if !shares_language(provider, request) {
        return false;
    }

    // At least one shared weekday
    has_availability_overlap(provider, request)
}

/// Drop every provider that violates a hard constraint, keeping survivor order
pub fn apply_hard_filters(
    providers: Vec<ProviderProfile>,
    request: &MatchingRequest,
) -> Vec<ProviderProfile> {
    providers
        .into_iter()
        .filter(|provider| passes_hard_filters(provider, request))
        .collect()
}

#[inline]
fn shares_language(provider: &ProviderProfile, request: &MatchingRequest) -> bool {
    request.preferred_languages.iter().any(|wanted| {
        provider
            .languages
            .iter()
            .any(|spoken| spoken.trim().eq_ignore_ascii_case(wanted.trim()))
    })
}

/// Day-level overlap only; time of day is not considered at this stage
#[inline]
pub fn has_availability_overlap(provider: &ProviderProfile, request: &MatchingRequest) -> bool {
    let provider_days = provider.available_days();
    request
        .availability_requirements
        .days_of_week
        .iter()
        .any(|day| provider_days.contains(day))
}
