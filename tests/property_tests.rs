// Property tests for scoring and filtering

use proptest::prelude::*;

use coach_match::core::{apply_hard_filters, ScoreCalculator};
use coach_match::models::{
    AvailabilityRequirement, AvailabilitySlot, BudgetConstraint, ExpertiseLevel, MatchingRequest,
    NormalizedWeights, PriorityLevel, ProviderProfile, ProviderSkill, SessionType, SkillRequirement,
};

const SKILL_NAMES: [&str; 4] = ["Leadership", "Strategy", "Communication", "Agile"];

fn level() -> impl Strategy<Value = ExpertiseLevel> {
    prop_oneof![
        Just(ExpertiseLevel::Beginner),
        Just(ExpertiseLevel::Intermediate),
        Just(ExpertiseLevel::Expert),
        Just(ExpertiseLevel::Master),
    ]
}

fn days() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<bool>(), 7).prop_map(|mask| {
        mask.into_iter()
            .enumerate()
            .filter(|(_, on)| *on)
            .map(|(day, _)| day as u8)
            .collect()
    })
}

fn provider_skills() -> impl Strategy<Value = Vec<ProviderSkill>> {
    prop::collection::vec((prop::sample::select(SKILL_NAMES.to_vec()), level(), 0u32..20), 0..4).prop_map(
        |skills| {
            skills
                .into_iter()
                .map(|(name, level, years)| ProviderSkill {
                    name: name.to_string(),
                    level,
                    years_experience: years,
                    certifications: vec![],
                })
                .collect()
        },
    )
}

fn requirements() -> impl Strategy<Value = Vec<SkillRequirement>> {
    prop::collection::vec(
        (prop::sample::select(SKILL_NAMES.to_vec()), level(), 0.0f64..=1.0, any::<bool>()),
        0..4,
    )
    .prop_map(|skills| {
        skills
            .into_iter()
            .map(|(name, level, weight, mandatory)| SkillRequirement {
                name: name.to_string(),
                level,
                weight,
                mandatory,
            })
            .collect()
    })
}

prop_compose! {
    fn arb_provider()(
        skills in provider_skills(),
        years in 0u32..40,
        days in days(),
        rate in 0.0f64..500.0,
        rating in 0.0f64..=5.0,
        sessions in 0u32..500,
        success in 0.0f64..=1.0,
    ) -> ProviderProfile {
        ProviderProfile {
            provider_id: "p".to_string(),
            user_id: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            title: String::new(),
            company: String::new(),
            bio: String::new(),
            skills,
            total_experience_years: years,
            availability: days
                .into_iter()
                .map(|day| AvailabilitySlot {
                    day_of_week: day,
                    start_time: "09:00".to_string(),
                    end_time: "17:00".to_string(),
                    timezone: "UTC".to_string(),
                })
                .collect(),
            hourly_rate: rate,
            currency: "USD".to_string(),
            rating,
            total_sessions: sessions,
            success_rate: success,
            response_time_hours: 24.0,
            languages: vec!["English".to_string()],
            max_participants: 5,
            session_types: vec![SessionType::OneOnOne],
            is_active: true,
            can_accept_new_clients: true,
        }
    }
}

prop_compose! {
    fn arb_request()(
        skills in requirements(),
        experience in level(),
        days in days(),
        ceiling in prop::option::of(1.0f64..500.0),
        flexibility in 0.0f64..=1.0,
    ) -> MatchingRequest {
        MatchingRequest {
            request_id: "prop".to_string(),
            company_id: "company".to_string(),
            program_id: "program".to_string(),
            title: String::new(),
            description: String::new(),
            session_type: SessionType::OneOnOne,
            priority: PriorityLevel::Medium,
            skills_required: skills,
            experience_level: experience,
            budget_constraints: BudgetConstraint {
                max_hourly_rate: ceiling,
                ..BudgetConstraint::default()
            },
            availability_requirements: AvailabilityRequirement {
                days_of_week: days,
                time_slots: vec![],
                timezone: "UTC".to_string(),
                flexibility,
            },
            preferred_languages: vec!["English".to_string()],
            location_preference: None,
            coach_gender_preference: None,
            participants_count: 1,
            session_duration_minutes: 60,
            total_sessions: 1,
            start_date: None,
            end_date: None,
            created_at: chrono::Utc::now(),
        }
    }
}

fn in_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

proptest! {
    #[test]
    fn scores_stay_in_unit_interval(provider in arb_provider(), request in arb_request()) {
        let calculator = ScoreCalculator::new(NormalizedWeights::default());
        let result = calculator.score(&provider, &request).unwrap();

        prop_assert!(in_unit(result.match_score));
        prop_assert!(in_unit(result.skill_score));
        prop_assert!(in_unit(result.experience_score));
        prop_assert!(in_unit(result.availability_score));
        prop_assert!(in_unit(result.price_score));
        prop_assert!(in_unit(result.rating_score));
        prop_assert!(in_unit(result.availability_overlap));
        prop_assert!(in_unit(result.confidence_level));
    }

    #[test]
    fn no_required_skills_scores_neutral(provider in arb_provider(), mut request in arb_request()) {
        request.skills_required.clear();
        let calculator = ScoreCalculator::new(NormalizedWeights::default());
        let result = calculator.score(&provider, &request).unwrap();
        prop_assert_eq!(result.skill_score, 0.5);
    }

    #[test]
    fn missing_mandatory_skill_scores_below_present(
        provider in arb_provider(),
        mut request in arb_request(),
        name in prop::sample::select(SKILL_NAMES.to_vec()),
        required_level in level(),
        held_level in level(),
        held_years in 0u32..20,
        weight in 0.1f64..=1.0,
    ) {
        let mandatory = SkillRequirement {
            name: name.to_string(),
            level: required_level,
            weight,
            mandatory: true,
        };
        let mut lone = request.clone();
        lone.skills_required = vec![mandatory.clone()];
        request.skills_required.push(mandatory);

        let mut without = provider.clone();
        without.skills.retain(|skill| !skill.name.eq_ignore_ascii_case(name));
        let mut with = without.clone();
        with.skills.push(ProviderSkill {
            name: name.to_string(),
            level: held_level,
            years_experience: held_years,
            certifications: vec![],
        });

        let calculator = ScoreCalculator::new(NormalizedWeights::default());
        let missing = calculator.score(&without, &request).unwrap();
        let present = calculator.score(&with, &request).unwrap();

        // Other missing mandatory skills can pull both scores down to zero
        if present.skill_score > 0.0 {
            prop_assert!(missing.skill_score < present.skill_score);
        } else {
            prop_assert_eq!(missing.skill_score, 0.0);
        }
        prop_assert!(missing.missing_skills.iter().any(|skill| skill == name));

        // Alone, the held skill always earns tier credit
        let missing = calculator.score(&without, &lone).unwrap();
        let present = calculator.score(&with, &lone).unwrap();
        prop_assert!(present.skill_score > 0.0);
        prop_assert!(missing.skill_score < present.skill_score);
    }

    #[test]
    fn lower_ceiling_never_admits_more(
        providers in prop::collection::vec(arb_provider(), 0..20),
        request in arb_request(),
        high in 50.0f64..500.0,
        cut in 0.1f64..=1.0,
    ) {
        let mut loose = request.clone();
        loose.budget_constraints.max_hourly_rate = Some(high);
        let mut tight = request;
        tight.budget_constraints.max_hourly_rate = Some(high * cut);

        let loose_survivors = apply_hard_filters(providers.clone(), &loose);
        let tight_survivors = apply_hard_filters(providers, &tight);

        prop_assert!(tight_survivors.len() <= loose_survivors.len());
        for survivor in &tight_survivors {
            prop_assert!(survivor.hourly_rate <= high * cut);
        }
    }
}
