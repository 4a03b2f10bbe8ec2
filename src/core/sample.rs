use crate::models::{AvailabilitySlot, ExpertiseLevel, ProviderProfile, ProviderSkill, SessionType};

fn slot(day_of_week: u8, start: &str, end: &str, timezone: &str) -> AvailabilitySlot {
    AvailabilitySlot {
        day_of_week,
        start_time: start.to_string(),
        end_time: end.to_string(),
        timezone: timezone.to_string(),
    }
}

fn skill(name: &str, level: ExpertiseLevel, years: u32, certifications: &[&str]) -> ProviderSkill {
    ProviderSkill {
        name: name.to_string(),
        level,
        years_experience: years,
        certifications: certifications.iter().map(|c| c.to_string()).collect(),
    }
}

/// Fixed roster used when neither the cache nor the upstream source can
/// supply providers.
pub fn sample_roster() -> Vec<ProviderProfile> {
    vec![
        ProviderProfile {
            provider_id: "coach_1".to_string(),
            user_id: "user_1".to_string(),
            first_name: "Sarah".to_string(),
            last_name: "Johnson".to_string(),
            email: "sarah@example.com".to_string(),
            title: "Senior Software Engineer".to_string(),
            company: "Tech Corp".to_string(),
            bio: "Experienced full-stack developer with expertise in React and Node.js".to_string(),
            skills: vec![
                skill("React", ExpertiseLevel::Expert, 6, &["React Certified Developer"]),
                skill("Node.js", ExpertiseLevel::Expert, 5, &[]),
            ],
            total_experience_years: 8,
            availability: vec![
                slot(1, "09:00", "17:00", "UTC-8"),
                slot(3, "09:00", "17:00", "UTC-8"),
            ],
            hourly_rate: 150.0,
            currency: "USD".to_string(),
            rating: 4.8,
            total_sessions: 127,
            success_rate: 0.91,
            response_time_hours: 4.0,
            languages: vec!["English".to_string(), "Spanish".to_string()],
            max_participants: 5,
            session_types: vec![SessionType::OneOnOne, SessionType::Group],
            is_active: true,
            can_accept_new_clients: true,
        },
        ProviderProfile {
            provider_id: "coach_2".to_string(),
            user_id: "user_2".to_string(),
            first_name: "Michael".to_string(),
            last_name: "Chen".to_string(),
            email: "michael@example.com".to_string(),
            title: "Product Manager".to_string(),
            company: "Innovation Labs".to_string(),
            bio: "Product strategy expert with agile methodologies expertise".to_string(),
            skills: vec![
                skill("Product Strategy", ExpertiseLevel::Expert, 7, &["Certified Product Manager"]),
                skill("Agile", ExpertiseLevel::Expert, 6, &["Scrum Master"]),
            ],
            total_experience_years: 10,
            availability: vec![slot(2, "10:00", "18:00", "UTC-8")],
            hourly_rate: 120.0,
            currency: "USD".to_string(),
            rating: 4.9,
            total_sessions: 89,
            success_rate: 0.94,
            response_time_hours: 2.0,
            languages: vec!["English".to_string(), "Mandarin".to_string()],
            max_participants: 10,
            session_types: vec![SessionType::Group, SessionType::Workshop],
            is_active: true,
            can_accept_new_clients: true,
        },
    ]
}
