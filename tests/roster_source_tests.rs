// HTTP roster source tests against a mock upstream

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use coach_match::core::{FreshSource, RefreshOutcome, RosterManager, RosterOrigin, RosterSettings};
use coach_match::models::{ExpertiseLevel, SessionType};
use coach_match::services::{CacheKey, HttpRosterSource, MemoryCache, RosterCache, RosterSource, RosterSourceError};

fn source_for(server: &mockito::Server) -> HttpRosterSource {
    HttpRosterSource::new(format!("{}/api", server.url()), Duration::from_secs(2)).unwrap()
}

fn coaches_body() -> String {
    json!({
        "data": [
            {
                "id": "c-1",
                "firstName": "Ada",
                "lastName": "Byron",
                "expertise": [
                    { "subcategory": "Leadership", "level": "master", "yearsExperience": 12 },
                    { "subcategory": "Strategy", "level": "expert", "yearsExperience": 4 }
                ],
                "availability": [{ "dayOfWeek": 0 }, { "dayOfWeek": 3, "startTime": "13:00" }],
                "hourlyRate": 180.0,
                "metrics": { "averageRating": 4.7, "totalSessions": 40, "successRate": 0.9 },
                "languages": ["English", "French"]
            },
            { "firstName": "Missing id" },
            { "id": "c-2" }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_fetch_maps_upstream_records() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/coaches")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(coaches_body())
        .create_async()
        .await;

    let providers = source_for(&server).fetch_roster().await.unwrap();
    mock.assert_async().await;

    // The record without an id is skipped
    assert_eq!(providers.len(), 2);

    let ada = &providers[0];
    assert_eq!(ada.provider_id, "c-1");
    assert_eq!(ada.full_name(), "Ada Byron");
    assert_eq!(ada.total_experience_years, 12);
    assert_eq!(ada.skills[0].level, ExpertiseLevel::Master);
    assert_eq!(ada.available_days().into_iter().collect::<Vec<_>>(), vec![0, 3]);
    assert_eq!(ada.availability[1].start_time, "13:00");
    assert_eq!(ada.hourly_rate, 180.0);
    assert_eq!(ada.rating, 4.7);
    assert_eq!(ada.session_types, vec![SessionType::OneOnOne]);

    let sparse = &providers[1];
    assert_eq!(sparse.provider_id, "c-2");
    assert_eq!(sparse.hourly_rate, 100.0);
    assert_eq!(sparse.languages, vec!["English"]);
    assert!(sparse.availability.is_empty());
}

#[tokio::test]
async fn test_fetch_reports_http_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/coaches")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let err = source_for(&server).fetch_roster().await.unwrap_err();
    assert!(matches!(err, RosterSourceError::ApiError(_)));
}

#[tokio::test]
async fn test_fetch_requires_data_array() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/coaches")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"coaches": []}"#)
        .create_async()
        .await;

    let err = source_for(&server).fetch_roster().await.unwrap_err();
    assert!(matches!(err, RosterSourceError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_fetch_rejects_empty_roster() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/coaches")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"firstName": "No id"}]}"#)
        .create_async()
        .await;

    let err = source_for(&server).fetch_roster().await.unwrap_err();
    assert!(matches!(err, RosterSourceError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_fetch_connection_refused() {
    let source = HttpRosterSource::new("http://127.0.0.1:1/api", Duration::from_secs(2)).unwrap();
    let err = source.fetch_roster().await.unwrap_err();
    assert!(matches!(
        err,
        RosterSourceError::RequestError(_) | RosterSourceError::Timeout(_)
    ));
}

#[tokio::test]
async fn test_roster_manager_fills_cache_from_upstream() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/coaches")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(coaches_body())
        .expect(1)
        .create_async()
        .await;

    let cache = Arc::new(MemoryCache::default());
    let roster = RosterManager::new(cache.clone(), Arc::new(source_for(&server)), RosterSettings::default());

    assert_eq!(roster.refresh_if_stale().await, RefreshOutcome::Fresh(FreshSource::Upstream));
    assert_eq!(roster.refresh_if_stale().await, RefreshOutcome::Current);
    mock.assert_async().await;

    let snapshot = roster.snapshot().await;
    assert_eq!(snapshot.origin, RosterOrigin::Upstream);
    assert_eq!(snapshot.providers.len(), 2);

    let keys = cache.list_keys(CacheKey::PROVIDER_PREFIX).await.unwrap();
    assert_eq!(keys, vec!["provider:c-1", "provider:c-2"]);
}
