use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::core::{MatchError, MatchRanker};
use crate::models::{
    CachedMatchResults, CoachesResponse, ErrorResponse, HealthResponse, MatchingRequest, QueuedResponse,
    StatsResponse,
};
use crate::services::{get_json, CacheKey, MatchQueue, QueueError, RosterCache};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub ranker: Arc<MatchRanker>,
    pub cache: Arc<dyn RosterCache>,
    pub queue: MatchQueue,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/match", web::post().to(find_matches))
        .route("/match/async", web::post().to(submit_match))
        .route("/match/{request_id}", web::get().to(get_match_results))
        .route("/coaches", web::get().to(list_coaches))
        .route("/coaches/cache", web::delete().to(invalidate_coaches))
        .route("/coaches/{provider_id}/cache", web::delete().to(invalidate_coach))
        .route("/stats", web::get().to(get_stats));
}

fn error_json(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn match_error_response(err: &MatchError) -> HttpResponse {
    let status = match err {
        MatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        MatchError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        MatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_json(status, err.code(), err.to_string())
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let redis_healthy = state.cache.ping().await;
    let roster_loaded = !state.ranker.roster().snapshot().await.is_empty();

    let status = if redis_healthy && roster_loaded { "healthy" } else { "degraded" };

    let mut services = BTreeMap::new();
    services.insert(
        "cache".to_string(),
        if redis_healthy { "connected" } else { "disconnected" }.to_string(),
    );
    services.insert(
        "roster".to_string(),
        if roster_loaded { "loaded" } else { "empty" }.to_string(),
    );

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        services,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Synchronous matching
///
/// POST /api/v1/match
async fn find_matches(state: web::Data<AppState>, req: web::Json<MatchingRequest>) -> impl Responder {
    let request = req.into_inner();

    match state.ranker.match_request(&request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            tracing::info!(request_id = %request.request_id, "Matching request rejected: {}", e);
            match_error_response(&e)
        }
    }
}

/// Queue a request for asynchronous matching
///
/// POST /api/v1/match/async
///
/// Results can be fetched from `GET /api/v1/match/{request_id}` once processed.
async fn submit_match(state: web::Data<AppState>, req: web::Json<MatchingRequest>) -> impl Responder {
    let request = req.into_inner();
    if let Err(e) = request.check() {
        return match_error_response(&e);
    }

    match state.queue.submit(&request) {
        Ok(()) => HttpResponse::Accepted().json(QueuedResponse {
            request_id: request.request_id,
            status: "queued".to_string(),
        }),
        Err(QueueError::Full) => error_json(
            StatusCode::SERVICE_UNAVAILABLE,
            "queue_full",
            "Matching queue is full, retry later".to_string(),
        ),
        Err(e) => {
            tracing::error!("Failed to queue matching request: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "queue_error", e.to_string())
        }
    }
}

/// Cached results for a processed request
///
/// GET /api/v1/match/{request_id}
async fn get_match_results(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let request_id = path.into_inner();
    let key = CacheKey::match_result(&request_id);

    match get_json::<CachedMatchResults>(state.cache.as_ref(), &key).await {
        Ok(Some(results)) => HttpResponse::Ok().json(results),
        Ok(None) => error_json(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("No results for request {}", request_id),
        ),
        Err(e) => {
            tracing::error!("Failed to read cached results for {}: {}", request_id, e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "cache_error", e.to_string())
        }
    }
}

/// Eligible providers in the current roster
///
/// GET /api/v1/coaches
async fn list_coaches(state: web::Data<AppState>) -> impl Responder {
    let roster = state.ranker.roster();
    roster.refresh_if_stale().await;
    let coaches = roster.snapshot().await.eligible();

    HttpResponse::Ok().json(CoachesResponse {
        count: coaches.len(),
        coaches,
    })
}

/// Drop cached providers; the next request refreshes the roster
///
/// DELETE /api/v1/coaches/cache
async fn invalidate_coaches(state: web::Data<AppState>) -> impl Responder {
    match state.ranker.roster().invalidate().await {
        Ok(count) => HttpResponse::Ok().json(serde_json::json!({
            "invalidated": count,
        })),
        Err(e) => {
            tracing::error!("Failed to invalidate provider cache: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "cache_error", e.to_string())
        }
    }
}

/// Drop one cached provider
///
/// DELETE /api/v1/coaches/{provider_id}/cache
async fn invalidate_coach(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let provider_id = path.into_inner();
    match state.ranker.roster().invalidate_provider(&provider_id).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "invalidated": provider_id,
        })),
        Err(e) => {
            tracing::error!("Failed to invalidate provider {}: {}", provider_id, e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "cache_error", e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
}

fn default_window_minutes() -> i64 { 60 }

/// One year
const MAX_WINDOW_MINUTES: i64 = 525_600;

/// Engine statistics
///
/// GET /api/v1/stats?window_minutes=60
async fn get_stats(state: web::Data<AppState>, query: web::Query<StatsQuery>) -> impl Responder {
    if query.window_minutes <= 0 {
        return error_json(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            "window_minutes must be positive".to_string(),
        );
    }

    let stats = state.ranker.stats();
    let snapshot = state.ranker.roster().snapshot().await;
    let recent = stats
        .samples_since(chrono::Duration::minutes(query.window_minutes.min(MAX_WINDOW_MINUTES)))
        .await;

    HttpResponse::Ok().json(StatsResponse {
        stats: stats.snapshot().await,
        active_coaches: snapshot.providers.iter().filter(|p| p.is_eligible()).count(),
        roster_origin: snapshot.origin.to_string(),
        recent_samples: recent.len(),
        window_minutes: query.window_minutes,
    })
}
