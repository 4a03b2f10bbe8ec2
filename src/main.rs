use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coach_match::config::{LoggingSettings, Settings};
use coach_match::core::{MatchRanker, RosterManager, StatsAggregator};
use coach_match::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use coach_match::services::{
    CacheManager, HttpRosterSource, LogPublisher, LogStatsSink, MatchQueue, MemoryCache, QueueWorker, RosterCache,
    StatsSink,
};

fn init_logging(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(message: String) -> std::io::Error {
    error!("{}", message);
    std::io::Error::other(message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings.as_ref().map(|s| s.logging.clone()).unwrap_or_default();
    init_logging(&logging);

    info!("Starting coach matching service...");

    let settings = settings.map_err(|e| startup_error(format!("Failed to load configuration: {}", e)))?;

    // Invalid weights or thresholds are fatal before the server binds
    let matching = settings
        .matching_config()
        .map_err(|e| startup_error(format!("Invalid matching configuration: {}", e)))?;
    let matching = Arc::new(matching);

    info!("Matching configured with weights: {:?}", matching.weights.get());

    // Redis is optional; an in-process cache keeps the service running
    let (cache, sink): (Arc<dyn RosterCache>, Arc<dyn StatsSink>) = match CacheManager::new(
        &settings.cache.redis_url,
        settings.cache.l1_cache_size,
        Duration::from_secs(settings.cache.provider_ttl_secs),
        Duration::from_millis(settings.cache.operation_timeout_ms),
        matching.stats_capacity,
    )
    .await
    {
        Ok(manager) => {
            info!(
                "Cache manager initialized (L1: {} entries)",
                settings.cache.l1_cache_size
            );
            let manager = Arc::new(manager);
            let cache: Arc<dyn RosterCache> = manager.clone();
            let sink: Arc<dyn StatsSink> = manager;
            (cache, sink)
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), using in-process cache", e);
            let cache: Arc<dyn RosterCache> = Arc::new(MemoryCache::new(settings.cache.l1_cache_size));
            let sink: Arc<dyn StatsSink> = Arc::new(LogStatsSink);
            (cache, sink)
        }
    };

    let source = HttpRosterSource::new(
        settings.roster.source_url.clone(),
        Duration::from_secs(settings.roster.fetch_timeout_secs),
    )
    .map_err(|e| startup_error(format!("Failed to create roster client: {}", e)))?;

    let roster = Arc::new(RosterManager::new(
        cache.clone(),
        Arc::new(source),
        settings.roster_settings(),
    ));
    let stats = Arc::new(StatsAggregator::new(
        matching.stats_capacity,
        matching.algorithm_version.clone(),
    ));
    let ranker = Arc::new(MatchRanker::new(
        matching.clone(),
        roster.clone(),
        cache.clone(),
        stats,
        sink,
    ));

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = roster.clone().spawn_refresher(shutdown_rx.clone());

    let (queue, queue_rx) = MatchQueue::new(settings.queue.capacity);
    let worker = QueueWorker::new(ranker.clone(), queue_rx, Arc::new(LogPublisher), shutdown_rx);
    let worker = tokio::spawn(worker.run());

    let app_state = AppState {
        ranker,
        cache,
        queue,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.max(1);

    info!("Starting HTTP server on {}:{}", host, port);

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await;

    info!("HTTP server stopped, shutting down background tasks");
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresher.await {
        warn!("Roster refresher ended abnormally: {}", e);
    }
    if let Err(e) = worker.await {
        warn!("Queue worker ended abnormally: {}", e);
    }

    result
}
