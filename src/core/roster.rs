use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::core::sample::sample_roster;
use crate::models::ProviderProfile;
use crate::services::cache::{get_json, set_json, CacheError, CacheKey, RosterCache};
use crate::services::roster_source::{RosterSource, RosterSourceError};

/// Where the roster currently held in memory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterOrigin {
    /// Nothing has been loaded yet
    Empty,
    Cache,
    Upstream,
    BuiltInSample,
}

impl RosterOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            RosterOrigin::Empty => "empty",
            RosterOrigin::Cache => "cache",
            RosterOrigin::Upstream => "upstream",
            RosterOrigin::BuiltInSample => "built_in_sample",
        }
    }
}

impl fmt::Display for RosterOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshSource {
    Cache,
    Upstream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackSource {
    /// Kept the previous in-memory roster
    Retained,
    BuiltInSample,
}

/// Result of one pass through the refresh state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Roster is within its refresh interval, or a retry is not yet due
    Current,
    Fresh(FreshSource),
    Fallback(FallbackSource),
    /// No source produced providers and no fallback is available
    Exhausted,
}

/// Immutable roster view; replaced wholesale on refresh
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    pub providers: Vec<ProviderProfile>,
    pub origin: RosterOrigin,
    pub loaded_at: DateTime<Utc>,
}

impl RosterSnapshot {
    fn empty() -> Self {
        Self {
            providers: Vec::new(),
            origin: RosterOrigin::Empty,
            loaded_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Active providers that accept new clients, in roster order
    pub fn eligible(&self) -> Vec<ProviderProfile> {
        self.providers
            .iter()
            .filter(|p| p.is_eligible())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RosterSettings {
    pub refresh_interval: Duration,
    pub retry_backoff: Duration,
    pub fetch_timeout: Duration,
    pub provider_ttl: Duration,
    pub sample_fallback: bool,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(1800),
            retry_backoff: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
            provider_ttl: Duration::from_secs(3600),
            sample_fallback: true,
        }
    }
}

#[derive(Debug, Default)]
struct RefreshState {
    last_fresh: Option<Instant>,
    last_attempt: Option<Instant>,
}

impl RefreshState {
    fn is_due(&self, now: Instant, settings: &RosterSettings, have_roster: bool) -> bool {
        let stale = match self.last_fresh {
            Some(at) => now.duration_since(at) >= settings.refresh_interval,
            None => true,
        };
        if !stale {
            return false;
        }
        // Failed refreshes are retried no faster than the backoff while a
        // roster is available to serve from
        match self.last_attempt {
            Some(at) if have_roster => now.duration_since(at) >= settings.retry_backoff,
            _ => true,
        }
    }
}

/// Keeps the provider roster current.
///
/// Readers take an `Arc` snapshot and never observe a half-built roster.
/// Refreshes are single-flight: the refresh mutex is held for the whole pass.
/// Staleness is checked before taking it, so callers are not queued behind a
/// refresh they do not need, and checked again once it is acquired.
pub struct RosterManager {
    cache: Arc<dyn RosterCache>,
    source: Arc<dyn RosterSource>,
    settings: RosterSettings,
    snapshot: RwLock<Arc<RosterSnapshot>>,
    state: RwLock<RefreshState>,
    refresh: Mutex<()>,
}

impl RosterManager {
    pub fn new(cache: Arc<dyn RosterCache>, source: Arc<dyn RosterSource>, settings: RosterSettings) -> Self {
        Self {
            cache,
            source,
            settings,
            snapshot: RwLock::new(Arc::new(RosterSnapshot::empty())),
            state: RwLock::new(RefreshState::default()),
            refresh: Mutex::new(()),
        }
    }

    /// Current roster snapshot without triggering a refresh
    pub async fn snapshot(&self) -> Arc<RosterSnapshot> {
        self.snapshot.read().await.clone()
    }

    async fn install(&self, providers: Vec<ProviderProfile>, origin: RosterOrigin) {
        let next = Arc::new(RosterSnapshot {
            providers,
            origin,
            loaded_at: Utc::now(),
        });
        *self.snapshot.write().await = next;
    }

    /// Refresh the roster if it is stale
    pub async fn refresh_if_stale(&self) -> RefreshOutcome {
        if !self.is_due().await {
            return RefreshOutcome::Current;
        }

        let _guard = self.refresh.lock().await;
        let have_roster = !self.snapshot().await.is_empty();
        let now = Instant::now();
        {
            let mut state = self.state.write().await;
            if !state.is_due(now, &self.settings, have_roster) {
                return RefreshOutcome::Current;
            }
            state.last_attempt = Some(now);
        }

        // (a) cache
        match self.load_from_cache().await {
            Ok(providers) if !providers.is_empty() => {
                tracing::info!("Loaded {} providers from cache", providers.len());
                self.install(providers, RosterOrigin::Cache).await;
                self.state.write().await.last_fresh = Some(now);
                return RefreshOutcome::Fresh(FreshSource::Cache);
            }
            Ok(_) => tracing::debug!("Provider cache is empty"),
            Err(e) => tracing::warn!("Failed to read providers from cache: {}", e),
        }

        // (b) upstream
        match self.fetch_upstream().await {
            Ok(providers) => {
                self.write_back(&providers).await;
                tracing::info!("Loaded {} providers from upstream", providers.len());
                self.install(providers, RosterOrigin::Upstream).await;
                self.state.write().await.last_fresh = Some(now);
                return RefreshOutcome::Fresh(FreshSource::Upstream);
            }
            Err(e) => tracing::warn!("Failed to fetch roster from upstream: {}", e),
        }

        // (c) fallback; the freshness clock is left untouched
        if have_roster {
            tracing::warn!("Roster refresh failed, keeping previous roster");
            return RefreshOutcome::Fallback(FallbackSource::Retained);
        }
        if self.settings.sample_fallback {
            tracing::warn!("Roster refresh failed, using built-in sample roster");
            self.install(sample_roster(), RosterOrigin::BuiltInSample).await;
            return RefreshOutcome::Fallback(FallbackSource::BuiltInSample);
        }

        tracing::error!("Roster refresh failed and no fallback roster is available");
        RefreshOutcome::Exhausted
    }

    async fn is_due(&self) -> bool {
        let have_roster = !self.snapshot().await.is_empty();
        self.state
            .read()
            .await
            .is_due(Instant::now(), &self.settings, have_roster)
    }

    async fn load_from_cache(&self) -> Result<Vec<ProviderProfile>, CacheError> {
        let mut keys = self.cache.list_keys(CacheKey::PROVIDER_PREFIX).await?;
        keys.sort();

        let mut providers = Vec::with_capacity(keys.len());
        for key in keys {
            match get_json::<ProviderProfile>(self.cache.as_ref(), &key).await {
                Ok(Some(provider)) => providers.push(provider),
                // Expired between listing and reading
                Ok(None) => {}
                Err(CacheError::SerializationError(e)) => {
                    tracing::warn!("Skipping undecodable cache entry {}: {}", key, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(providers)
    }

    async fn fetch_upstream(&self) -> Result<Vec<ProviderProfile>, RosterSourceError> {
        let timeout = self.settings.fetch_timeout;
        let providers = tokio::time::timeout(timeout, self.source.fetch_roster())
            .await
            .map_err(|_| RosterSourceError::Timeout(timeout))??;

        if providers.is_empty() {
            return Err(RosterSourceError::InvalidResponse("Upstream roster is empty".into()));
        }
        Ok(providers)
    }

    async fn write_back(&self, providers: &[ProviderProfile]) {
        for provider in providers {
            let key = CacheKey::provider(&provider.provider_id);
            if let Err(e) = set_json(self.cache.as_ref(), &key, provider, self.settings.provider_ttl).await {
                tracing::error!("Failed to cache provider {}: {}", provider.provider_id, e);
            }
        }
    }

    /// Drop every cached provider and force the next call to refresh
    pub async fn invalidate(&self) -> Result<usize, CacheError> {
        let _guard = self.refresh.lock().await;
        let keys = self.cache.list_keys(CacheKey::PROVIDER_PREFIX).await?;
        for key in &keys {
            self.cache.delete(key).await?;
        }
        *self.state.write().await = RefreshState::default();

        tracing::info!("Invalidated {} cached providers", keys.len());
        Ok(keys.len())
    }

    /// Drop one cached provider and force the next call to refresh
    pub async fn invalidate_provider(&self, provider_id: &str) -> Result<(), CacheError> {
        let _guard = self.refresh.lock().await;
        self.cache.delete(&CacheKey::provider(provider_id)).await?;
        *self.state.write().await = RefreshState::default();

        tracing::info!("Invalidated cached provider {}", provider_id);
        Ok(())
    }

    /// Run refreshes in the background until shutdown is signalled
    pub fn spawn_refresher(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.settings.retry_backoff.max(Duration::from_secs(1));
            let mut ticker = tokio::time::interval(period);
            tracing::info!("Starting roster refresher");

            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::info!("Shutdown signal received, stopping roster refresher");
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let outcome = self.refresh_if_stale().await;
                        if outcome != RefreshOutcome::Current {
                            tracing::debug!(?outcome, "Background roster refresh");
                        }
                    }
                }
            }
        })
    }
}
