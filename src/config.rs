use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::core::error::ConfigValidationError;
use crate::core::roster::RosterSettings;
use crate::models::{NormalizedWeights, ScoringWeights};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub cache: CacheSettings,
    pub roster: RosterSourceSettings,
    pub matching: MatchingSettings,
    pub scoring: ScoringSettings,
    pub queue: QueueSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub redis_url: String,
    pub l1_cache_size: u64,
    pub provider_ttl_secs: u64,
    pub result_ttl_secs: u64,
    pub operation_timeout_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            l1_cache_size: 10_000,
            provider_ttl_secs: 3600,
            result_ttl_secs: 3600,
            operation_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RosterSourceSettings {
    pub source_url: String,
    pub fetch_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub retry_backoff_secs: u64,
    pub sample_fallback: bool,
}

impl Default for RosterSourceSettings {
    fn default() -> Self {
        Self {
            source_url: "http://backend:3001/api".to_string(),
            fetch_timeout_secs: 10,
            refresh_interval_secs: 1800,
            retry_backoff_secs: 60,
            sample_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub algorithm_version: String,
    pub min_match_score: f64,
    pub max_results: usize,
    pub stats_capacity: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            algorithm_version: "1.0.0".to_string(),
            min_match_score: 0.6,
            max_results: 10,
            stats_capacity: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_skill_weight")]
    pub skill: f64,
    #[serde(default = "default_experience_weight")]
    pub experience: f64,
    #[serde(default = "default_availability_weight")]
    pub availability: f64,
    #[serde(default = "default_price_weight")]
    pub price: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            skill: default_skill_weight(),
            experience: default_experience_weight(),
            availability: default_availability_weight(),
            price: default_price_weight(),
            rating: default_rating_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        ScoringWeights {
            skill: config.skill,
            experience: config.experience,
            availability: config.availability,
            price: config.price,
            rating: config.rating,
        }
    }
}

fn default_skill_weight() -> f64 { 0.30 }
fn default_experience_weight() -> f64 { 0.25 }
fn default_availability_weight() -> f64 { 0.15 }
fn default_price_weight() -> f64 { 0.10 }
fn default_rating_weight() -> f64 { 0.20 }

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub capacity: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

/// Engine configuration, fixed for the life of the process
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub weights: NormalizedWeights,
    pub min_match_score: f64,
    pub max_results: usize,
    pub algorithm_version: String,
    pub result_ttl: Duration,
    pub stats_capacity: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let matching = MatchingSettings::default();
        Self {
            weights: NormalizedWeights::default(),
            min_match_score: matching.min_match_score,
            max_results: matching.max_results,
            algorithm_version: matching.algorithm_version,
            result_ttl: Duration::from_secs(CacheSettings::default().result_ttl_secs),
            stats_capacity: matching.stats_capacity,
        }
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, config/local.toml)
    /// 3. Environment variables (prefixed with MATCHING__)
    /// 4. Flat variables of the previous deployment (REDIS_URL, MIN_MATCH_SCORE, ...)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // e.g., MATCHING__SCORING__WEIGHTS__SKILL -> scoring.weights.skill
            .add_source(env_source())
            .build()?;

        let settings = apply_legacy_overrides(settings, |name| std::env::var(name).ok())?;

        settings.try_deserialize()
    }

    /// Validate the matching section and freeze it
    pub fn matching_config(&self) -> Result<MatchingConfig, ConfigValidationError> {
        let weights = ScoringWeights::from(&self.scoring.weights).normalize()?;

        let min = self.matching.min_match_score;
        if !min.is_finite() || !(0.0..=1.0).contains(&min) {
            return Err(ConfigValidationError::InvalidSetting {
                name: "matching.min_match_score",
                reason: format!("must be within [0, 1], got {}", min),
            });
        }
        if self.matching.max_results == 0 {
            return Err(ConfigValidationError::InvalidSetting {
                name: "matching.max_results",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.matching.stats_capacity == 0 {
            return Err(ConfigValidationError::InvalidSetting {
                name: "matching.stats_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.queue.capacity == 0 {
            return Err(ConfigValidationError::InvalidSetting {
                name: "queue.capacity",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(MatchingConfig {
            weights,
            min_match_score: min,
            max_results: self.matching.max_results,
            algorithm_version: self.matching.algorithm_version.clone(),
            result_ttl: Duration::from_secs(self.cache.result_ttl_secs),
            stats_capacity: self.matching.stats_capacity,
        })
    }

    pub fn roster_settings(&self) -> RosterSettings {
        RosterSettings {
            refresh_interval: Duration::from_secs(self.roster.refresh_interval_secs),
            retry_backoff: Duration::from_secs(self.roster.retry_backoff_secs),
            fetch_timeout: Duration::from_secs(self.roster.fetch_timeout_secs),
            provider_ttl: Duration::from_secs(self.cache.provider_ttl_secs),
            sample_fallback: self.roster.sample_fallback,
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("MATCHING")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Flat variable names and the keys they override
const LEGACY_VARS: &[(&str, &str)] = &[
    ("REDIS_URL", "cache.redis_url"),
    ("BACKEND_API_URL", "roster.source_url"),
    ("MAX_MATCHES_PER_REQUEST", "matching.max_results"),
    ("MIN_MATCH_SCORE", "matching.min_match_score"),
    ("SKILL_MATCH_WEIGHT", "scoring.weights.skill"),
    ("EXPERIENCE_WEIGHT", "scoring.weights.experience"),
    ("AVAILABILITY_WEIGHT", "scoring.weights.availability"),
    ("PRICE_WEIGHT", "scoring.weights.price"),
    ("RATING_WEIGHT", "scoring.weights.rating"),
    ("COACH_DATA_TTL", "cache.provider_ttl_secs"),
    ("REFRESH_COACH_DATA_INTERVAL", "roster.refresh_interval_secs"),
];

/// Apply the flat environment variables on top of the layered config
fn apply_legacy_overrides<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(settings);

    for (var, key) in LEGACY_VARS {
        if let Some(value) = lookup(var) {
            builder = builder.set_override(*key, value)?;
        }
    }

    builder.build()
}
