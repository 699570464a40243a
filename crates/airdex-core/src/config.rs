//! Client configuration.
//!
//! Values start from defaults, are optionally replaced by a JSON file and
//! then by `AIRDEX_*` environment variables. [`AviationConfig::validate`]
//! runs last; every builder assumes a validated config.
//!
//! | Variable | Field |
//! |---|---|
//! | `AIRDEX_BASE_URL` | `base_url` |
//! | `AIRDEX_AIRPORTS_PATH` | `paths.airports` |
//! | `AIRDEX_TIMEOUT_SECONDS` | `timeout_seconds` |
//! | `AIRDEX_MAX_RETRIES` | `max_retries` |
//! | `AIRDEX_RETRY_DELAY_MILLIS` | `retry_delay_millis` |
//! | `AIRDEX_CACHE_TTL_MINUTES` | `cache_ttl_minutes` |
//! | `AIRDEX_CACHE_MAX_ENTRIES` | `cache_max_entries` |
//! | `AIRDEX_RATE_LIMIT_PERMITS` | `rate_limiter.limit_for_period` |
//! | `AIRDEX_TIMEZONE_BOUNDARIES` | `timezone_boundaries` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::http_client::{HttpClient, HttpError, ReqwestHttpClient};
use crate::pipeline::ResiliencePipeline;
use crate::port::{join_endpoint, AviationApiClient};
use crate::retry::RetryPolicy;
use crate::throttling::{RateLimiter, RateLimiterConfig};
use crate::timezone::{BoundaryError, BoundaryIndex, TimezoneResolver, TzfZoneLookup, ZoneLookup};

pub const DEFAULT_BASE_URL: &str = "https://api.aviationapi.com";
pub const AIRPORTS_PATH_KEY: &str = "airports";
const DEFAULT_AIRPORTS_PATH: &str = "/v1/airports";
/// Name shared by the breaker and limiter guarding the aviation API.
pub const UPSTREAM_NAME: &str = "aviation-api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Boundaries(#[from] BoundaryError),
    #[error("HTTP transport unavailable: {0}")]
    HttpClient(#[source] HttpError),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub sliding_window_size: usize,
    pub minimum_number_of_calls: usize,
    pub failure_rate_threshold: f64,
    pub slow_call_rate_threshold: f64,
    pub slow_call_duration_millis: u64,
    pub wait_duration_in_open_state_seconds: u64,
    pub permitted_calls_in_half_open_state: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        let defaults = CircuitBreakerConfig::default();
        Self {
            sliding_window_size: defaults.window_size,
            minimum_number_of_calls: defaults.minimum_calls,
            failure_rate_threshold: defaults.failure_rate_threshold,
            slow_call_rate_threshold: defaults.slow_call_rate_threshold,
            slow_call_duration_millis: defaults.slow_call_duration.as_millis() as u64,
            wait_duration_in_open_state_seconds: defaults.open_wait.as_secs(),
            permitted_calls_in_half_open_state: defaults.half_open_probes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimiterSettings {
    pub limit_for_period: u32,
    pub limit_refresh_period_seconds: u64,
    pub timeout_millis: u64,
}

impl Default for RateLimiterSettings {
    fn default() -> Self {
        let defaults = RateLimiterConfig::default();
        Self {
            limit_for_period: defaults.permits,
            limit_refresh_period_seconds: defaults.period.as_secs(),
            timeout_millis: defaults.max_wait.as_millis() as u64,
        }
    }
}

/// Settings for [`AviationApiClient`] and its resilience stages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AviationConfig {
    pub base_url: String,
    /// Bound on each upstream attempt.
    pub timeout_seconds: u64,
    /// Total attempts, including the first.
    pub max_retries: u32,
    pub retry_delay_millis: u64,
    pub cache_ttl_minutes: u64,
    pub cache_max_entries: usize,
    pub paths: BTreeMap<String, String>,
    pub circuit_breaker: CircuitBreakerSettings,
    pub rate_limiter: RateLimiterSettings,
    /// GeoJSON boundary file; the embedded `tzf-rs` data is used when unset.
    pub timezone_boundaries: Option<PathBuf>,
}

impl Default for AviationConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_seconds: 10,
            max_retries: 3,
            retry_delay_millis: 500,
            cache_ttl_minutes: 60,
            cache_max_entries: 1000,
            paths: BTreeMap::from([(
                AIRPORTS_PATH_KEY.to_owned(),
                DEFAULT_AIRPORTS_PATH.to_owned(),
            )]),
            circuit_breaker: CircuitBreakerSettings::default(),
            rate_limiter: RateLimiterSettings::default(),
            timezone_boundaries: None,
        }
    }
}

impl AviationConfig {
    /// Defaults, then `path` if given, then the environment; validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = var("AIRDEX_BASE_URL") {
            self.base_url = value.trim().to_owned();
        }
        if let Some(value) = var("AIRDEX_AIRPORTS_PATH") {
            self.paths
                .insert(AIRPORTS_PATH_KEY.to_owned(), value.trim().to_owned());
        }
        if let Some(value) = var("AIRDEX_TIMEZONE_BOUNDARIES") {
            self.timezone_boundaries = Some(PathBuf::from(value.trim()));
        }

        override_parsed(&var, "AIRDEX_TIMEOUT_SECONDS", &mut self.timeout_seconds)?;
        override_parsed(&var, "AIRDEX_MAX_RETRIES", &mut self.max_retries)?;
        override_parsed(&var, "AIRDEX_RETRY_DELAY_MILLIS", &mut self.retry_delay_millis)?;
        override_parsed(&var, "AIRDEX_CACHE_TTL_MINUTES", &mut self.cache_ttl_minutes)?;
        override_parsed(&var, "AIRDEX_CACHE_MAX_ENTRIES", &mut self.cache_max_entries)?;
        override_parsed(
            &var,
            "AIRDEX_RATE_LIMIT_PERMITS",
            &mut self.rate_limiter.limit_for_period,
        )?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::invalid("base_url", "must not be blank"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "base_url",
                format!("'{base_url}' must start with http:// or https://"),
            ));
        }
        if self.airports_path().is_none() {
            return Err(ConfigError::invalid(
                "paths",
                "an 'airports' entry is required",
            ));
        }

        for (field, value) in [
            ("timeout_seconds", self.timeout_seconds),
            ("max_retries", u64::from(self.max_retries)),
            ("cache_ttl_minutes", self.cache_ttl_minutes),
            ("cache_max_entries", self.cache_max_entries as u64),
            (
                "rate_limiter.limit_for_period",
                u64::from(self.rate_limiter.limit_for_period),
            ),
            (
                "rate_limiter.limit_refresh_period_seconds",
                self.rate_limiter.limit_refresh_period_seconds,
            ),
            (
                "circuit_breaker.sliding_window_size",
                self.circuit_breaker.sliding_window_size as u64,
            ),
            (
                "circuit_breaker.minimum_number_of_calls",
                self.circuit_breaker.minimum_number_of_calls as u64,
            ),
            (
                "circuit_breaker.permitted_calls_in_half_open_state",
                u64::from(self.circuit_breaker.permitted_calls_in_half_open_state),
            ),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }

        let breaker = &self.circuit_breaker;
        if breaker.minimum_number_of_calls > breaker.sliding_window_size {
            return Err(ConfigError::invalid(
                "circuit_breaker.minimum_number_of_calls",
                "must not exceed sliding_window_size",
            ));
        }
        for (field, rate) in [
            ("circuit_breaker.failure_rate_threshold", breaker.failure_rate_threshold),
            ("circuit_breaker.slow_call_rate_threshold", breaker.slow_call_rate_threshold),
        ] {
            if !(rate > 0.0 && rate <= 100.0) {
                return Err(ConfigError::invalid(field, format!("{rate} is not in (0, 100]")));
            }
        }
        Ok(())
    }

    pub fn airports_path(&self) -> Option<&str> {
        self.paths
            .get(AIRPORTS_PATH_KEY)
            .map(|path| path.trim())
            .filter(|path| !path.is_empty())
    }

    pub fn airports_endpoint(&self) -> Result<String, ConfigError> {
        let path = self
            .airports_path()
            .ok_or_else(|| ConfigError::invalid("paths", "an 'airports' entry is required"))?;
        Ok(join_endpoint(&self.base_url, path))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_retries,
            Duration::from_millis(self.retry_delay_millis),
        )
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        let settings = &self.circuit_breaker;
        CircuitBreakerConfig {
            window_size: settings.sliding_window_size,
            minimum_calls: settings.minimum_number_of_calls,
            failure_rate_threshold: settings.failure_rate_threshold,
            slow_call_rate_threshold: settings.slow_call_rate_threshold,
            slow_call_duration: Duration::from_millis(settings.slow_call_duration_millis),
            open_wait: Duration::from_secs(settings.wait_duration_in_open_state_seconds),
            half_open_probes: settings.permitted_calls_in_half_open_state,
        }
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            permits: self.rate_limiter.limit_for_period,
            period: Duration::from_secs(self.rate_limiter.limit_refresh_period_seconds),
            max_wait: Duration::from_millis(self.rate_limiter.timeout_millis),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60)),
            max_entries: self.cache_max_entries,
        }
    }

    pub fn build_pipeline(&self) -> ResiliencePipeline {
        ResiliencePipeline::new(
            Arc::new(CircuitBreaker::new(UPSTREAM_NAME, self.circuit_breaker_config())),
            self.retry_policy(),
            RateLimiter::new(UPSTREAM_NAME, self.rate_limiter_config()),
            self.attempt_timeout(),
        )
    }

    /// Boundary file engine when configured, otherwise the embedded data.
    pub fn zone_lookup(&self) -> Result<Arc<dyn ZoneLookup>, ConfigError> {
        match &self.timezone_boundaries {
            Some(path) => Ok(Arc::new(BoundaryIndex::load(path)?)),
            None => Ok(Arc::new(TzfZoneLookup::new())),
        }
    }

    /// Assemble a client over the given transport and timezone engine.
    pub fn build_client(
        &self,
        http: Arc<dyn HttpClient>,
        zones: Arc<dyn ZoneLookup>,
    ) -> Result<AviationApiClient, ConfigError> {
        self.validate()?;
        let timezones = TimezoneResolver::new(zones, self.cache_config());
        Ok(AviationApiClient::new(
            http,
            self.build_pipeline(),
            timezones,
            self.airports_endpoint()?,
        )
        .with_cache(self.cache_config()))
    }

    /// Production client: reqwest transport and the configured timezone engine.
    pub fn build_default_client(&self) -> Result<AviationApiClient, ConfigError> {
        let http =
            ReqwestHttpClient::new(self.attempt_timeout()).map_err(ConfigError::HttpClient)?;
        self.build_client(Arc::new(http), self.zone_lookup()?)
    }
}

fn override_parsed<T, V>(var: &V, name: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    V: Fn(&'static str) -> Option<String>,
{
    if let Some(value) = var(name) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { name, value })?;
    }
    Ok(())
}
