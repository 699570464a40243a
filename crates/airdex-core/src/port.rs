use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::cache::{CacheConfig, CacheMode, CacheStats, TtlCache};
use crate::circuit_breaker::{CircuitSnapshot, CircuitState};
use crate::domain::{Airport, IcaoCode};
use crate::error::{LookupError, LookupErrorKind};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::pipeline::ResiliencePipeline;
use crate::provider;
use crate::timezone::TimezoneResolver;

/// Inbound port for airport metadata lookups.
pub trait AviationDataPort: Send + Sync {
    /// Resolve one airport by its validated ICAO code.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] classified by [`LookupErrorKind`]:
    /// `NotFound` when the provider has no record, `UpstreamFault` once
    /// retries are exhausted, `CircuitOpen` or `RateLimited` when the
    /// resilience stages refuse the call, and `MappingError` when the record
    /// cannot be turned into an [`Airport`].
    fn airport_by_icao<'a>(
        &'a self,
        icao: &'a IcaoCode,
    ) -> Pin<Box<dyn Future<Output = Result<Airport, LookupError>> + Send + 'a>>;
}

/// Coarse health used by status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl From<CircuitState> for HealthState {
    fn from(value: CircuitState) -> Self {
        match value {
            CircuitState::Closed => Self::Healthy,
            CircuitState::HalfOpen => Self::Degraded,
            CircuitState::Open => Self::Unhealthy,
        }
    }
}

/// Runtime snapshot of the client and its resilience stages.
#[derive(Debug, Clone, Serialize)]
pub struct PortHealth {
    pub state: HealthState,
    pub circuit: CircuitSnapshot,
    pub cache: CacheStats,
    pub cached_airports: usize,
    pub timezone_memo: CacheStats,
}

/// Join a base URL and an endpoint path with exactly one `/` between them.
pub fn join_endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        path.trim().trim_start_matches('/')
    )
}

/// [`AviationDataPort`] backed by the aviation REST API.
///
/// Clones share the cache, breaker and limiter.
#[derive(Clone)]
pub struct AviationApiClient {
    http: Arc<dyn HttpClient>,
    pipeline: ResiliencePipeline,
    cache: TtlCache<IcaoCode, Airport>,
    timezones: TimezoneResolver,
    endpoint: String,
    cache_mode: CacheMode,
}

impl std::fmt::Debug for AviationApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AviationApiClient")
            .field("endpoint", &self.endpoint)
            .field("pipeline", &self.pipeline)
            .field("cache", &self.cache.config())
            .field("cache_mode", &self.cache_mode)
            .finish_non_exhaustive()
    }
}

impl AviationApiClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        pipeline: ResiliencePipeline,
        timezones: TimezoneResolver,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http,
            pipeline,
            cache: TtlCache::new(CacheConfig::default()),
            timezones,
            endpoint: endpoint.into(),
            cache_mode: CacheMode::Use,
        }
    }

    /// Replace the airport cache with a fresh one using `config`.
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.cache = TtlCache::new(config);
        self
    }

    /// A handle sharing all state but applying `mode` to its lookups.
    pub fn with_cache_mode(&self, mode: CacheMode) -> Self {
        Self {
            cache_mode: mode,
            ..self.clone()
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub const fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    pub fn pipeline(&self) -> &ResiliencePipeline {
        &self.pipeline
    }

    /// Validate a raw key, then look it up.
    pub async fn lookup(&self, raw: &str) -> Result<Airport, LookupError> {
        let icao = IcaoCode::parse(raw)?;
        self.airport_by_icao(&icao).await
    }

    /// Look up several raw keys concurrently; results keep input order.
    pub async fn lookup_many<I, S>(&self, raw_codes: I) -> Vec<(String, Result<Airport, LookupError>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handles: Vec<(String, JoinHandle<Result<Airport, LookupError>>)> = raw_codes
            .into_iter()
            .map(|raw| {
                let raw = raw.into();
                let client = self.clone();
                let key = raw.clone();
                (raw, tokio::spawn(async move { client.lookup(&key).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (raw, handle) in handles {
            let result = handle.await.unwrap_or_else(|e| {
                Err(LookupError::upstream_terminal(format!(
                    "lookup task for '{raw}' failed: {e}"
                )))
            });
            results.push((raw, result));
        }
        results
    }

    pub async fn health(&self) -> PortHealth {
        let circuit = self.pipeline.breaker().snapshot();
        PortHealth {
            state: circuit.state.into(),
            circuit,
            cache: self.cache.stats(),
            cached_airports: self.cache.len().await,
            timezone_memo: self.timezones.memo_stats(),
        }
    }

    pub async fn invalidate(&self, icao: &IcaoCode) -> bool {
        self.cache.invalidate(icao).await
    }

    /// Periodically purge expired airports from the shared cache.
    pub fn spawn_cache_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.cache.spawn_sweeper(interval)
    }

    async fn fetch(&self, icao: &IcaoCode) -> Result<Airport, LookupError> {
        tracing::info!(icao = %icao, mode = self.cache_mode.as_str(), "fetching airport from aviation API");

        let body = self.pipeline.execute(|| self.request(icao)).await?;
        let record = provider::decode_record(icao, &body)?;
        let position = record.coordinates()?;
        let timezone_id = self.timezones.resolve(position.0, position.1).await;
        record.into_airport(icao, position, timezone_id)
    }

    async fn request(&self, icao: &IcaoCode) -> Result<String, LookupError> {
        let request = HttpRequest::get(self.endpoint.as_str())
            .with_header("Accept", "application/json")
            .with_query("apt", icao.as_str())
            .with_timeout(self.pipeline.attempt_timeout());

        let response = self.http.execute(request).await.map_err(|e| {
            LookupError::upstream(format!("aviation API transport error: {}", e.message()))
        })?;
        classify(icao, response)
    }
}

/// Map an upstream response onto the lookup error taxonomy.
fn classify(icao: &IcaoCode, response: HttpResponse) -> Result<String, LookupError> {
    match response.status {
        200..=299 => Ok(response.body),
        404 => Err(LookupError::not_found(icao)),
        status @ (400 | 422) => Err(LookupError::invalid_key(format!(
            "aviation API rejected ICAO code {icao} with status {status}"
        ))),
        429 => Err(LookupError::rate_limited(
            "aviation API answered 429 Too Many Requests",
        )),
        status @ 500..=599 => Err(LookupError::upstream(format!(
            "aviation API returned status {status}"
        ))),
        status => Err(LookupError::upstream_terminal(format!(
            "aviation API returned unexpected status {status}"
        ))),
    }
}

impl AviationDataPort for AviationApiClient {
    fn airport_by_icao<'a>(
        &'a self,
        icao: &'a IcaoCode,
    ) -> Pin<Box<dyn Future<Output = Result<Airport, LookupError>> + Send + 'a>> {
        Box::pin(async move {
            let started = Instant::now();
            let result = self
                .cache
                .get_or_fetch(icao.clone(), self.cache_mode, || self.fetch(icao))
                .await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(airport) => {
                    tracing::info!(icao = %icao, name = airport.name(), elapsed_ms, "airport lookup succeeded");
                }
                Err(error) if error.kind() == LookupErrorKind::MappingError => {
                    tracing::error!(icao = %icao, %error, "could not map aviation API record");
                }
                Err(error) => {
                    tracing::warn!(icao = %icao, kind = %error.kind(), %error, elapsed_ms, "airport lookup failed");
                }
            }
            result
        })
    }
}
