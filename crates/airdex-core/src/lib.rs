//! # Airdex Core
//!
//! Resilient airport metadata lookups by ICAO code.
//!
//! ## Overview
//!
//! - **Domain model**: validated [`IcaoCode`] keys and immutable [`Airport`] entities
//! - **Coordinate parsing** for the provider's arc-second and dashed DMS encodings
//! - **Timezone resolution** from coordinates, with a `UTC` fallback
//! - **Resilience pipeline**: circuit breaker, retry, rate limiter and per-attempt timeout
//! - **Cache-aside** storage with insertion TTL and a size bound
//! - **Aviation data port** and its REST-backed implementation
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL cache with cache modes and counters |
//! | [`circuit_breaker`] | Count-based sliding-window breaker |
//! | [`config`] | Client configuration from defaults, JSON and environment |
//! | [`coordinates`] | Provider coordinate encodings to decimal degrees |
//! | [`domain`] | `IcaoCode` and `Airport` |
//! | [`error`] | Validation errors and the lookup error taxonomy |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`pipeline`] | Composition of the resilience stages |
//! | [`port`] | `AviationDataPort` and `AviationApiClient` |
//! | [`provider`] | Aviation API payload decoding |
//! | [`retry`] | Bounded retry with backoff |
//! | [`throttling`] | Token-bucket rate limiting |
//! | [`timezone`] | Coordinate to IANA zone resolution |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use airdex_core::{AviationConfig, AviationDataPort, IcaoCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AviationConfig::load(None)?.build_default_client()?;
//!
//!     let icao = IcaoCode::parse("KJFK")?;
//!     let airport = client.airport_by_icao(&icao).await?;
//!     println!("{} ({:?})", airport.name(), airport.timezone_id());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / caller   │
//! └────────┬────────┘
//!          │ IcaoCode
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ AviationApiClient│───▶│ TtlCache (hit)   │
//! └────────┬────────┘     └──────────────────┘
//!          │ miss
//!          ▼
//! ┌─────────────────┐
//! │ CircuitBreaker  │
//! │  └ RetryPolicy  │
//! │    └ RateLimiter│
//! │      └ timeout  │
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ HttpClient      │     │ TimezoneResolver │
//! └────────┬────────┘     └────────▲─────────┘
//!          │ body                  │ lat/lon
//!          ▼                       │
//! ┌─────────────────┐──────────────┘
//! │ provider mapping│
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Lookups fail with a [`LookupError`] whose kind and origin decide retry and breaker
//! treatment:
//!
//! ```rust
//! use airdex_core::{LookupError, LookupErrorKind};
//!
//! fn describe(error: &LookupError) -> &'static str {
//!     match error.kind() {
//!         LookupErrorKind::NotFound => "unknown airport",
//!         LookupErrorKind::CircuitOpen | LookupErrorKind::RateLimited => "try again later",
//!         LookupErrorKind::UpstreamFault => "provider unavailable",
//!         LookupErrorKind::InvalidKey => "bad ICAO code",
//!         LookupErrorKind::MappingError => "provider sent unusable data",
//!     }
//! }
//! ```

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod coordinates;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod pipeline;
pub mod port;
pub mod provider;
pub mod retry;
pub mod throttling;
pub mod timezone;

// Caching
pub use cache::{CacheConfig, CacheMode, CacheStats, TtlCache};

// Circuit breaker
pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState,
};

// Configuration
pub use config::{AviationConfig, ConfigError};

// Coordinates
pub use coordinates::{parse_arc_seconds, parse_dms, Angle, Axis, CoordinateError, CoordinateFormat};

// Domain models
pub use domain::{Airport, AirportBuilder, IcaoCode};

// Error types
pub use error::{LookupError, LookupErrorKind, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Resilience
pub use pipeline::ResiliencePipeline;
pub use retry::{Backoff, RetryPolicy};
pub use throttling::{RateLimiter, RateLimiterConfig};

// Port
pub use port::{AviationApiClient, AviationDataPort, HealthState, PortHealth};

// Timezones
pub use timezone::{
    BoundaryError, BoundaryIndex, TimezoneResolver, TzfZoneLookup, ZoneLookup, FALLBACK_ZONE,
};
