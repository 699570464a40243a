//! Coordinate to IANA timezone resolution.
//!
//! The geographic engine sits behind [`ZoneLookup`]. Two engines ship with
//! the crate:
//!
//! | Engine | Data |
//! |---|---|
//! | [`TzfZoneLookup`] | boundaries compiled into `tzf-rs` |
//! | [`BoundaryIndex`] | a GeoJSON file loaded at startup |
//!
//! [`TimezoneResolver`] memoizes engine answers and substitutes
//! [`FALLBACK_ZONE`] whenever a position is missing or unresolved.

mod boundary;

use std::convert::Infallible;
use std::sync::Arc;

pub use boundary::{BoundaryError, BoundaryIndex};

use crate::cache::{CacheConfig, CacheMode, CacheStats, TtlCache};

/// Zone reported when no better answer exists.
pub const FALLBACK_ZONE: &str = "UTC";

/// Geographic engine mapping a position to an IANA zone identifier.
pub trait ZoneLookup: Send + Sync {
    /// `None` when the position lies outside every known zone.
    fn zone_at(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// Engine backed by the boundary data embedded in `tzf-rs`.
pub struct TzfZoneLookup {
    finder: tzf_rs::DefaultFinder,
}

impl TzfZoneLookup {
    pub fn new() -> Self {
        Self {
            finder: tzf_rs::DefaultFinder::new(),
        }
    }
}

impl Default for TzfZoneLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TzfZoneLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TzfZoneLookup").finish_non_exhaustive()
    }
}

impl ZoneLookup for TzfZoneLookup {
    fn zone_at(&self, latitude: f64, longitude: f64) -> Option<String> {
        let name = self.finder.get_tz_name(longitude, latitude);
        (!name.is_empty()).then(|| name.to_owned())
    }
}

/// Exact bit pattern of a position, used as the memo key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordinateKey {
    latitude: u64,
    longitude: u64,
}

impl CoordinateKey {
    fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.to_bits(),
            longitude: longitude.to_bits(),
        }
    }
}

/// Memoizing resolver in front of a [`ZoneLookup`] engine.
///
/// Never fails: absent or unresolvable positions yield [`FALLBACK_ZONE`].
#[derive(Clone)]
pub struct TimezoneResolver {
    engine: Arc<dyn ZoneLookup>,
    memo: TtlCache<CoordinateKey, String>,
}

impl std::fmt::Debug for TimezoneResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimezoneResolver")
            .field("memo", &self.memo.config())
            .finish_non_exhaustive()
    }
}

impl TimezoneResolver {
    pub fn new(engine: Arc<dyn ZoneLookup>, memo: CacheConfig) -> Self {
        Self {
            engine,
            memo: TtlCache::new(memo),
        }
    }

    pub async fn resolve(&self, latitude: Option<f64>, longitude: Option<f64>) -> String {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return FALLBACK_ZONE.to_owned();
        };

        let key = CoordinateKey::new(latitude, longitude);
        let resolved = self
            .memo
            .get_or_fetch(key, CacheMode::Use, move || async move {
                let zone = self
                    .engine
                    .zone_at(latitude, longitude)
                    .filter(|zone| !zone.trim().is_empty());
                Ok::<_, Infallible>(zone.unwrap_or_else(|| {
                    tracing::debug!(latitude, longitude, "no timezone for position; using UTC");
                    FALLBACK_ZONE.to_owned()
                }))
            })
            .await;

        match resolved {
            Ok(zone) => zone,
            Err(never) => match never {},
        }
    }

    pub fn memo_stats(&self) -> CacheStats {
        self.memo.stats()
    }
}
