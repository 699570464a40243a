use std::sync::Arc;
use std::time::Instant;

use airdex_core::{
    AviationConfig, BoundaryIndex, ConfigError, TimezoneResolver, ZoneLookup, FALLBACK_ZONE,
};
use serde::Serialize;

use crate::cli::TimezoneArgs;
use crate::error::CliError;

use super::{elapsed_ms, CommandResult};

#[derive(Debug, Serialize)]
struct TimezoneResponseData {
    latitude: f64,
    longitude: f64,
    timezone_id: String,
}

pub async fn run(args: &TimezoneArgs, config: &AviationConfig) -> Result<CommandResult, CliError> {
    check_range("latitude", args.latitude, 90.0)?;
    check_range("longitude", args.longitude, 180.0)?;

    let started = Instant::now();
    let zones: Arc<dyn ZoneLookup> = match &args.boundaries {
        Some(path) => Arc::new(BoundaryIndex::load(path).map_err(ConfigError::from)?),
        None => config.zone_lookup()?,
    };
    let resolver = TimezoneResolver::new(zones, config.cache_config());
    let timezone_id = resolver
        .resolve(Some(args.latitude), Some(args.longitude))
        .await;

    let mut result = CommandResult::ok(serde_json::to_value(TimezoneResponseData {
        latitude: args.latitude,
        longitude: args.longitude,
        timezone_id: timezone_id.clone(),
    })?)
    .with_latency(elapsed_ms(started));
    if timezone_id == FALLBACK_ZONE {
        result = result.with_warning("no zone boundary contains this position; using UTC");
    }
    Ok(result)
}

fn check_range(name: &str, value: f64, limit: f64) -> Result<(), CliError> {
    if value.is_finite() && value.abs() <= limit {
        Ok(())
    } else {
        Err(CliError::InvalidArgument(format!(
            "{name} must be within ±{limit}, got {value}"
        )))
    }
}
