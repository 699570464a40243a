use std::time::Instant;

use airdex_core::{Airport, AviationApiClient};
use serde::Serialize;
use tracing::debug;

use crate::cli::AirportArgs;
use crate::error::CliError;
use crate::output::EnvelopeError;

use super::{elapsed_ms, CommandResult};

#[derive(Debug, Serialize)]
struct AirportResponseData {
    airports: Vec<Airport>,
}

pub async fn run(args: &AirportArgs, client: &AviationApiClient) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let results = client.lookup_many(args.codes.iter().cloned()).await;

    let mut airports = Vec::new();
    let mut errors = Vec::new();
    for (input, result) in results {
        match result {
            Ok(airport) => airports.push(airport),
            Err(error) => errors.push(EnvelopeError::from_lookup(input, &error)),
        }
    }
    let latency_ms = elapsed_ms(started);
    debug!(found = airports.len(), failed = errors.len(), latency_ms, "airport command finished");

    let health = client.health().await;
    let data = serde_json::to_value(AirportResponseData { airports })?;
    Ok(CommandResult::ok(data)
        .with_errors(errors)
        .with_latency(latency_ms)
        .with_cache_mode(client.cache_mode())
        .with_health(health.state))
}
