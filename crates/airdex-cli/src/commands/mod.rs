mod airport;
mod coord;
mod timezone;

use airdex_core::{AviationConfig, CacheMode, HealthState};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;
use crate::output::{Envelope, EnvelopeError};

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_mode: Option<CacheMode>,
    pub health: Option<HealthState>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_mode: None,
            health: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = Some(cache_mode);
        self
    }

    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = Some(health);
        self
    }

    pub fn into_envelope(self) -> Envelope {
        let mut meta = Metadata::new(self.latency_ms);
        meta.cache_mode = self.cache_mode.map(CacheMode::as_str);
        meta.health = self.health;
        for warning in self.warnings {
            meta.push_warning(warning);
        }

        Envelope {
            meta,
            data: self.data,
            errors: self.errors,
        }
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let command_result = match &cli.command {
        Command::Airport(args) => {
            let config = AviationConfig::load(cli.config.as_deref())?;
            let client = config
                .build_default_client()?
                .with_cache_mode(cli.cache_mode.into());
            airport::run(args, &client).await?
        }
        Command::Coord(args) => coord::run(args)?,
        Command::Timezone(args) => {
            let config = AviationConfig::load(cli.config.as_deref())?;
            timezone::run(args, &config).await?
        }
    };

    Ok(command_result.into_envelope())
}

fn elapsed_ms(started: std::time::Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
