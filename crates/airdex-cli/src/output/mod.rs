use airdex_core::{CoordinateError, LookupError};
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::{lookup_exit_code, CliError};
use crate::metadata::Metadata;

/// Top-level document printed by every command.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub meta: Metadata,
    pub data: Value,
    pub errors: Vec<EnvelopeError>,
}

impl Envelope {
    /// Exit code implied by the carried errors, `0` when there are none.
    pub fn exit_code(&self) -> u8 {
        self.errors
            .iter()
            .map(|error| error.exit_code)
            .max()
            .unwrap_or(0)
    }
}

/// One failed item inside an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip)]
    pub exit_code: u8,
}

impl EnvelopeError {
    pub fn from_lookup(input: impl Into<String>, error: &LookupError) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.message().to_owned(),
            status: Some(error.status()),
            retryable: error.retryable(),
            input: Some(input.into()),
            exit_code: lookup_exit_code(error.kind()),
        }
    }

    pub fn from_coordinate(input: impl Into<String>, error: &CoordinateError) -> Self {
        Self {
            code: String::from("coordinate.invalid"),
            message: error.to_string(),
            status: None,
            retryable: false,
            input: Some(input.into()),
            exit_code: 2,
        }
    }
}

pub fn render(envelope: &Envelope, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => render_table(envelope)?,
    }

    Ok(())
}

fn render_table(envelope: &Envelope) -> Result<(), CliError> {
    println!("request_id  : {}", envelope.meta.request_id);
    println!("generated_at: {}", envelope.meta.generated_at);
    println!("latency_ms  : {}", envelope.meta.latency_ms);
    if let Some(cache_mode) = envelope.meta.cache_mode {
        println!("cache_mode  : {cache_mode}");
    }
    if let Some(health) = envelope.meta.health {
        println!("health      : {health:?}");
    }

    if !envelope.meta.warnings.is_empty() {
        println!("warnings:");
        for warning in &envelope.meta.warnings {
            println!("  - {warning}");
        }
    }

    println!("data:");
    let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
    for line in pretty_data.lines() {
        println!("  {line}");
    }

    if !envelope.errors.is_empty() {
        println!("errors:");
        for error in &envelope.errors {
            match &error.input {
                Some(input) => println!("  - {input}: {}: {}", error.code, error.message),
                None => println!("  - {}: {}", error.code, error.message),
            }
        }
    }

    Ok(())
}
