use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::coordinates::CoordinateError;

/// Validation and contract errors exposed by `airdex-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ICAO code cannot be empty")]
    EmptyIcaoCode,
    #[error("ICAO code must be 4 alphanumeric characters: '{value}'")]
    InvalidIcaoCode { value: String },

    #[error("airport name cannot be blank")]
    BlankAirportName,
    #[error("latitude and longitude must be both present or both absent")]
    PartialCoordinates,
    #[error("field '{field}' must be finite")]
    NonFiniteCoordinate { field: &'static str },
    #[error("field '{field}' out of range: {value}")]
    CoordinateOutOfRange { field: &'static str, value: String },
}

/// Classification of a failed airport lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupErrorKind {
    InvalidKey,
    NotFound,
    UpstreamFault,
    CircuitOpen,
    RateLimited,
    MappingError,
}

impl LookupErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid_key",
            Self::NotFound => "not_found",
            Self::UpstreamFault => "upstream_fault",
            Self::CircuitOpen => "circuit_open",
            Self::RateLimited => "rate_limited",
            Self::MappingError => "mapping_error",
        }
    }
}

impl Display for LookupErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured lookup error surfaced by the pipeline and the data port.
///
/// Only server-side upstream faults (5xx, transport errors, attempt
/// timeouts) count against the circuit breaker, and only those are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupError {
    kind: LookupErrorKind,
    message: String,
    retryable: bool,
    // 5xx-class and transport faults; the only outcomes the breaker counts.
    server_fault: bool,
}

impl LookupError {
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self {
            kind: LookupErrorKind::InvalidKey,
            message: message.into(),
            retryable: false,
            server_fault: false,
        }
    }

    pub fn not_found(icao: impl Display) -> Self {
        Self {
            kind: LookupErrorKind::NotFound,
            message: format!("airport with ICAO code '{icao}' not found"),
            retryable: false,
            server_fault: false,
        }
    }

    /// Server-side or transport fault; retried by the pipeline.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self {
            kind: LookupErrorKind::UpstreamFault,
            message: message.into(),
            retryable: true,
            server_fault: true,
        }
    }

    /// Unexpected non-5xx answer: reported as an upstream fault but neither
    /// retried nor counted by the circuit breaker.
    pub fn upstream_terminal(message: impl Into<String>) -> Self {
        Self {
            kind: LookupErrorKind::UpstreamFault,
            message: message.into(),
            retryable: false,
            server_fault: false,
        }
    }

    pub fn circuit_open(name: &str) -> Self {
        Self {
            kind: LookupErrorKind::CircuitOpen,
            message: format!("circuit breaker '{name}' is open; upstream call not attempted"),
            retryable: false,
            server_fault: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: LookupErrorKind::RateLimited,
            message: message.into(),
            retryable: false,
            server_fault: false,
        }
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self {
            kind: LookupErrorKind::MappingError,
            message: message.into(),
            retryable: false,
            server_fault: false,
        }
    }

    pub const fn kind(&self) -> LookupErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    /// Whether this failure is recorded as a breaker failure sample.
    pub const fn counts_toward_breaker(&self) -> bool {
        self.server_fault
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            LookupErrorKind::InvalidKey => "lookup.invalid_key",
            LookupErrorKind::NotFound => "lookup.not_found",
            LookupErrorKind::UpstreamFault => "lookup.upstream_fault",
            LookupErrorKind::CircuitOpen => "lookup.circuit_open",
            LookupErrorKind::RateLimited => "lookup.rate_limited",
            LookupErrorKind::MappingError => "lookup.mapping_error",
        }
    }

    /// HTTP-style status a front end should report for this error.
    pub const fn status(&self) -> u16 {
        match self.kind {
            LookupErrorKind::InvalidKey => 400,
            LookupErrorKind::NotFound => 404,
            LookupErrorKind::RateLimited => 429,
            LookupErrorKind::MappingError => 500,
            LookupErrorKind::UpstreamFault => 502,
            LookupErrorKind::CircuitOpen => 503,
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for LookupError {}

impl From<ValidationError> for LookupError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::EmptyIcaoCode | ValidationError::InvalidIcaoCode { .. } => {
                Self::invalid_key(value.to_string())
            }
            other => Self::mapping(other.to_string()),
        }
    }
}

impl From<CoordinateError> for LookupError {
    fn from(value: CoordinateError) -> Self {
        Self::mapping(format!("coordinate mapping failed: {value}"))
    }
}
