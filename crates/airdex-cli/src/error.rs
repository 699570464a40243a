use airdex_core::{ConfigError, LookupErrorKind};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 6,
            Self::InvalidArgument(_) => 2,
            Self::Serialization(_) => 4,
        }
    }
}

/// Exit code for a command whose envelope carries lookup errors.
///
/// The most severe kind wins when several codes failed differently.
pub const fn lookup_exit_code(kind: LookupErrorKind) -> u8 {
    match kind {
        LookupErrorKind::InvalidKey => 2,
        LookupErrorKind::NotFound => 3,
        LookupErrorKind::MappingError => 8,
        LookupErrorKind::UpstreamFault
        | LookupErrorKind::CircuitOpen
        | LookupErrorKind::RateLimited => 7,
    }
}
