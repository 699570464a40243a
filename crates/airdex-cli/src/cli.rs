//! CLI argument definitions for airdex.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `airport` | Look up airports by ICAO code |
//! | `coord` | Decode a provider coordinate string |
//! | `timezone` | Resolve the IANA zone for a position |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | JSON configuration file |
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--cache-mode` | `use` | Cache behaviour for lookups |
//!
//! # Examples
//!
//! ```bash
//! airdex airport KJFK EGLL --pretty
//! airdex coord 146303.7400N
//! airdex timezone 40.6399 -73.7787
//! ```

use std::path::PathBuf;

use airdex_core::{CacheMode, CoordinateFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Airport metadata by ICAO code, with coordinates and timezones.
#[derive(Debug, Parser)]
#[command(
    name = "airdex",
    author,
    version,
    about = "Resilient airport metadata lookups",
    long_about = "airdex looks up airport metadata by ICAO code through a circuit breaker, \
retry and rate limiter, caches results in memory and resolves each airport's timezone.\n\
\n\
Configuration comes from an optional JSON file and AIRDEX_* environment variables."
)]
pub struct Cli {
    /// JSON configuration file; environment variables still apply on top.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Cache behaviour for airport lookups.
    ///
    /// - use: serve fresh entries from the cache (default)
    /// - refresh: always fetch, then store
    /// - bypass: always fetch, never store
    #[arg(long, global = true, value_enum, default_value_t = CacheModeArg::Use)]
    pub cache_mode: CacheModeArg,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object output.
    Json,
    /// Human-readable summary.
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheModeArg {
    Use,
    Refresh,
    Bypass,
}

impl From<CacheModeArg> for CacheMode {
    fn from(value: CacheModeArg) -> Self {
        match value {
            CacheModeArg::Use => CacheMode::Use,
            CacheModeArg::Refresh => CacheMode::Refresh,
            CacheModeArg::Bypass => CacheMode::Bypass,
        }
    }
}

/// Coordinate encodings accepted by `coord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CoordFormatArg {
    /// Dashed when the text contains '-' after the first character, else arc-seconds.
    Auto,
    /// Total arc-seconds, e.g. 146303.7400N.
    ArcSeconds,
    /// Dashed degrees-minutes-seconds, e.g. 40-38-23.7400N.
    Dms,
}

impl CoordFormatArg {
    pub fn resolve(self, text: &str) -> CoordinateFormat {
        match self {
            Self::ArcSeconds => CoordinateFormat::ArcSeconds,
            Self::Dms => CoordinateFormat::Dms,
            Self::Auto if text.trim().contains('-') => CoordinateFormat::Dms,
            Self::Auto => CoordinateFormat::ArcSeconds,
        }
    }
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look up one or more airports by ICAO code.
    ///
    /// Every code is looked up independently; failures are reported per code
    /// in the `errors` array.
    ///
    /// # Examples
    ///
    ///   airdex airport KJFK
    ///   airdex airport KJFK EGLL LFPG --pretty
    ///   airdex airport KJFK --cache-mode bypass
    Airport(AirportArgs),

    /// Decode a provider coordinate string to signed decimal degrees.
    ///
    /// # Examples
    ///
    ///   airdex coord 146303.7400N
    ///   airdex coord 073-46-43.2930W --encoding dms
    Coord(CoordArgs),

    /// Resolve the IANA timezone for a latitude and longitude.
    ///
    /// # Examples
    ///
    ///   airdex timezone 51.4700 -0.4543
    ///   airdex timezone 40.64 -73.78 --boundaries zones.geojson
    Timezone(TimezoneArgs),
}

/// Arguments for the `airport` command.
#[derive(Debug, Args)]
pub struct AirportArgs {
    /// One or more ICAO codes (e.g., KJFK, EGLL).
    #[arg(required = true, num_args = 1..)]
    pub codes: Vec<String>,
}

/// Arguments for the `coord` command.
#[derive(Debug, Args)]
pub struct CoordArgs {
    /// Coordinate text with a trailing N, S, E or W.
    pub text: String,

    /// Encoding of the text.
    #[arg(long = "encoding", value_enum, default_value_t = CoordFormatArg::Auto)]
    pub encoding: CoordFormatArg,
}

/// Arguments for the `timezone` command.
#[derive(Debug, Args)]
pub struct TimezoneArgs {
    /// Latitude in decimal degrees.
    #[arg(allow_negative_numbers = true)]
    pub latitude: f64,

    /// Longitude in decimal degrees.
    #[arg(allow_negative_numbers = true)]
    pub longitude: f64,

    /// GeoJSON boundary file overriding the configured engine.
    #[arg(long)]
    pub boundaries: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airport_requires_at_least_one_code() {
        assert!(Cli::try_parse_from(["airdex", "airport"]).is_err());

        let cli = Cli::try_parse_from(["airdex", "airport", "KJFK", "EGLL", "--pretty"])
            .expect("parses");
        assert!(cli.pretty);
        match cli.command {
            Command::Airport(args) => assert_eq!(args.codes, ["KJFK", "EGLL"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn timezone_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["airdex", "timezone", "-33.94", "-118.40"]).expect("parses");
        match cli.command {
            Command::Timezone(args) => {
                assert_eq!(args.latitude, -33.94);
                assert_eq!(args.longitude, -118.40);
                assert!(args.boundaries.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cache_mode_is_global_and_maps_to_core_mode() {
        let cli = Cli::try_parse_from(["airdex", "airport", "KJFK", "--cache-mode", "bypass"])
            .expect("parses");
        assert_eq!(CacheMode::from(cli.cache_mode), CacheMode::Bypass);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn coord_help_example_parses() {
        let cli = Cli::try_parse_from(["airdex", "coord", "073-46-43.2930W", "--encoding", "dms"])
            .expect("parses");
        match cli.command {
            Command::Coord(args) => {
                assert_eq!(args.text, "073-46-43.2930W");
                assert!(matches!(args.encoding, CoordFormatArg::Dms));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        // `--format` selects the output rendering, not the coordinate encoding.
        let misplaced = Cli::try_parse_from(["airdex", "coord", "073-46-43.2930W", "--format", "dms"]);
        assert!(misplaced.is_err());
    }

    #[test]
    fn auto_encoding_picks_dms_for_dashed_text() {
        assert_eq!(
            CoordFormatArg::Auto.resolve("40-38-23.7400N"),
            CoordinateFormat::Dms
        );
        assert_eq!(
            CoordFormatArg::Auto.resolve("146303.7400N"),
            CoordinateFormat::ArcSeconds
        );
        assert_eq!(
            CoordFormatArg::ArcSeconds.resolve("40-38-23.7400N"),
            CoordinateFormat::ArcSeconds
        );
    }
}
