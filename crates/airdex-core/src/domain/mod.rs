//! # Domain Models
//!
//! Canonical airport types with construction-time validation.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`IcaoCode`] | Normalized 4-character lookup key |
//! | [`Airport`] | Immutable airport metadata |
//! | [`AirportBuilder`] | Validating constructor for [`Airport`] |
//!
//! An [`Airport`] can only be obtained through [`AirportBuilder::build`], so a
//! blank name, a half-known position or an out-of-range coordinate never
//! reaches a cache or a caller.

mod airport;
mod icao;

pub use airport::{Airport, AirportBuilder};
pub use icao::IcaoCode;
