//! Provider coordinate encodings to signed decimal degrees.
//!
//! Two textual encodings are supported:
//!
//! | Format | Example | Decimal degrees |
//! |--------|---------|-----------------|
//! | [`CoordinateFormat::ArcSeconds`] | `146303.7400N` | `seconds / 3600` |
//! | [`CoordinateFormat::Dms`] | `40-38-23.7400N` | `d + m / 60 + s / 3600` |
//!
//! The trailing direction letter selects both the sign (`S` and `W` negate)
//! and the [`Axis`]. Numerals are plain ASCII digits with an optional single
//! `.`; signs, exponents and locale separators are rejected.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Geographic axis implied by a direction letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }

    const fn limit(self) -> f64 {
        match self {
            Self::Latitude => 90.0,
            Self::Longitude => 180.0,
        }
    }
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate value is empty")]
    Empty,
    #[error("coordinate '{value}' has no trailing direction letter")]
    MissingDirection { value: String },
    #[error("unknown direction letter '{ch}', expected one of N, S, E, W")]
    UnknownDirection { ch: char },
    #[error("invalid {field} '{value}' in coordinate")]
    InvalidNumber { field: &'static str, value: String },
    #[error("coordinate '{value}' must have 3 dash-separated fields, found {found}")]
    FieldCount { value: String, found: usize },
    #[error("{field} must be in [0, 60), got {value}")]
    FieldOutOfRange { field: &'static str, value: f64 },
    #[error("{axis} magnitude {degrees} exceeds {limit}")]
    OutOfRange { axis: Axis, degrees: f64, limit: f64 },
    #[error("expected a {expected} but the direction letter denotes a {found}")]
    WrongAxis { expected: Axis, found: Axis },
}

/// Signed decimal degrees together with the axis they belong to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Angle {
    degrees: f64,
    axis: Axis,
}

impl Angle {
    pub const fn degrees(self) -> f64 {
        self.degrees
    }

    pub const fn axis(self) -> Axis {
        self.axis
    }

    pub fn into_latitude(self) -> Result<f64, CoordinateError> {
        self.expect_axis(Axis::Latitude)
    }

    pub fn into_longitude(self) -> Result<f64, CoordinateError> {
        self.expect_axis(Axis::Longitude)
    }

    fn expect_axis(self, expected: Axis) -> Result<f64, CoordinateError> {
        if self.axis == expected {
            Ok(self.degrees)
        } else {
            Err(CoordinateError::WrongAxis {
                expected,
                found: self.axis,
            })
        }
    }
}

/// Provider coordinate encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFormat {
    /// Total arc-seconds with a trailing direction, e.g. `265603.2930W`.
    ArcSeconds,
    /// Dashed degree-minute-second, e.g. `073-46-43.2930W`.
    Dms,
}

impl CoordinateFormat {
    pub fn parse(self, value: &str) -> Result<Angle, CoordinateError> {
        match self {
            Self::ArcSeconds => parse_arc_seconds(value),
            Self::Dms => parse_dms(value),
        }
    }
}

/// Parse a seconds-encoded coordinate such as `146303.7400N`.
pub fn parse_arc_seconds(value: &str) -> Result<Angle, CoordinateError> {
    let (body, direction) = split_direction(value)?;
    let seconds = parse_decimal("arc-seconds", body)?;
    finish(seconds / 3600.0, direction)
}

/// Parse a dashed coordinate such as `40-38-23.7400N`.
pub fn parse_dms(value: &str) -> Result<Angle, CoordinateError> {
    let (body, direction) = split_direction(value)?;

    let fields: Vec<&str> = body.split('-').collect();
    if fields.len() != 3 {
        return Err(CoordinateError::FieldCount {
            value: value.trim().to_owned(),
            found: fields.len(),
        });
    }

    let degrees = parse_integer("degrees", fields[0])?;
    let minutes = parse_integer("minutes", fields[1])?;
    let seconds = parse_decimal("seconds", fields[2])?;

    if minutes >= 60.0 {
        return Err(CoordinateError::FieldOutOfRange {
            field: "minutes",
            value: minutes,
        });
    }
    if seconds >= 60.0 {
        return Err(CoordinateError::FieldOutOfRange {
            field: "seconds",
            value: seconds,
        });
    }

    finish(degrees + minutes / 60.0 + seconds / 3600.0, direction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    fn from_char(ch: char) -> Result<Self, CoordinateError> {
        match ch.to_ascii_uppercase() {
            'N' => Ok(Self::North),
            'S' => Ok(Self::South),
            'E' => Ok(Self::East),
            'W' => Ok(Self::West),
            _ => Err(CoordinateError::UnknownDirection { ch }),
        }
    }

    const fn axis(self) -> Axis {
        match self {
            Self::North | Self::South => Axis::Latitude,
            Self::East | Self::West => Axis::Longitude,
        }
    }

    const fn is_negative(self) -> bool {
        matches!(self, Self::South | Self::West)
    }
}

fn split_direction(value: &str) -> Result<(&str, Direction), CoordinateError> {
    let trimmed = value.trim();
    let last = trimmed.chars().next_back().ok_or(CoordinateError::Empty)?;
    if !last.is_alphabetic() {
        return Err(CoordinateError::MissingDirection {
            value: trimmed.to_owned(),
        });
    }
    let direction = Direction::from_char(last)?;
    let body = &trimmed[..trimmed.len() - last.len_utf8()];
    Ok((body, direction))
}

fn finish(magnitude: f64, direction: Direction) -> Result<Angle, CoordinateError> {
    let axis = direction.axis();
    if !magnitude.is_finite() || magnitude > axis.limit() {
        return Err(CoordinateError::OutOfRange {
            axis,
            degrees: magnitude,
            limit: axis.limit(),
        });
    }

    let degrees = if direction.is_negative() {
        -magnitude
    } else {
        magnitude
    };
    Ok(Angle { degrees, axis })
}

fn parse_integer(field: &'static str, raw: &str) -> Result<f64, CoordinateError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(field, raw));
    }
    raw.parse::<u32>()
        .map(f64::from)
        .map_err(|_| invalid(field, raw))
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, CoordinateError> {
    let digits = raw.bytes().filter(u8::is_ascii_digit).count();
    let dots = raw.bytes().filter(|b| *b == b'.').count();
    if digits == 0 || dots > 1 || digits + dots != raw.len() {
        return Err(invalid(field, raw));
    }
    raw.parse::<f64>().map_err(|_| invalid(field, raw))
}

fn invalid(field: &'static str, raw: &str) -> CoordinateError {
    CoordinateError::InvalidNumber {
        field,
        value: raw.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn arc_seconds_north_is_positive() {
        let angle = parse_arc_seconds("146303.7400N").expect("valid");
        assert_eq!(angle.axis(), Axis::Latitude);
        assert_close(angle.degrees(), 146_303.74 / 3600.0);
        assert_close(angle.degrees(), 40.639_927_8);
    }

    #[test]
    fn arc_seconds_west_is_negated() {
        let angle = parse_arc_seconds("265603.2930W").expect("valid");
        assert_eq!(angle.axis(), Axis::Longitude);
        assert_close(angle.degrees(), -265_603.293 / 3600.0);
        assert!(angle.degrees() < -73.778 && angle.degrees() > -73.779);
    }

    #[test]
    fn arc_seconds_without_fraction_is_accepted() {
        assert_close(parse_arc_seconds("3600S").expect("valid").degrees(), -1.0);
    }

    #[test]
    fn dms_matches_arc_seconds_encoding() {
        let dms = parse_dms("40-38-23.7400N").expect("valid");
        let secs = parse_arc_seconds("146303.7400N").expect("valid");
        assert_close(dms.degrees(), 40.0 + 38.0 / 60.0 + 23.74 / 3600.0);
        assert_close(dms.degrees(), secs.degrees());
    }

    #[test]
    fn dms_south_and_west_negate() {
        let south = parse_dms("33-56-42.0000S").expect("valid");
        assert_close(south.degrees(), -(33.0 + 56.0 / 60.0 + 42.0 / 3600.0));

        let west = parse_dms("082-32-31.3700W").expect("valid");
        assert_eq!(west.axis(), Axis::Longitude);
        assert_close(west.degrees(), -(82.0 + 32.0 / 60.0 + 31.37 / 3600.0));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert!(parse_dms("  35-26-09.9980N ").is_ok());
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_arc_seconds("  "), Err(CoordinateError::Empty));
        assert_eq!(parse_dms(""), Err(CoordinateError::Empty));
    }

    #[test]
    fn rejects_missing_or_unknown_direction() {
        assert!(matches!(
            parse_arc_seconds("146303.7400"),
            Err(CoordinateError::MissingDirection { .. })
        ));
        assert_eq!(
            parse_arc_seconds("146303.7400X"),
            Err(CoordinateError::UnknownDirection { ch: 'X' })
        );
    }

    #[test]
    fn rejects_non_plain_numerals() {
        for raw in ["N", "-146303.74N", "1,46303N", "1.4.6N", "1e5N", "infN", "NaNN", ".N"] {
            assert!(
                matches!(
                    parse_arc_seconds(raw),
                    Err(CoordinateError::InvalidNumber { .. })
                        | Err(CoordinateError::UnknownDirection { .. })
                ),
                "{raw} should be rejected, got {:?}",
                parse_arc_seconds(raw)
            );
        }
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert_eq!(
            parse_dms("40-38N"),
            Err(CoordinateError::FieldCount {
                value: String::from("40-38N"),
                found: 2
            })
        );
        assert!(matches!(
            parse_dms("40-38-23-1N"),
            Err(CoordinateError::FieldCount { found: 4, .. })
        ));
    }

    #[test]
    fn rejects_minutes_or_seconds_past_sixty() {
        assert!(matches!(
            parse_dms("40-60-00.0N"),
            Err(CoordinateError::FieldOutOfRange { field: "minutes", .. })
        ));
        assert!(matches!(
            parse_dms("40-38-60.0N"),
            Err(CoordinateError::FieldOutOfRange { field: "seconds", .. })
        ));
    }

    #[test]
    fn rejects_magnitude_beyond_axis_limit() {
        assert!(matches!(
            parse_arc_seconds("324000.1N"),
            Err(CoordinateError::OutOfRange { axis: Axis::Latitude, .. })
        ));
        assert!(parse_arc_seconds("324000.1E").is_ok());
        assert!(matches!(
            parse_dms("181-00-00.0E"),
            Err(CoordinateError::OutOfRange { axis: Axis::Longitude, .. })
        ));
    }

    #[test]
    fn axis_guard_rejects_swapped_components() {
        let longitude = parse_arc_seconds("265603.2930W").expect("valid");
        assert_eq!(
            longitude.into_latitude(),
            Err(CoordinateError::WrongAxis {
                expected: Axis::Latitude,
                found: Axis::Longitude
            })
        );
        assert!(longitude.into_longitude().is_ok());
    }

    #[test]
    fn format_dispatches_to_parser() {
        let a = CoordinateFormat::ArcSeconds.parse("146303.7400N").expect("valid");
        let b = CoordinateFormat::Dms.parse("40-38-23.7400N").expect("valid");
        assert_close(a.degrees(), b.degrees());
    }
}
