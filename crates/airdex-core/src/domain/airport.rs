use serde::Serialize;

use crate::{IcaoCode, ValidationError};

/// Canonical airport metadata.
///
/// Fields are private so the invariants checked by [`AirportBuilder::build`]
/// hold for every value in circulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    icao_code: IcaoCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    secondary_code: Option<String>,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elevation_feet: Option<i32>,
}

impl Airport {
    pub fn builder(icao_code: IcaoCode, name: impl Into<String>) -> AirportBuilder {
        AirportBuilder {
            icao_code,
            name: name.into(),
            secondary_code: None,
            city: None,
            country: None,
            position: None,
            timezone_id: None,
            elevation_feet: None,
        }
    }

    pub fn icao_code(&self) -> &IcaoCode {
        &self.icao_code
    }

    pub fn secondary_code(&self) -> Option<&str> {
        self.secondary_code.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    /// `(latitude, longitude)` when both are known.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn timezone_id(&self) -> Option<&str> {
        self.timezone_id.as_deref()
    }

    pub fn elevation_feet(&self) -> Option<i32> {
        self.elevation_feet
    }
}

/// Staged constructor for [`Airport`].
#[derive(Debug, Clone)]
pub struct AirportBuilder {
    icao_code: IcaoCode,
    name: String,
    secondary_code: Option<String>,
    city: Option<String>,
    country: Option<String>,
    position: Option<(Option<f64>, Option<f64>)>,
    timezone_id: Option<String>,
    elevation_feet: Option<i32>,
}

impl AirportBuilder {
    pub fn secondary_code(mut self, value: Option<String>) -> Self {
        self.secondary_code = non_blank(value);
        self
    }

    pub fn city(mut self, value: Option<String>) -> Self {
        self.city = non_blank(value);
        self
    }

    pub fn country(mut self, value: Option<String>) -> Self {
        self.country = non_blank(value);
        self
    }

    pub fn position(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.position = Some((latitude, longitude));
        self
    }

    pub fn elevation_feet(mut self, value: Option<i32>) -> Self {
        self.elevation_feet = value;
        self
    }

    /// Derived by the data port after timezone resolution.
    pub(crate) fn timezone_id(mut self, value: impl Into<String>) -> Self {
        self.timezone_id = Some(value.into());
        self
    }

    pub fn build(self) -> Result<Airport, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankAirportName);
        }

        let (latitude, longitude) = match self.position {
            None | Some((None, None)) => (None, None),
            Some((Some(lat), Some(lon))) => {
                validate_degrees("latitude", lat, 90.0)?;
                validate_degrees("longitude", lon, 180.0)?;
                (Some(lat), Some(lon))
            }
            Some(_) => return Err(ValidationError::PartialCoordinates),
        };

        Ok(Airport {
            icao_code: self.icao_code,
            secondary_code: self.secondary_code,
            name: name.to_owned(),
            city: self.city,
            country: self.country,
            latitude,
            longitude,
            timezone_id: self.timezone_id,
            elevation_feet: self.elevation_feet,
        })
    }
}

fn validate_degrees(field: &'static str, value: f64, limit: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteCoordinate { field });
    }
    if value.abs() > limit {
        return Err(ValidationError::CoordinateOutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|trimmed| !trimmed.is_empty())
}
