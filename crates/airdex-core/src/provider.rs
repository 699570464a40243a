//! Aviation API payload decoding and mapping onto [`Airport`].
//!
//! The airports endpoint answers either with a map keyed by ICAO code
//! (`{"KJFK": [{...}]}`) or with a single flat record. Unknown fields are
//! ignored. Every decoding or mapping problem is a `MappingError`; an absent
//! record is `NotFound`.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::coordinates::CoordinateFormat;
use crate::domain::{Airport, IcaoCode};
use crate::error::LookupError;

/// Keys that identify a flat record rather than an ICAO-keyed map.
const RECORD_MARKERS: [&str; 4] = ["facility_name", "icao_ident", "faa_ident", "site_number"];

/// Airport record as published by the aviation API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AirportRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub site_number: Option<String>,
    #[serde(default)]
    pub facility_name: Option<String>,
    #[serde(default)]
    pub faa_ident: Option<String>,
    #[serde(default)]
    pub icao_ident: Option<String>,
    /// Published as `county`; carried into the airport's country field.
    #[serde(default, rename = "county")]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub latitude_sec: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub longitude_sec: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub elevation: Option<String>,
}

/// Accept strings and numbers alike; anything else is a decoding error.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}

/// Extract the record for `icao` from a 2xx response body.
pub fn decode_record(icao: &IcaoCode, body: &str) -> Result<AirportRecord, LookupError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| LookupError::mapping(format!("airport payload is not valid JSON: {e}")))?;

    let candidate = match payload {
        Value::Object(object) if object.is_empty() => None,
        Value::Object(object) if is_flat_record(&object) => Some(Value::Object(object)),
        Value::Object(mut object) => entry_for(&mut object, icao).and_then(first_record),
        Value::Array(records) => first_record(Value::Array(records)),
        Value::Null => None,
        other => {
            return Err(LookupError::mapping(format!(
                "unexpected airport payload type: {}",
                json_type(&other)
            )))
        }
    };

    let Some(candidate) = candidate else {
        return Err(LookupError::not_found(icao));
    };

    serde_json::from_value(candidate)
        .map_err(|e| LookupError::mapping(format!("airport record for {icao} is malformed: {e}")))
}

fn is_flat_record(object: &Map<String, Value>) -> bool {
    RECORD_MARKERS.iter().any(|key| object.contains_key(*key))
}

fn entry_for(object: &mut Map<String, Value>, icao: &IcaoCode) -> Option<Value> {
    if let Some(value) = object.remove(icao.as_str()) {
        return Some(value);
    }
    let key = object
        .keys()
        .find(|key| key.trim().eq_ignore_ascii_case(icao.as_str()))?
        .clone();
    object.remove(&key)
}

fn first_record(value: Value) -> Option<Value> {
    match value {
        Value::Array(records) => records.into_iter().find(|record| !record.is_null()),
        Value::Object(object) if object.is_empty() => None,
        Value::Null => None,
        other => Some(other),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

impl AirportRecord {
    /// Decimal `(latitude, longitude)`, preferring the seconds-encoded pair.
    ///
    /// A pair with one side missing or blank yields `(None, None)`.
    pub fn coordinates(&self) -> Result<(Option<f64>, Option<f64>), LookupError> {
        let pairs = [
            (CoordinateFormat::ArcSeconds, &self.latitude_sec, &self.longitude_sec),
            (CoordinateFormat::Dms, &self.latitude, &self.longitude),
        ];

        for (format, latitude, longitude) in pairs {
            if let (Some(latitude), Some(longitude)) = (non_blank(latitude), non_blank(longitude)) {
                let latitude = format.parse(latitude)?.into_latitude()?;
                let longitude = format.parse(longitude)?.into_longitude()?;
                return Ok((Some(latitude), Some(longitude)));
            }
        }

        if [
            &self.latitude_sec,
            &self.longitude_sec,
            &self.latitude,
            &self.longitude,
        ]
        .into_iter()
        .any(|value| non_blank(value).is_some())
        {
            tracing::debug!(
                site = self.site_number.as_deref().unwrap_or("-"),
                "incomplete coordinate pair; treating position as absent"
            );
        }
        Ok((None, None))
    }

    /// Elevation in whole feet; decimal values are rounded.
    pub fn elevation_feet(&self) -> Result<Option<i32>, LookupError> {
        let Some(raw) = non_blank(&self.elevation) else {
            return Ok(None);
        };

        let feet: f64 = raw
            .parse()
            .map_err(|_| LookupError::mapping(format!("elevation '{raw}' is not numeric")))?;
        if !feet.is_finite() || feet.abs() > f64::from(i32::MAX) {
            return Err(LookupError::mapping(format!(
                "elevation '{raw}' is out of range"
            )));
        }
        Ok(Some(feet.round() as i32))
    }

    /// Assemble the domain entity for `requested`.
    pub fn into_airport(
        self,
        requested: &IcaoCode,
        position: (Option<f64>, Option<f64>),
        timezone_id: String,
    ) -> Result<Airport, LookupError> {
        if let Some(ident) = non_blank(&self.icao_ident) {
            let reported = IcaoCode::parse(ident).map_err(|e| {
                LookupError::mapping(format!("record carries an invalid ICAO ident: {e}"))
            })?;
            if &reported != requested {
                return Err(LookupError::mapping(format!(
                    "record ICAO ident {reported} does not match requested {requested}"
                )));
            }
        }

        let elevation = self.elevation_feet()?;
        let name = self.facility_name.unwrap_or_default();

        Airport::builder(requested.clone(), name.trim())
            .secondary_code(self.faa_ident)
            .city(self.city)
            .country(self.country)
            .position(position.0, position.1)
            .elevation_feet(elevation)
            .timezone_id(timezone_id)
            .build()
            .map_err(LookupError::from)
    }
}
