use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::ZoneLookup;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("failed to open boundary file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("boundary data is not valid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("feature {index} has no 'tzid' property")]
    MissingZoneId { index: usize },
    #[error("feature {index} has an unsupported geometry; expected Polygon or MultiPolygon")]
    UnsupportedGeometry { index: usize },
    #[error("feature {index} contains a ring with fewer than 3 positions")]
    DegenerateRing { index: usize },
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    geometry: Geometry,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(alias = "TZID")]
    tzid: Option<String>,
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    fn of(ring: &[(f64, f64)]) -> Self {
        ring.iter().fold(
            Self {
                min_lon: f64::INFINITY,
                min_lat: f64::INFINITY,
                max_lon: f64::NEG_INFINITY,
                max_lat: f64::NEG_INFINITY,
            },
            |bbox, &(lon, lat)| Self {
                min_lon: bbox.min_lon.min(lon),
                min_lat: bbox.min_lat.min(lat),
                max_lon: bbox.max_lon.max(lon),
                max_lat: bbox.max_lat.max(lat),
            },
        )
    }

    fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// One polygon of a zone: `(lon, lat)` exterior ring plus holes.
#[derive(Debug, Clone)]
struct ZonePolygon {
    zone_id: String,
    bbox: BoundingBox,
    exterior: Vec<(f64, f64)>,
    holes: Vec<Vec<(f64, f64)>>,
}

impl ZonePolygon {
    fn contains(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains(lon, lat)
            && ring_contains(&self.exterior, lon, lat)
            && !self.holes.iter().any(|hole| ring_contains(hole, lon, lat))
    }
}

/// Even-odd ray casting test; `ring` need not repeat its first position.
fn ring_contains(ring: &[(f64, f64)], lon: f64, lat: f64) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Timezone boundaries loaded from a GeoJSON `FeatureCollection`.
///
/// Each feature carries a `tzid` property and a `Polygon` or `MultiPolygon`
/// geometry, as produced by timezone-boundary-builder. Positions are
/// `[longitude, latitude]`. When polygons overlap the first match wins.
#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    polygons: Vec<ZonePolygon>,
}

impl BoundaryIndex {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BoundaryError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BoundaryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            polygons = index.polygons.len(),
            "loaded timezone boundaries"
        );
        Ok(index)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BoundaryError> {
        let collection: FeatureCollection = serde_json::from_reader(reader)?;
        Self::from_collection(collection)
    }

    pub fn from_geojson_str(geojson: &str) -> Result<Self, BoundaryError> {
        let collection: FeatureCollection = serde_json::from_str(geojson)?;
        Self::from_collection(collection)
    }

    fn from_collection(collection: FeatureCollection) -> Result<Self, BoundaryError> {
        let mut polygons = Vec::new();

        for (index, feature) in collection.features.into_iter().enumerate() {
            let zone_id = feature
                .properties
                .tzid
                .filter(|tzid| !tzid.trim().is_empty())
                .ok_or(BoundaryError::MissingZoneId { index })?;

            let parts = match feature.geometry {
                Geometry::Polygon { coordinates } => vec![coordinates],
                Geometry::MultiPolygon { coordinates } => coordinates,
                Geometry::Unsupported => return Err(BoundaryError::UnsupportedGeometry { index }),
            };

            for rings in parts {
                let mut rings = rings
                    .into_iter()
                    .map(|ring| to_ring(ring, index))
                    .collect::<Result<Vec<_>, _>>()?;
                if rings.is_empty() {
                    continue;
                }
                let exterior = rings.remove(0);
                polygons.push(ZonePolygon {
                    zone_id: zone_id.clone(),
                    bbox: BoundingBox::of(&exterior),
                    exterior,
                    holes: rings,
                });
            }
        }

        Ok(Self { polygons })
    }

    /// Number of polygons across all zones.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

fn to_ring(positions: Vec<Position>, index: usize) -> Result<Vec<(f64, f64)>, BoundaryError> {
    let mut ring = positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] => Ok((*lon, *lat)),
            _ => Err(BoundaryError::DegenerateRing { index }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(BoundaryError::DegenerateRing { index });
    }
    Ok(ring)
}

impl ZoneLookup for BoundaryIndex {
    fn zone_at(&self, latitude: f64, longitude: f64) -> Option<String> {
        self.polygons
            .iter()
            .find(|polygon| polygon.contains(longitude, latitude))
            .map(|polygon| polygon.zone_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"tzid": "America/New_York"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[-80, 35], [-70, 35], [-70, 45], [-80, 45], [-80, 35]],
                        [[-76, 38], [-74, 38], [-74, 39], [-76, 39], [-76, 38]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {"tzid": "Europe/London", "extra": 1},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[-6, 50], [2, 50], [2, 56], [-6, 56], [-6, 50]]],
                        [[[-8, 54], [-7, 54], [-7, 55, 0], [-8, 55]]]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn finds_zone_containing_point() {
        let index = BoundaryIndex::from_geojson_str(SAMPLE).expect("valid geojson");
        assert_eq!(index.len(), 3);
        assert_eq!(
            index.zone_at(40.6399, -73.7787).as_deref(),
            Some("America/New_York")
        );
        assert_eq!(index.zone_at(51.47, -0.4543).as_deref(), Some("Europe/London"));
        assert_eq!(index.zone_at(54.5, -7.5).as_deref(), Some("Europe/London"));
    }

    #[test]
    fn holes_and_open_water_are_unresolved() {
        let index = BoundaryIndex::from_geojson_str(SAMPLE).expect("valid geojson");
        assert_eq!(index.zone_at(38.5, -75.0), None);
        assert_eq!(index.zone_at(0.0, 0.0), None);
    }

    #[test]
    fn rejects_feature_without_zone_id() {
        let geojson = r#"{"features": [{"properties": {}, "geometry": {"type": "Polygon", "coordinates": []}}]}"#;
        assert!(matches!(
            BoundaryIndex::from_geojson_str(geojson),
            Err(BoundaryError::MissingZoneId { index: 0 })
        ));
    }

    #[test]
    fn rejects_unsupported_geometry_and_degenerate_rings() {
        let point = r#"{"features": [{"properties": {"tzid": "UTC"}, "geometry": {"type": "Point", "coordinates": [0, 0]}}]}"#;
        assert!(matches!(
            BoundaryIndex::from_geojson_str(point),
            Err(BoundaryError::UnsupportedGeometry { index: 0 })
        ));

        let line = r#"{"features": [{"properties": {"tzid": "UTC"}, "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1], [0, 0]]]}}]}"#;
        assert!(matches!(
            BoundaryIndex::from_geojson_str(line),
            Err(BoundaryError::DegenerateRing { index: 0 })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let error = BoundaryIndex::load("/definitely/not/here.geojson").expect_err("missing");
        assert!(matches!(error, BoundaryError::Io { .. }));
    }
}
