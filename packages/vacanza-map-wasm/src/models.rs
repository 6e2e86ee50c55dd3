// This is the models module containing shared data structures
use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A geographic coordinate in degrees.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

// Wire representation of a vertex: {lat, lng}
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPoint> for LatLng {
    fn from(p: GeoPoint) -> Self {
        LatLng {
            lat: p.latitude,
            lng: p.longitude,
        }
    }
}

impl From<LatLng> for GeoPoint {
    fn from(p: LatLng) -> Self {
        GeoPoint::new(p.lat, p.lng)
    }
}

/// Axis-aligned box in degrees, serialized as `{minLat, minLng, maxLat, maxLng}`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.latitude >= self.min_lat
            && p.latitude <= self.max_lat
            && p.longitude >= self.min_lng
            && p.longitude <= self.max_lng
    }

    /// Clamp to the ranges the backend accepts. Zoomed-out renderers report
    /// longitudes past the antimeridian.
    pub fn clamped(&self) -> Self {
        Self {
            min_lat: self.min_lat.clamp(-90.0, 90.0),
            min_lng: self.min_lng.clamp(-180.0, 180.0),
            max_lat: self.max_lat.clamp(-90.0, 90.0),
            max_lng: self.max_lng.clamp(-180.0, 180.0),
        }
    }

    // Degenerate or inverted boxes are rejected by the backend validator
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.min_lng, self.max_lat, self.max_lng]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lng <= self.max_lng
    }
}

/// A point of interest exactly as returned by the search backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    pub poi_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub price_level: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl Poi {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

// Backend ids are UUID strings; fixtures and older payloads use integers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(f) => f.to_string(),
    })
}

/// The most recent raw result set plus its loading flag.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub pois: Vec<Poi>,
    pub loading: bool,
    pub total_count: Option<usize>,
    pub counts_by_category: HashMap<String, u32>,
}

impl QueryResult {
    pub fn clear(&mut self) {
        self.pois.clear();
        self.total_count = None;
        self.counts_by_category.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poi_accepts_numeric_and_string_ids() {
        let json = r#"[
            {"id": 1, "latitude": 5.0, "longitude": 5.0, "category": "restaurant"},
            {"poiId": "3f1c", "name": "Kale", "latitude": 39.9, "longitude": 32.8}
        ]"#;
        let pois: Vec<Poi> = serde_json::from_str(json).expect("valid pois");
        assert_eq!(pois[0].poi_id, "1");
        assert_eq!(pois[0].name, None);
        assert_eq!(pois[1].poi_id, "3f1c");
        assert_eq!(pois[1].category, None);
    }

    #[test]
    fn poi_without_coordinates_is_rejected() {
        let json = r#"{"poiId": "x", "latitude": 1.0}"#;
        assert!(serde_json::from_str::<Poi>(json).is_err());
    }

    #[test]
    fn bounding_box_uses_camel_case_keys() {
        let bbox = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        let value = serde_json::to_value(bbox).expect("serializable");
        assert_eq!(
            value,
            serde_json::json!({"minLat": 1.0, "minLng": 2.0, "maxLat": 3.0, "maxLng": 4.0})
        );
        assert!(bbox.is_valid());
        assert!(!BoundingBox::new(3.0, 2.0, 1.0, 4.0).is_valid());
    }

    #[test]
    fn clamped_bbox_stays_within_world_ranges() {
        let world = BoundingBox::new(-95.0, -540.0, 88.0, 200.5).clamped();
        assert_eq!(world, BoundingBox::new(-90.0, -180.0, 88.0, 180.0));
        let local = BoundingBox::new(39.0, 32.0, 40.0, 33.0);
        assert_eq!(local.clamped(), local);
    }

    #[test]
    fn bbox_contains_is_inclusive() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(bbox.contains(&GeoPoint::new(0.0, 10.0)));
        assert!(!bbox.contains(&GeoPoint::new(-0.1, 5.0)));
    }
}
