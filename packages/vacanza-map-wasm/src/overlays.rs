// GeoJSON overlay data handed to the map surface. Coordinates are [lng, lat].
use serde::Serialize;
use serde_json::{json, Value};

use crate::categories::classify;
use crate::models::{GeoPoint, Poi};
use crate::selection::Selection;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Overlays {
    pub preview: Value,
    pub selection: Value,
    pub markers: Value,
}

fn position(p: &GeoPoint) -> Value {
    json!([p.longitude, p.latitude])
}

fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features
    })
}

/// In-progress drawing as an open LineString (needs two samples to show).
pub fn preview_line(samples: &[GeoPoint]) -> Value {
    if samples.len() < 2 {
        return feature_collection(Vec::new());
    }
    let coordinates: Vec<Value> = samples.iter().map(position).collect();
    feature_collection(vec![json!({
        "type": "Feature",
        "geometry": {"type": "LineString", "coordinates": coordinates},
        "properties": {"role": "preview"}
    })])
}

pub fn selection_polygon(selection: &Selection) -> Value {
    let Some(polygon) = selection.polygon() else {
        return feature_collection(Vec::new());
    };
    let mut ring: Vec<Value> = polygon.points().iter().map(position).collect();
    // GeoJSON rings must be explicitly closed
    if polygon.points().first() != polygon.points().last() {
        if let Some(first) = polygon.points().first() {
            ring.push(position(first));
        }
    }
    feature_collection(vec![json!({
        "type": "Feature",
        "geometry": {"type": "Polygon", "coordinates": [ring]},
        "properties": {"role": "selection"}
    })])
}

pub fn markers(pois: &[&Poi]) -> Value {
    let features = pois
        .iter()
        .map(|poi| {
            json!({
                "type": "Feature",
                "id": poi.poi_id,
                "geometry": {"type": "Point", "coordinates": position(&poi.location())},
                "properties": {
                    "poiId": poi.poi_id,
                    "name": poi.name,
                    "category": poi.category,
                    "categoryKey": classify(poi.category.as_deref()).map(|k| k.as_str()),
                    "rating": poi.rating
                }
            })
        })
        .collect();
    feature_collection(features)
}

pub fn build(preview: &[GeoPoint], selection: &Selection, visible: &[&Poi]) -> Overlays {
    Overlays {
        preview: preview_line(preview),
        selection: selection_polygon(selection),
        markers: markers(visible),
    }
}
