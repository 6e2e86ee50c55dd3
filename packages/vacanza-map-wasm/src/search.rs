//! Wire types for `POST /pois/search-in-area` and the backend seam.

use std::collections::HashMap;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::cancellation::CancellationToken;
use crate::error::QueryError;
use crate::geometry::reduce_ring;
use crate::models::{BoundingBox, LatLng, Poi};
use crate::selection::Selection;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionType {
    Bbox,
    Polygon,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    RatingDesc,
    DistanceToCenter,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub selection_type: SelectionType,
    pub bbox: Option<BoundingBox>,
    pub polygon: Option<Vec<LatLng>>,
    pub categories: Vec<String>,
    pub page: u32,
    pub limit: u32,
    pub sort: SortOrder,
}

/// Paging, ordering and size limits shared by every request of a page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequestShape {
    pub page: u32,
    pub limit: u32,
    pub sort: SortOrder,
    pub max_polygon_vertices: usize,
}

impl SearchRequest {
    pub fn bbox(bbox: BoundingBox, categories: Vec<String>, shape: &RequestShape) -> Self {
        SearchRequest {
            selection_type: SelectionType::Bbox,
            bbox: Some(bbox),
            polygon: None,
            categories,
            page: shape.page,
            limit: shape.limit,
            sort: shape.sort,
        }
    }

    /// Polygon request; rings above the backend's vertex cap are reduced.
    pub fn polygon(
        ring: &[crate::models::GeoPoint],
        categories: Vec<String>,
        shape: &RequestShape,
    ) -> Self {
        let reduced = reduce_ring(ring, shape.max_polygon_vertices);
        SearchRequest {
            selection_type: SelectionType::Polygon,
            bbox: None,
            polygon: Some(reduced.into_iter().map(LatLng::from).collect()),
            categories,
            page: shape.page,
            limit: shape.limit,
            sort: shape.sort,
        }
    }

    /// Request for a selection, `None` when it has no geometry to send.
    pub fn for_selection(
        selection: &Selection,
        categories: Vec<String>,
        shape: &RequestShape,
    ) -> Option<Self> {
        match selection {
            Selection::None => None,
            Selection::Viewport(bbox) => Some(Self::bbox(*bbox, categories, shape)),
            Selection::PolygonArea(polygon) => {
                Some(Self::polygon(polygon.points(), categories, shape))
            }
        }
    }

    /// Short description for log lines.
    pub fn summary(&self) -> String {
        match self.selection_type {
            SelectionType::Bbox => match &self.bbox {
                Some(b) => format!(
                    "BBOX [{:.4},{:.4} .. {:.4},{:.4}] categories={:?}",
                    b.min_lat, b.min_lng, b.max_lat, b.max_lng, self.categories
                ),
                None => "BBOX <missing>".to_string(),
            },
            SelectionType::Polygon => format!(
                "POLYGON ({} vertices) categories={:?}",
                self.polygon.as_ref().map(|p| p.len()).unwrap_or(0),
                self.categories
            ),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub pois: Option<Vec<Poi>>,
    #[serde(default)]
    pub counts_by_category: Option<HashMap<String, u32>>,
}

impl SearchResponse {
    pub fn into_parts(self) -> (Vec<Poi>, Option<usize>, HashMap<String, u32>) {
        (
            self.pois.unwrap_or_default(),
            self.count,
            self.counts_by_category.unwrap_or_default(),
        )
    }
}

/// Decode a response body, rejecting HTML error pages served with 2xx.
pub fn decode_response(body: &str) -> Result<SearchResponse, QueryError> {
    let head = body.trim_start();
    let is_doctype = head
        .get(..9)
        .map(|p| p.eq_ignore_ascii_case("<!doctype"))
        .unwrap_or(false);
    if is_doctype || head.starts_with("<html") {
        return Err(QueryError::HtmlResponse);
    }
    Ok(serde_json::from_str(body)?)
}

/// The external search endpoint.
///
/// Implementations must resolve (never hang past their own timeout) and
/// should stop work when `token` is cancelled.
pub trait SearchBackend {
    fn search(
        &self,
        request: SearchRequest,
        token: CancellationToken,
    ) -> LocalBoxFuture<'static, Result<SearchResponse, QueryError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AreaPolygon;
    use crate::models::GeoPoint;

    fn shape() -> RequestShape {
        RequestShape {
            page: 0,
            limit: 200,
            sort: SortOrder::RatingDesc,
            max_polygon_vertices: 200,
        }
    }

    #[test]
    fn bbox_request_wire_format() {
        let request = SearchRequest::bbox(BoundingBox::new(39.0, 32.0, 40.0, 33.0), vec![], &shape());
        let value = serde_json::to_value(&request).expect("serializable");
        assert_eq!(
            value,
            serde_json::json!({
                "selectionType": "BBOX",
                "bbox": {"minLat": 39.0, "minLng": 32.0, "maxLat": 40.0, "maxLng": 33.0},
                "polygon": null,
                "categories": [],
                "page": 0,
                "limit": 200,
                "sort": "RATING_DESC"
            })
        );
    }

    #[test]
    fn polygon_request_wire_format() {
        let polygon = AreaPolygon::closed_from(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 10.0),
        ])
        .expect("ring");
        let request = SearchRequest::for_selection(
            &Selection::PolygonArea(polygon),
            vec!["cafe".into()],
            &shape(),
        )
        .expect("polygon request");
        let value = serde_json::to_value(&request).expect("serializable");
        assert_eq!(value["selectionType"], "POLYGON");
        assert_eq!(value["bbox"], serde_json::Value::Null);
        assert_eq!(value["polygon"][1], serde_json::json!({"lat": 0.0, "lng": 10.0}));
        assert_eq!(value["polygon"].as_array().map(|a| a.len()), Some(4));
        assert_eq!(value["categories"], serde_json::json!(["cafe"]));
    }

    #[test]
    fn oversized_polygon_is_reduced_for_the_wire() {
        let ring: Vec<GeoPoint> = (0..450)
            .map(|i| {
                let t = i as f64 / 450.0 * std::f64::consts::TAU;
                GeoPoint::new(t.sin(), t.cos())
            })
            .collect();
        let polygon = AreaPolygon::closed_from(ring).expect("ring");
        let request = SearchRequest::polygon(polygon.points(), vec![], &shape());
        let sent = request.polygon.expect("polygon");
        assert!(sent.len() <= 200);
        assert!(sent.len() >= 4);
        assert_eq!(polygon.points().len(), 451);
    }

    #[test]
    fn no_selection_means_no_request() {
        assert!(SearchRequest::for_selection(&Selection::None, vec![], &shape()).is_none());
    }

    #[test]
    fn decode_full_response() {
        let body = r#"{
            "count": 2,
            "pois": [
                {"poiId": "a", "name": "Anıtkabir", "category": "museum", "latitude": 39.925, "longitude": 32.837, "rating": 4.9},
                {"poiId": "b", "category": null, "latitude": 39.93, "longitude": 32.85}
            ],
            "countsByCategory": {"museum": 1, "unknown": 1}
        }"#;
        let (pois, count, counts) = decode_response(body).expect("valid").into_parts();
        assert_eq!(pois.len(), 2);
        assert_eq!(count, Some(2));
        assert_eq!(counts.get("museum"), Some(&1));
        assert_eq!(pois[1].category, None);
    }

    #[test]
    fn decode_rejects_html_and_garbage() {
        assert_eq!(
            decode_response("<!doctype html><html></html>"),
            Err(QueryError::HtmlResponse)
        );
        assert!(matches!(decode_response("{\"pois\": 3}"), Err(QueryError::Decode(_))));
        let (pois, _, _) = decode_response("{}").expect("empty object").into_parts();
        assert!(pois.is_empty());
    }
}
