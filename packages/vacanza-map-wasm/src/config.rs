use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::ConfigError;
use crate::search::SortOrder;

// Limits enforced by the search backend's request validator
pub const DEFAULT_LIMIT: u32 = 200;
pub const MAX_LIMIT: u32 = 500;
pub const MAX_POLYGON_VERTICES: usize = 200;

pub const DEFAULT_DEBOUNCE_MS: u32 = 500;
pub const DEFAULT_SAMPLE_TOLERANCE_DEG: f64 = 0.000_05;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 15_000;
pub const SEARCH_PATH: &str = "/pois/search-in-area";

pub const DEFAULT_STYLES: [&str; 5] = [
    "mapbox://styles/mapbox/streets-v12",
    "mapbox://styles/mapbox/outdoors-v12",
    "mapbox://styles/mapbox/light-v11",
    "mapbox://styles/mapbox/dark-v11",
    "mapbox://styles/mapbox/satellite-v9",
];

/// How responses to superseded requests are handled.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StaleResponsePolicy {
    /// Only the most recently issued request may update the result.
    LatestOnly,
    /// Every response is applied as it arrives; a slow superseded response
    /// can overwrite a fresher one.
    LastWriteWins,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        // Ankara
        Self {
            longitude: 32.8597,
            latitude: 39.9334,
            zoom: 8.0,
            bearing: 0.0,
            pitch: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageConfig {
    pub backend_url: String,
    pub search_path: String,
    pub debounce_ms: u32,
    pub page: u32,
    pub limit: u32,
    pub sort: SortOrder,
    pub sample_tolerance_deg: f64,
    pub max_polygon_vertices: usize,
    pub stale_responses: StaleResponsePolicy,
    pub request_timeout_ms: Option<u32>,
    pub lock_categories_while_loading: bool,
    pub initial_view: ViewState,
    pub styles: Vec<String>,
    pub initial_style_index: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            search_path: SEARCH_PATH.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            page: 0,
            limit: DEFAULT_LIMIT,
            sort: SortOrder::RatingDesc,
            sample_tolerance_deg: DEFAULT_SAMPLE_TOLERANCE_DEG,
            max_polygon_vertices: MAX_POLYGON_VERTICES,
            stale_responses: StaleResponsePolicy::LatestOnly,
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
            lock_categories_while_loading: true,
            initial_view: ViewState::default(),
            styles: DEFAULT_STYLES.iter().map(|s| s.to_string()).collect(),
            initial_style_index: 1,
        }
    }
}

impl PageConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PageConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `undefined`/`null` yield the defaults.
    pub fn from_js(value: JsValue) -> Result<Self, ConfigError> {
        if value.is_undefined() || value.is_null() {
            return Ok(Self::default());
        }
        let config: PageConfig = serde_wasm_bindgen::from_value(value)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(ConfigError::OutOfRange {
                field: "limit",
                reason: format!("must be between 1 and {}", MAX_LIMIT),
            });
        }
        if !(4..=MAX_POLYGON_VERTICES).contains(&self.max_polygon_vertices) {
            return Err(ConfigError::OutOfRange {
                field: "maxPolygonVertices",
                reason: format!("must be between 4 and {}", MAX_POLYGON_VERTICES),
            });
        }
        if !self.sample_tolerance_deg.is_finite() || self.sample_tolerance_deg < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "sampleToleranceDeg",
                reason: "must be a non-negative number".into(),
            });
        }
        if self.styles.is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "styles",
                reason: "at least one map style is required".into(),
            });
        }
        if self.initial_style_index >= self.styles.len() {
            return Err(ConfigError::OutOfRange {
                field: "initialStyleIndex",
                reason: format!("must be below {}", self.styles.len()),
            });
        }
        if !self.search_path.starts_with('/') {
            return Err(ConfigError::OutOfRange {
                field: "searchPath",
                reason: "must start with '/'".into(),
            });
        }
        Ok(())
    }

    pub fn search_url(&self) -> String {
        format!("{}{}", self.backend_url.trim_end_matches('/'), self.search_path)
    }
}
