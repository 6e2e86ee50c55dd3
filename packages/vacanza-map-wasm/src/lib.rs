use wasm_bindgen::prelude::*;

pub mod console;
pub mod models;
pub mod error;
pub mod config;
pub mod geometry;
pub mod categories;
pub mod cancellation;
pub mod selection;
pub mod search;
pub mod debounce;
pub mod dispatcher;
pub mod presentation;
pub mod overlays;
pub mod map_surface;
pub mod view;
pub mod session;
pub mod page;
pub mod web;

#[cfg(test)]
mod test_support;

pub use categories::{CategoryFilter, CategoryKey, CATALOG};
pub use config::{PageConfig, StaleResponsePolicy};
pub use error::{ConfigError, QueryError, SessionError};
pub use geometry::{point_in_polygon, AreaPolygon};
pub use models::{BoundingBox, GeoPoint, Poi, QueryResult};
pub use page::{MapPage, PageDeps};
pub use selection::Selection;
pub use web::WasmMapPage;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

use std::sync::Once;
static INIT: Once = Once::new();

#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console::init_logging(log::LevelFilter::Info);
        log::info!("Vacanza map module initialized");
    });
}

/// Even-odd containment test over a flat `[lng0, lat0, lng1, lat1, ...]` ring.
#[wasm_bindgen]
pub fn point_in_polygon_flat(lng: f64, lat: f64, ring: &[f64]) -> bool {
    let polygon: Vec<GeoPoint> = ring
        .chunks_exact(2)
        .map(|pair| GeoPoint::new(pair[1], pair[0]))
        .collect();
    point_in_polygon(&GeoPoint::new(lat, lng), &polygon)
}

#[wasm_bindgen]
pub fn category_catalog() -> Result<JsValue, JsValue> {
    web::to_js(&CATALOG[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_ring_uses_lng_lat_pairs() {
        let ring = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0];
        assert!(point_in_polygon_flat(5.0, 5.0, &ring));
        assert!(!point_in_polygon_flat(15.0, 5.0, &ring));
        assert!(!point_in_polygon_flat(5.0, 5.0, &ring[..4]));
    }

    #[test]
    fn trailing_odd_value_is_ignored() {
        let ring = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0, 3.0];
        assert!(point_in_polygon_flat(5.0, 5.0, &ring));
    }
}
