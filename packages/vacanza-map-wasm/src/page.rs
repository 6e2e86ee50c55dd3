//! The map page controller.
//!
//! `MapPage` wires the drawing state machine, the current selection, the
//! category toggles and the query dispatcher together, and pushes overlays to
//! the map surface after every change. It is a cheap `Clone` handle over
//! shared state so spawned tasks can call back into it.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawn, LocalSpawnExt};
use log::{debug, info, warn};

use crate::categories::{category_states, CategoryFilter, CategoryKey, CategoryState};
use crate::config::PageConfig;
use crate::debounce::{Debouncer, Timer};
use crate::dispatcher::{DispatchOutcome, QueryDispatcher};
use crate::error::ConfigError;
use crate::map_surface::MapSurface;
use crate::models::{BoundingBox, GeoPoint, Poi, QueryResult};
use crate::overlays::{self, Overlays};
use crate::presentation::visible_pois;
use crate::search::{RequestShape, SearchBackend, SearchRequest};
use crate::selection::{AreaDrawing, DrawPhase, GestureOutcome, Selection};
use crate::view::{CameraMode, StyleCycle};

/// Collaborators injected into the page.
pub struct PageDeps {
    pub map: Rc<dyn MapSurface>,
    pub backend: Rc<dyn SearchBackend>,
    pub timer: Rc<dyn Timer>,
    pub spawner: Rc<dyn LocalSpawn>,
}

struct PageState {
    drawing: AreaDrawing,
    selection: Selection,
    categories: CategoryFilter,
    debouncer: Debouncer<BoundingBox>,
    styles: StyleCycle,
    camera: CameraMode,
}

struct PageInner {
    config: PageConfig,
    shape: RequestShape,
    map: Rc<dyn MapSurface>,
    timer: Rc<dyn Timer>,
    spawner: Rc<dyn LocalSpawn>,
    dispatcher: QueryDispatcher,
    state: RefCell<PageState>,
    on_update: RefCell<Option<Rc<dyn Fn()>>>,
}

#[derive(Clone)]
pub struct MapPage {
    inner: Rc<PageInner>,
}

impl MapPage {
    pub fn new(config: PageConfig, deps: PageDeps) -> Result<Self, ConfigError> {
        config.validate()?;
        let shape = RequestShape {
            page: config.page,
            limit: config.limit,
            sort: config.sort,
            max_polygon_vertices: config.max_polygon_vertices,
        };
        let state = PageState {
            drawing: AreaDrawing::new(config.sample_tolerance_deg),
            selection: Selection::None,
            categories: CategoryFilter::default(),
            debouncer: Debouncer::new(config.debounce_ms),
            styles: StyleCycle::new(config.styles.clone(), config.initial_style_index),
            camera: CameraMode::from_pitch(config.initial_view.pitch),
        };
        let dispatcher = QueryDispatcher::new(deps.backend, config.stale_responses);
        Ok(Self {
            inner: Rc::new(PageInner {
                config,
                shape,
                map: deps.map,
                timer: deps.timer,
                spawner: deps.spawner,
                dispatcher,
                state: RefCell::new(state),
                on_update: RefCell::new(None),
            }),
        })
    }

    pub fn config(&self) -> &PageConfig {
        &self.inner.config
    }

    /// Called after every state change, once the overlays have been pushed.
    pub fn set_on_update(&self, listener: Option<Rc<dyn Fn()>>) {
        *self.inner.on_update.borrow_mut() = listener;
    }

    // ---- queries -------------------------------------------------------

    /// The renderer finished loading: run the first viewport query.
    pub fn map_ready(&self) {
        info!("Map ready");
        if self.inner.state.borrow().selection.is_viewport_driven() {
            self.query_viewport(self.request_categories());
        }
        self.refresh();
    }

    /// The viewport finished moving. While viewport-driven this schedules a
    /// debounced BBOX query for the bounds at this moment.
    pub fn viewport_moved(&self) {
        {
            let state = self.inner.state.borrow();
            if !state.selection.is_viewport_driven() || state.drawing.is_drawing() {
                return;
            }
        }
        let Some(bounds) = self.viewport_bounds() else {
            debug!("Viewport bounds unavailable, skipping query");
            return;
        };
        let (token, delay) = {
            let mut state = self.inner.state.borrow_mut();
            let delay = state.debouncer.delay_ms();
            (state.debouncer.push(bounds), delay)
        };

        let sleep = self.inner.timer.sleep(delay, token.clone());
        let page = self.clone();
        self.spawn(Box::pin(async move {
            if !sleep.await {
                return;
            }
            let bounds = {
                let mut state = page.inner.state.borrow_mut();
                if !state.selection.is_viewport_driven() || state.drawing.is_drawing() {
                    return;
                }
                let Some(bounds) = state.debouncer.take(&token) else {
                    return;
                };
                state.selection = Selection::Viewport(bounds);
                bounds
            };
            let categories = page.request_categories();
            page.issue(SearchRequest::bbox(bounds, categories, &page.inner.shape));
            page.refresh();
        }));
    }

    // ---- drawing -------------------------------------------------------

    pub fn start_drawing(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.drawing.begin() {
                debug!("Draw restarted, discarding in-flight samples");
            }
            state.selection = Selection::None;
            state.debouncer.cancel();
        }
        info!("Drawing started");
        self.inner.map.set_interactive(false);
        self.refresh();
    }

    pub fn pointer_down(&self, lat: f64, lng: f64) {
        let recorded = self
            .inner
            .state
            .borrow_mut()
            .drawing
            .pointer_down(GeoPoint::new(lat, lng));
        if recorded {
            self.refresh();
        }
    }

    pub fn pointer_move(&self, lat: f64, lng: f64) {
        let recorded = self
            .inner
            .state
            .borrow_mut()
            .drawing
            .pointer_move(GeoPoint::new(lat, lng));
        if recorded {
            self.refresh();
        }
    }

    /// End the gesture. A committed ring is searched immediately.
    pub fn pointer_up(&self) {
        let Some(outcome) = self.inner.state.borrow_mut().drawing.pointer_up() else {
            return;
        };
        self.inner.map.set_interactive(true);

        let request = {
            let mut state = self.inner.state.borrow_mut();
            let request = match &outcome {
                GestureOutcome::Committed(polygon) => {
                    info!("Area committed with {} vertices", polygon.points().len());
                    Some(SearchRequest::polygon(
                        polygon.points(),
                        state.categories.request_categories(),
                        &self.inner.shape,
                    ))
                }
                GestureOutcome::Aborted { samples } => {
                    debug!("Gesture aborted with {} samples", samples);
                    None
                }
            };
            state.selection = outcome.into_selection();
            request
        };

        if let Some(request) = request {
            self.issue(request);
        }
        self.refresh();
    }

    /// Drop the area, re-enable every category and search the viewport.
    pub fn reset_area(&self) {
        let was_drawing = {
            let mut state = self.inner.state.borrow_mut();
            let was_drawing = state.drawing.cancel();
            state.debouncer.cancel();
            state.categories.enable_all();
            state.selection = Selection::None;
            was_drawing
        };
        if was_drawing {
            self.inner.map.set_interactive(true);
        }
        info!("Area reset");
        self.query_viewport(Vec::new());
        self.refresh();
    }

    // ---- categories ----------------------------------------------------

    /// Flip a category. Returns `false` when the toggle was refused because
    /// a search is in flight.
    pub fn toggle_category(&self, key: CategoryKey) -> bool {
        if self.inner.config.lock_categories_while_loading && self.inner.dispatcher.is_loading() {
            debug!("Ignoring toggle of '{}' while loading", key);
            return false;
        }
        let (enabled, viewport_driven, area_request) = {
            let mut state = self.inner.state.borrow_mut();
            let enabled = state.categories.toggle(key);
            let idle = !state.drawing.is_drawing();
            let area_request = match &state.selection {
                Selection::PolygonArea(_) if idle => SearchRequest::for_selection(
                    &state.selection,
                    state.categories.request_categories(),
                    &self.inner.shape,
                ),
                _ => None,
            };
            (enabled, state.selection.is_viewport_driven() && idle, area_request)
        };
        debug!("Category '{}' {}", key, if enabled { "on" } else { "off" });
        if viewport_driven {
            self.query_viewport(self.request_categories());
        } else if let Some(request) = area_request {
            self.issue(request);
        }
        self.refresh();
        true
    }

    pub fn categories(&self) -> Vec<CategoryState> {
        category_states(&self.inner.state.borrow().categories)
    }

    // ---- view controls -------------------------------------------------

    pub fn cycle_style(&self) -> Option<String> {
        let style = self.inner.state.borrow_mut().styles.advance().map(String::from);
        if let Some(style) = &style {
            self.inner.map.set_style(style);
        }
        style
    }

    /// Returns whether the camera is now in 3D.
    pub fn toggle_3d(&self) -> bool {
        let (camera, is_3d) = {
            let mut state = self.inner.state.borrow_mut();
            let camera = state.camera.toggle();
            (camera, state.camera.is_3d())
        };
        self.inner.map.ease_camera(camera);
        is_3d
    }

    // ---- read side -----------------------------------------------------

    pub fn visible_pois(&self) -> Vec<Poi> {
        let state = self.inner.state.borrow();
        let result = self.inner.dispatcher.result();
        visible_pois(&result.pois, &state.selection, &state.categories)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn overlays(&self) -> Overlays {
        let state = self.inner.state.borrow();
        let result = self.inner.dispatcher.result();
        let visible = visible_pois(&result.pois, &state.selection, &state.categories);
        overlays::build(state.drawing.preview(), &state.selection, &visible)
    }

    pub fn result(&self) -> QueryResult {
        self.inner.dispatcher.result().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.dispatcher.is_loading()
    }

    pub fn selection(&self) -> Selection {
        self.inner.state.borrow().selection.clone()
    }

    pub fn draw_phase(&self) -> DrawPhase {
        self.inner.state.borrow().drawing.phase()
    }

    pub fn current_style(&self) -> Option<String> {
        self.inner.state.borrow().styles.current().map(String::from)
    }

    pub fn is_3d(&self) -> bool {
        self.inner.state.borrow().camera.is_3d()
    }

    // ---- internals -----------------------------------------------------

    fn request_categories(&self) -> Vec<String> {
        self.inner.state.borrow().categories.request_categories()
    }

    fn viewport_bounds(&self) -> Option<BoundingBox> {
        self.inner.map.viewport_bounds().map(|b| b.clamped())
    }

    /// BBOX query for the current viewport; skipped when bounds are unknown.
    fn query_viewport(&self, categories: Vec<String>) {
        let Some(bounds) = self.viewport_bounds() else {
            debug!("Viewport bounds unavailable, skipping query");
            return;
        };
        self.inner.state.borrow_mut().selection = Selection::Viewport(bounds);
        self.issue(SearchRequest::bbox(bounds, categories, &self.inner.shape));
    }

    fn issue(&self, request: SearchRequest) {
        let pending = self.inner.dispatcher.dispatch(request);
        let page = self.clone();
        self.spawn(Box::pin(async move {
            match pending.await {
                DispatchOutcome::Applied { pois } => debug!("Applied {} POIs", pois),
                DispatchOutcome::Failed(e) => debug!("Search failed: {}", e),
                DispatchOutcome::Discarded => debug!("Superseded search discarded"),
            }
            page.refresh();
        }));
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(e) = self.inner.spawner.spawn_local(task) {
            warn!("Failed to spawn page task: {}", e);
        }
    }

    fn refresh(&self) {
        let overlays = self.overlays();
        self.inner.map.render_overlays(&overlays);
        let listener = self.inner.on_update.borrow().clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}
