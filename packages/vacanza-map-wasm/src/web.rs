//! Browser implementations of the page's collaborators and the exported
//! `WasmMapPage` handle.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture, LocalFutureObj};
use futures::task::{LocalSpawn, SpawnError};
use futures::FutureExt;
use log::{debug, warn};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, Request, RequestInit, Response};

use crate::cancellation::CancellationToken;
use crate::categories::CategoryKey;
use crate::config::PageConfig;
use crate::debounce::Timer;
use crate::error::{js_error_text, QueryError, SessionError};
use crate::map_surface::{CameraMove, MapSurface};
use crate::models::BoundingBox;
use crate::overlays::Overlays;
use crate::page::{MapPage, PageDeps};
use crate::search::{decode_response, SearchBackend, SearchRequest, SearchResponse};
use crate::session::{Route, SessionContext, SessionGate, Subscription, UserProfile};

/// Serialize to plain JS objects (not `Map`s), as the map library expects.
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

// ---- executor and timers --------------------------------------------------

pub struct BrowserSpawner;

impl LocalSpawn for BrowserSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// A pending `setTimeout`, cleared on drop.
struct TimeoutHandle {
    handle: i32,
    _callback: Closure<dyn FnMut()>,
}

impl TimeoutHandle {
    fn schedule(delay_ms: u32, callback: impl FnOnce() + 'static) -> Option<Self> {
        let window = web_sys::window()?;
        let callback: Closure<dyn FnMut()> = Closure::once(callback);
        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            delay,
        ) {
            Ok(handle) => Some(Self {
                handle,
                _callback: callback,
            }),
            Err(e) => {
                warn!("setTimeout failed: {}", js_error_text(&e));
                None
            }
        }
    }
}

impl Drop for TimeoutHandle {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.handle);
        }
    }
}

pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, delay_ms: u32, token: CancellationToken) -> LocalBoxFuture<'static, bool> {
        let (tx, rx) = oneshot::channel::<bool>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let fire = {
            let tx = Rc::clone(&tx);
            move || {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(true);
                }
            }
        };
        let Some(timeout) = TimeoutHandle::schedule(delay_ms, fire) else {
            return future::ready(false).boxed_local();
        };
        token.on_cancel(move || {
            if let Some(tx) = tx.borrow_mut().take() {
                let _ = tx.send(false);
            }
        });

        async move {
            let elapsed = rx.await.unwrap_or(false);
            drop(timeout);
            elapsed
        }
        .boxed_local()
    }
}

// ---- search backend -------------------------------------------------------

/// `POST`s search requests with `fetch`, aborting on timeout or when the
/// request is superseded.
pub struct FetchSearchBackend {
    url: String,
    timeout_ms: Option<u32>,
    session: Option<Rc<dyn SessionContext>>,
}

impl FetchSearchBackend {
    pub fn new(url: String, timeout_ms: Option<u32>, session: Option<Rc<dyn SessionContext>>) -> Self {
        Self {
            url,
            timeout_ms,
            session,
        }
    }
}

fn network(e: JsValue) -> QueryError {
    QueryError::Network(js_error_text(&e))
}

impl SearchBackend for FetchSearchBackend {
    fn search(
        &self,
        request: SearchRequest,
        token: CancellationToken,
    ) -> LocalBoxFuture<'static, Result<SearchResponse, QueryError>> {
        let url = self.url.clone();
        let timeout_ms = self.timeout_ms;
        let id_token = self.session.as_ref().map(|s| s.id_token());

        async move {
            let body = serde_json::to_string(&request)?;
            let bearer = match id_token {
                Some(pending) => pending.await,
                None => None,
            };
            token.throw_if_cancelled().map_err(|_| QueryError::Cancelled)?;

            let window = web_sys::window().ok_or(QueryError::Unavailable)?;
            let controller = AbortController::new().map_err(network)?;

            let headers = Headers::new().map_err(network)?;
            headers.set("Content-Type", "application/json").map_err(network)?;
            headers.set("Accept", "application/json").map_err(network)?;
            if let Some(bearer) = bearer {
                headers
                    .set("Authorization", &format!("Bearer {}", bearer))
                    .map_err(network)?;
            }

            let init = RequestInit::new();
            init.set_method("POST");
            init.set_headers(&headers);
            init.set_body(&JsValue::from_str(&body));
            init.set_signal(Some(&controller.signal()));
            let fetch_request = Request::new_with_str_and_init(&url, &init).map_err(network)?;

            {
                let controller = controller.clone();
                token.on_cancel(move || controller.abort());
            }
            let timed_out = Rc::new(Cell::new(false));
            let _timeout = timeout_ms.and_then(|ms| {
                let timed_out = Rc::clone(&timed_out);
                let controller = controller.clone();
                TimeoutHandle::schedule(ms, move || {
                    timed_out.set(true);
                    controller.abort();
                })
            });
            let aborted = |e: JsValue| {
                if timed_out.get() {
                    QueryError::Timeout(timeout_ms.unwrap_or_default())
                } else if token.is_cancelled() {
                    QueryError::Cancelled
                } else {
                    network(e)
                }
            };

            let response = JsFuture::from(window.fetch_with_request(&fetch_request))
                .await
                .map_err(aborted)?;
            let response: Response = response
                .dyn_into()
                .map_err(|_| QueryError::Network("fetch did not yield a Response".into()))?;
            if !response.ok() {
                return Err(QueryError::Status(response.status()));
            }
            let content_type = response.headers().get("content-type").ok().flatten();
            if content_type.map_or(false, |c| c.contains("text/html")) {
                return Err(QueryError::HtmlResponse);
            }

            let text = JsFuture::from(response.text().map_err(network)?)
                .await
                .map_err(aborted)?;
            let text = text
                .as_string()
                .ok_or_else(|| QueryError::Decode("response body is not text".into()))?;
            debug!("Search response: {} bytes", text.len());
            decode_response(&text)
        }
        .boxed_local()
    }
}

// ---- JS adapters ----------------------------------------------------------

#[wasm_bindgen]
extern "C" {
    /// Host object wrapping the map renderer.
    pub type JsMapAdapter;

    #[wasm_bindgen(method, js_name = getViewportBounds)]
    fn get_viewport_bounds(this: &JsMapAdapter) -> JsValue;

    #[wasm_bindgen(method, js_name = setInteractive)]
    fn js_set_interactive(this: &JsMapAdapter, enabled: bool);

    #[wasm_bindgen(method, js_name = renderOverlays)]
    fn js_render_overlays(this: &JsMapAdapter, overlays: JsValue);

    #[wasm_bindgen(method, js_name = setStyle)]
    fn js_set_style(this: &JsMapAdapter, style_url: &str);

    #[wasm_bindgen(method, js_name = easeTo)]
    fn js_ease_to(this: &JsMapAdapter, camera: JsValue);

    /// Host object wrapping the identity provider.
    pub type JsSessionAdapter;

    #[wasm_bindgen(method, js_name = currentUser)]
    fn js_current_user(this: &JsSessionAdapter) -> JsValue;

    #[wasm_bindgen(method, js_name = onChange)]
    fn js_on_change(this: &JsSessionAdapter, callback: &Closure<dyn Fn(JsValue)>) -> js_sys::Function;

    #[wasm_bindgen(method, catch, js_name = signOut)]
    fn js_sign_out(this: &JsSessionAdapter) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getIdToken)]
    fn js_get_id_token(this: &JsSessionAdapter) -> Result<js_sys::Promise, JsValue>;
}

impl MapSurface for JsMapAdapter {
    fn viewport_bounds(&self) -> Option<BoundingBox> {
        let value = self.get_viewport_bounds();
        if value.is_undefined() || value.is_null() {
            return None;
        }
        match serde_wasm_bindgen::from_value::<BoundingBox>(value) {
            Ok(bounds) if bounds.is_valid() => Some(bounds),
            Ok(bounds) => {
                debug!("Ignoring invalid viewport bounds {:?}", bounds);
                None
            }
            Err(e) => {
                warn!("Unreadable viewport bounds: {}", e);
                None
            }
        }
    }

    fn set_interactive(&self, enabled: bool) {
        self.js_set_interactive(enabled);
    }

    fn render_overlays(&self, overlays: &Overlays) {
        match to_js(overlays) {
            Ok(value) => self.js_render_overlays(value),
            Err(e) => warn!("Failed to convert overlays: {}", js_error_text(&e)),
        }
    }

    fn set_style(&self, style_url: &str) {
        self.js_set_style(style_url);
    }

    fn ease_camera(&self, camera: CameraMove) {
        match to_js(&camera) {
            Ok(value) => self.js_ease_to(value),
            Err(e) => warn!("Failed to convert camera move: {}", js_error_text(&e)),
        }
    }
}

fn read_user(value: JsValue) -> Option<UserProfile> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| warn!("Unreadable user profile: {}", e))
        .ok()
}

impl SessionContext for JsSessionAdapter {
    fn current_user(&self) -> Option<UserProfile> {
        read_user(self.js_current_user())
    }

    fn on_change(&self, callback: Box<dyn Fn(Option<UserProfile>)>) -> Subscription {
        let closure: Closure<dyn Fn(JsValue)> =
            Closure::wrap(Box::new(move |value: JsValue| callback(read_user(value))));
        let unsubscribe = self.js_on_change(&closure);
        Subscription::new(move || {
            if let Err(e) = unsubscribe.call0(&JsValue::NULL) {
                warn!("Unsubscribe failed: {}", js_error_text(&e));
            }
            drop(closure);
        })
    }

    fn sign_out(&self) -> LocalBoxFuture<'static, Result<(), SessionError>> {
        let promise = self.js_sign_out();
        async move {
            let promise = promise.map_err(|e| SessionError::SignOut(js_error_text(&e)))?;
            JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| SessionError::SignOut(js_error_text(&e)))
        }
        .boxed_local()
    }

    fn id_token(&self) -> LocalBoxFuture<'static, Option<String>> {
        let promise = self.js_get_id_token();
        async move {
            match promise {
                Ok(promise) => match JsFuture::from(promise).await {
                    Ok(value) => value.as_string(),
                    Err(e) => {
                        warn!("Could not read ID token: {}", js_error_text(&e));
                        None
                    }
                },
                Err(e) => {
                    warn!("Could not read ID token: {}", js_error_text(&e));
                    None
                }
            }
        }
        .boxed_local()
    }
}

// ---- exported page handle -------------------------------------------------

/// The map screen, driven from JS.
#[wasm_bindgen]
pub struct WasmMapPage {
    page: MapPage,
    gate: SessionGate,
}

#[wasm_bindgen]
impl WasmMapPage {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        map: JsMapAdapter,
        session: JsSessionAdapter,
        navigate: js_sys::Function,
    ) -> Result<WasmMapPage, JsValue> {
        let config = PageConfig::from_js(config)?;
        let session: Rc<dyn SessionContext> = Rc::new(session);
        let backend = FetchSearchBackend::new(
            config.search_url(),
            config.request_timeout_ms,
            Some(Rc::clone(&session)),
        );
        let page = MapPage::new(
            config,
            PageDeps {
                map: Rc::new(map),
                backend: Rc::new(backend),
                timer: Rc::new(BrowserTimer),
                spawner: Rc::new(BrowserSpawner),
            },
        )?;
        let navigate: Rc<dyn Fn(Route)> = Rc::new(move |route: Route| {
            if let Err(e) = navigate.call1(&JsValue::NULL, &JsValue::from_str(route.path())) {
                warn!("Navigation to {} failed: {}", route.path(), js_error_text(&e));
            }
        });
        let gate = SessionGate::attach(session, navigate);
        Ok(WasmMapPage { page, gate })
    }

    #[wasm_bindgen(js_name = mapReady)]
    pub fn map_ready(&self) {
        self.page.map_ready();
    }

    #[wasm_bindgen(js_name = viewportMoved)]
    pub fn viewport_moved(&self) {
        self.page.viewport_moved();
    }

    #[wasm_bindgen(js_name = startDrawing)]
    pub fn start_drawing(&self) {
        self.page.start_drawing();
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, lat: f64, lng: f64) {
        self.page.pointer_down(lat, lng);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, lat: f64, lng: f64) {
        self.page.pointer_move(lat, lng);
    }

    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) {
        self.page.pointer_up();
    }

    #[wasm_bindgen(js_name = resetArea)]
    pub fn reset_area(&self) {
        self.page.reset_area();
    }

    /// Returns `false` when the toggle was refused during loading.
    #[wasm_bindgen(js_name = toggleCategory)]
    pub fn toggle_category(&self, key: &str) -> Result<bool, JsValue> {
        let key: CategoryKey = key
            .parse()
            .map_err(|e: String| JsValue::from(js_sys::Error::new(&e)))?;
        Ok(self.page.toggle_category(key))
    }

    pub fn categories(&self) -> Result<JsValue, JsValue> {
        to_js(&self.page.categories())
    }

    #[wasm_bindgen(js_name = visiblePois)]
    pub fn visible_pois(&self) -> Result<JsValue, JsValue> {
        to_js(&self.page.visible_pois())
    }

    pub fn overlays(&self) -> Result<JsValue, JsValue> {
        to_js(&self.page.overlays())
    }

    pub fn result(&self) -> Result<JsValue, JsValue> {
        to_js(&self.page.result())
    }

    #[wasm_bindgen(getter, js_name = isLoading)]
    pub fn is_loading(&self) -> bool {
        self.page.is_loading()
    }

    #[wasm_bindgen(getter, js_name = isDrawing)]
    pub fn is_drawing(&self) -> bool {
        self.page.draw_phase() == crate::selection::DrawPhase::Drawing
    }

    #[wasm_bindgen(getter, js_name = selectionKind)]
    pub fn selection_kind(&self) -> String {
        self.page.selection().kind().to_string()
    }

    #[wasm_bindgen(js_name = cycleStyle)]
    pub fn cycle_style(&self) -> Option<String> {
        self.page.cycle_style()
    }

    #[wasm_bindgen(getter, js_name = currentStyle)]
    pub fn current_style(&self) -> Option<String> {
        self.page.current_style()
    }

    #[wasm_bindgen(js_name = toggle3d)]
    pub fn toggle_3d(&self) -> bool {
        self.page.toggle_3d()
    }

    #[wasm_bindgen(getter, js_name = initialView)]
    pub fn initial_view(&self) -> Result<JsValue, JsValue> {
        to_js(&self.page.config().initial_view)
    }

    /// Register a callback run after every state change; `null` clears it.
    #[wasm_bindgen(js_name = onUpdate)]
    pub fn on_update(&self, callback: Option<js_sys::Function>) {
        let listener = callback.map(|f| {
            Rc::new(move || {
                if let Err(e) = f.call0(&JsValue::NULL) {
                    warn!("Update callback threw: {}", js_error_text(&e));
                }
            }) as Rc<dyn Fn()>
        });
        self.page.set_on_update(listener);
    }

    #[wasm_bindgen(js_name = userLabel)]
    pub fn user_label(&self) -> Option<String> {
        self.gate.user().map(|u| u.display_label())
    }

    #[wasm_bindgen(js_name = signOut)]
    pub fn sign_out(&self) -> js_sys::Promise {
        let pending = self.gate.sign_out();
        wasm_bindgen_futures::future_to_promise(async move {
            pending
                .await
                .map(|()| JsValue::UNDEFINED)
                .map_err(|e| js_sys::Error::new(&e.to_string()).into())
        })
    }
}
