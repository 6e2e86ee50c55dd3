// Test doubles for the page's collaborators.
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;

use crate::cancellation::CancellationToken;
use crate::debounce::Timer;
use crate::error::{QueryError, SessionError};
use crate::map_surface::{CameraMove, MapSurface};
use crate::models::{BoundingBox, Poi};
use crate::overlays::Overlays;
use crate::search::{SearchBackend, SearchRequest, SearchResponse};
use crate::session::{SessionContext, Subscription, UserProfile};

pub fn poi(id: &str, lat: f64, lng: f64, category: Option<&str>) -> Poi {
    Poi {
        poi_id: id.to_string(),
        name: Some(format!("POI {}", id)),
        category: category.map(String::from),
        latitude: lat,
        longitude: lng,
        rating: None,
        price_level: None,
        external_id: None,
    }
}

fn response(pois: Vec<Poi>) -> SearchResponse {
    SearchResponse {
        count: Some(pois.len()),
        pois: Some(pois),
        counts_by_category: None,
    }
}

type Reply = Result<SearchResponse, QueryError>;

/// Backend that either answers at once with a scripted reply, or holds every
/// request until the test resolves it by index.
pub struct ScriptedBackend {
    manual: bool,
    honour_categories: Cell<bool>,
    reply: RefCell<Result<Vec<Poi>, QueryError>>,
    requests: RefCell<Vec<SearchRequest>>,
    tokens: RefCell<Vec<CancellationToken>>,
    pending: RefCell<Vec<Option<oneshot::Sender<Reply>>>>,
}

impl ScriptedBackend {
    fn with_mode(manual: bool) -> Self {
        Self {
            manual,
            honour_categories: Cell::new(false),
            reply: RefCell::new(Ok(Vec::new())),
            requests: RefCell::new(Vec::new()),
            tokens: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
        }
    }

    pub fn immediate() -> Self {
        Self::with_mode(false)
    }

    pub fn manual() -> Self {
        Self::with_mode(true)
    }

    pub fn respond_with(&self, pois: Vec<Poi>) {
        *self.reply.borrow_mut() = Ok(pois);
    }

    /// Answer only with POIs whose category was requested, like the server.
    pub fn honour_categories(&self) {
        self.honour_categories.set(true);
    }

    pub fn fail_with(&self, error: QueryError) {
        *self.reply.borrow_mut() = Err(error);
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.borrow().clone()
    }

    pub fn token(&self, index: usize) -> CancellationToken {
        self.tokens.borrow()[index].clone()
    }

    pub fn resolve(&self, index: usize, reply: Result<Vec<Poi>, QueryError>) {
        let sender = self.pending.borrow_mut()[index].take();
        if let Some(sender) = sender {
            let _ = sender.send(reply.map(response));
        }
    }
}

impl SearchBackend for ScriptedBackend {
    fn search(
        &self,
        request: SearchRequest,
        token: CancellationToken,
    ) -> LocalBoxFuture<'static, Reply> {
        let wanted = request.categories.clone();
        self.requests.borrow_mut().push(request);
        self.tokens.borrow_mut().push(token);

        if !self.manual {
            let mut reply = self.reply.borrow().clone();
            if self.honour_categories.get() && !wanted.is_empty() {
                reply = reply.map(|pois| {
                    pois.into_iter()
                        .filter(|p| {
                            p.category
                                .as_deref()
                                .map(|c| wanted.contains(&c.to_lowercase()))
                                .unwrap_or(false)
                        })
                        .collect()
                });
            }
            return future::ready(reply.map(response)).boxed_local();
        }
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().push(Some(tx));
        rx.map(|r| r.unwrap_or(Err(QueryError::Cancelled))).boxed_local()
    }
}

#[derive(Default)]
pub struct FakeMap {
    pub bounds: Cell<Option<BoundingBox>>,
    pub interactive: RefCell<Vec<bool>>,
    pub overlays: RefCell<Vec<Overlays>>,
    pub styles: RefCell<Vec<String>>,
    pub cameras: RefCell<Vec<CameraMove>>,
}

impl FakeMap {
    pub fn with_bounds(bounds: BoundingBox) -> Self {
        let map = Self::default();
        map.bounds.set(Some(bounds));
        map
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive.borrow().last().copied().unwrap_or(true)
    }

    pub fn last_overlays(&self) -> Option<Overlays> {
        self.overlays.borrow().last().cloned()
    }
}

impl MapSurface for FakeMap {
    fn viewport_bounds(&self) -> Option<BoundingBox> {
        self.bounds.get()
    }

    fn set_interactive(&self, enabled: bool) {
        self.interactive.borrow_mut().push(enabled);
    }

    fn render_overlays(&self, overlays: &Overlays) {
        self.overlays.borrow_mut().push(overlays.clone());
    }

    fn set_style(&self, style_url: &str) {
        self.styles.borrow_mut().push(style_url.to_string());
    }

    fn ease_camera(&self, camera: CameraMove) {
        self.cameras.borrow_mut().push(camera);
    }
}

struct Waiter {
    due: u64,
    sender: Option<oneshot::Sender<bool>>,
}

/// Virtual clock; sleeps elapse only when the test calls `advance`.
#[derive(Default)]
pub struct ManualTimer {
    now: Cell<u64>,
    waiters: Rc<RefCell<Vec<Waiter>>>,
}

impl ManualTimer {
    pub fn advance(&self, ms: u64) {
        let now = self.now.get() + ms;
        self.now.set(now);
        let due: Vec<_> = self
            .waiters
            .borrow_mut()
            .iter_mut()
            .filter(|w| w.due <= now)
            .filter_map(|w| w.sender.take())
            .collect();
        for sender in due {
            let _ = sender.send(true);
        }
    }

    pub fn pending(&self) -> usize {
        self.waiters
            .borrow()
            .iter()
            .filter(|w| w.sender.is_some())
            .count()
    }
}

impl Timer for ManualTimer {
    fn sleep(&self, delay_ms: u32, token: CancellationToken) -> LocalBoxFuture<'static, bool> {
        let (tx, rx) = oneshot::channel();
        let index = {
            let mut waiters = self.waiters.borrow_mut();
            waiters.push(Waiter {
                due: self.now.get() + u64::from(delay_ms),
                sender: Some(tx),
            });
            waiters.len() - 1
        };
        let waiters = Rc::clone(&self.waiters);
        token.on_cancel(move || {
            let sender = waiters.borrow_mut()[index].sender.take();
            if let Some(sender) = sender {
                let _ = sender.send(false);
            }
        });
        rx.map(|r| r.unwrap_or(false)).boxed_local()
    }
}

type Listener = Rc<dyn Fn(Option<UserProfile>)>;

#[derive(Default)]
pub struct FakeSession {
    user: RefCell<Option<UserProfile>>,
    listeners: Rc<RefCell<Vec<(u64, Listener)>>>,
    next_id: Cell<u64>,
    pub fail_sign_out: Cell<bool>,
    pub id_token: RefCell<Option<String>>,
}

impl FakeSession {
    pub fn emit(&self, user: Option<UserProfile>) {
        *self.user.borrow_mut() = user.clone();
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(user.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl SessionContext for FakeSession {
    fn current_user(&self) -> Option<UserProfile> {
        self.user.borrow().clone()
    }

    fn on_change(&self, callback: Box<dyn Fn(Option<UserProfile>)>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::from(callback)));
        let listeners = Rc::clone(&self.listeners);
        Subscription::new(move || listeners.borrow_mut().retain(|(i, _)| *i != id))
    }

    fn sign_out(&self) -> LocalBoxFuture<'static, Result<(), SessionError>> {
        if self.fail_sign_out.get() {
            return future::ready(Err(SessionError::SignOut("network down".into()))).boxed_local();
        }
        *self.user.borrow_mut() = None;
        future::ready(Ok(())).boxed_local()
    }

    fn id_token(&self) -> LocalBoxFuture<'static, Option<String>> {
        future::ready(self.id_token.borrow().clone()).boxed_local()
    }
}
