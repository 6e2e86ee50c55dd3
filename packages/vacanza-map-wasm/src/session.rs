//! Identity session seam.
//!
//! The identity provider is injected as a [`SessionContext`]; the
//! [`SessionGate`] turns its sign-in/sign-out notifications into navigation
//! requests between the auth screens and the map screen.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL", alias = "photoUrl")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    /// Display name, else the e-mail local part, else "User".
    pub fn display_label(&self) -> String {
        let non_empty = |s: &&str| !s.trim().is_empty();
        self.display_name
            .as_deref()
            .filter(non_empty)
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(non_empty)
            })
            .unwrap_or("User")
            .to_string()
    }
}

/// Handle returned by [`SessionContext::on_change`]; unsubscribes on drop.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }
}

pub trait SessionContext {
    fn current_user(&self) -> Option<UserProfile>;

    /// Register for sign-in/sign-out notifications.
    fn on_change(&self, callback: Box<dyn Fn(Option<UserProfile>)>) -> Subscription;

    fn sign_out(&self) -> LocalBoxFuture<'static, Result<(), SessionError>>;

    /// Bearer token for outbound requests, `None` when signed out.
    fn id_token(&self) -> LocalBoxFuture<'static, Option<String>>;
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Login,
    Map,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Map => "/map",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Loading,
    SignedIn(UserProfile),
    SignedOut,
}

pub struct SessionGate {
    session: Rc<dyn SessionContext>,
    state: Rc<RefCell<SessionState>>,
    navigate: Rc<dyn Fn(Route)>,
    _subscription: Subscription,
}

impl SessionGate {
    /// Subscribe to `session`. Without a known current user the gate stays
    /// `Loading` until the first notification arrives.
    pub fn attach(session: Rc<dyn SessionContext>, navigate: Rc<dyn Fn(Route)>) -> Self {
        let initial = match session.current_user() {
            Some(user) => SessionState::SignedIn(user),
            None => SessionState::Loading,
        };
        let state = Rc::new(RefCell::new(initial));
        let subscription = {
            let state = Rc::clone(&state);
            let navigate = Rc::clone(&navigate);
            session.on_change(Box::new(move |user| apply_change(&state, navigate.as_ref(), user)))
        };
        Self {
            session,
            state,
            navigate,
            _subscription: subscription,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        match &*self.state.borrow() {
            SessionState::SignedIn(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::SignedIn(_))
    }

    /// Sign out and go to the login screen. On failure the state is kept.
    pub fn sign_out(&self) -> LocalBoxFuture<'static, Result<(), SessionError>> {
        let pending = self.session.sign_out();
        let state = Rc::clone(&self.state);
        let navigate = Rc::clone(&self.navigate);
        async move {
            match pending.await {
                Ok(()) => {
                    info!("Signed out");
                    // the provider may already have notified us
                    let previous = state.replace(SessionState::SignedOut);
                    if previous != SessionState::SignedOut {
                        navigate(Route::Login);
                    }
                    Ok(())
                }
                Err(e) => {
                    warn!("{}", e);
                    Err(e)
                }
            }
        }
        .boxed_local()
    }
}

fn apply_change(state: &RefCell<SessionState>, navigate: &dyn Fn(Route), user: Option<UserProfile>) {
    let previous = match user {
        Some(user) => state.replace(SessionState::SignedIn(user)),
        None => state.replace(SessionState::SignedOut),
    };
    let current = state.borrow().clone();
    match (previous, current) {
        (SessionState::SignedOut, SessionState::SignedOut) => {}
        (_, SessionState::SignedOut) => navigate(Route::Login),
        (SessionState::SignedOut, SessionState::SignedIn(_)) => navigate(Route::Map),
        _ => {}
    }
}
