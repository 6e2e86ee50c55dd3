use futures::future::LocalBoxFuture;

use crate::cancellation::{CancellationManager, CancellationToken};

const DEBOUNCE_ID: &str = "debounce";

/// Cancellable delay provider.
///
/// `sleep` resolves to `true` once `delay_ms` has elapsed, or to `false` as
/// soon as `token` is cancelled.
pub trait Timer {
    fn sleep(&self, delay_ms: u32, token: CancellationToken) -> LocalBoxFuture<'static, bool>;
}

/// Collapses bursts of values into the last one.
///
/// Every `push` cancels the timer token of the previous push, so only the
/// value whose timer actually elapses can be taken.
pub struct Debouncer<T> {
    delay_ms: u32,
    tokens: CancellationManager,
    pending: Option<(CancellationToken, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms,
            tokens: CancellationManager::new(),
            pending: None,
        }
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Replace the pending value and return the token for its timer.
    pub fn push(&mut self, value: T) -> CancellationToken {
        let token = self.tokens.create_token(DEBOUNCE_ID);
        self.pending = Some((token.clone(), value));
        token
    }

    /// Take the pending value if `token` is still the latest push.
    pub fn take(&mut self, token: &CancellationToken) -> Option<T> {
        if token.is_cancelled() {
            return None;
        }
        match self.pending.take() {
            Some((current, value)) if current.same_as(token) => {
                self.tokens.cleanup_token(&current);
                Some(value)
            }
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
        self.tokens.cancel_token(DEBOUNCE_ID);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
