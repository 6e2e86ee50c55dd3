use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type CancelHook = Box<dyn FnOnce()>;

struct TokenState {
    cancelled: Cell<bool>,
    hooks: RefCell<Vec<CancelHook>>,
}

/// Cancellation flag shared between whoever issued an operation and the
/// operation itself. Hooks registered with [`CancellationToken::on_cancel`]
/// run once, on the first `cancel`.
#[derive(Clone)]
pub struct CancellationToken {
    pub id: String,
    pub sequence: u64,
    state: Rc<TokenState>,
}

impl CancellationToken {
    pub fn new(id: String, sequence: u64) -> Self {
        Self {
            id,
            sequence,
            state: Rc::new(TokenState {
                cancelled: Cell::new(false),
                hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn cancel(&self) {
        if self.state.cancelled.replace(true) {
            return;
        }
        let hooks: Vec<CancelHook> = self.state.hooks.borrow_mut().drain(..).collect();
        for hook in hooks {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    /// Run `hook` on cancellation, or right away if already cancelled.
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        if self.is_cancelled() {
            hook();
        } else {
            self.state.hooks.borrow_mut().push(Box::new(hook));
        }
    }

    pub fn throw_if_cancelled(&self) -> Result<(), String> {
        if self.is_cancelled() {
            Err(format!("Operation {}#{} was cancelled", self.id, self.sequence))
        } else {
            Ok(())
        }
    }

    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("id", &self.id)
            .field("sequence", &self.sequence)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// One live token per operation id. Creating a token for an id cancels the
/// token previously issued under that id.
#[derive(Default)]
pub struct CancellationManager {
    tokens: HashMap<String, CancellationToken>,
    next_sequence: u64,
}

impl CancellationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_token(&mut self, id: &str) -> CancellationToken {
        self.next_sequence += 1;
        let token = CancellationToken::new(id.to_string(), self.next_sequence);
        if let Some(existing) = self.tokens.insert(id.to_string(), token.clone()) {
            existing.cancel();
        }
        token
    }

    pub fn cancel_token(&mut self, id: &str) {
        if let Some(token) = self.tokens.get(id) {
            token.cancel();
        }
    }

    /// True when `token` is the most recent one issued for its id.
    pub fn is_current(&self, token: &CancellationToken) -> bool {
        self.tokens
            .get(&token.id)
            .map(|t| t.same_as(token))
            .unwrap_or(false)
    }

    /// Forget `token` if it is still the current one for its id.
    pub fn cleanup_token(&mut self, token: &CancellationToken) {
        if self.is_current(token) {
            self.tokens.remove(&token.id);
        }
    }

    pub fn last_sequence(&self) -> u64 {
        self.next_sequence
    }
}
