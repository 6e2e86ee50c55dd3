use std::cell::{Ref, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};

use crate::cancellation::CancellationManager;
use crate::config::StaleResponsePolicy;
use crate::error::QueryError;
use crate::models::QueryResult;
use crate::search::{SearchBackend, SearchRequest};

const SEARCH_ID: &str = "poi-search";

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Applied { pois: usize },
    Failed(QueryError),
    /// A newer request was issued before this one resolved.
    Discarded,
}

/// Issues search requests and owns the resulting [`QueryResult`].
///
/// Failures never escape: they leave an empty result with `loading` cleared.
pub struct QueryDispatcher {
    backend: Rc<dyn SearchBackend>,
    policy: StaleResponsePolicy,
    result: Rc<RefCell<QueryResult>>,
    tokens: Rc<RefCell<CancellationManager>>,
}

impl QueryDispatcher {
    pub fn new(backend: Rc<dyn SearchBackend>, policy: StaleResponsePolicy) -> Self {
        Self {
            backend,
            policy,
            result: Rc::new(RefCell::new(QueryResult::default())),
            tokens: Rc::new(RefCell::new(CancellationManager::new())),
        }
    }

    pub fn result(&self) -> Ref<'_, QueryResult> {
        self.result.borrow()
    }

    pub fn is_loading(&self) -> bool {
        self.result.borrow().loading
    }

    /// Sequence number of the most recently issued request (0 before any).
    #[cfg(test)]
    pub fn last_sequence(&self) -> u64 {
        self.tokens.borrow().last_sequence()
    }

    /// Mark the result as loading and return the future that performs the
    /// request and stores its outcome. The caller spawns it.
    pub fn dispatch(&self, request: SearchRequest) -> LocalBoxFuture<'static, DispatchOutcome> {
        let token = {
            let mut tokens = self.tokens.borrow_mut();
            match self.policy {
                StaleResponsePolicy::LatestOnly => tokens.create_token(SEARCH_ID),
                StaleResponsePolicy::LastWriteWins => {
                    // distinct ids so earlier requests are never cancelled
                    let id = format!("{}#{}", SEARCH_ID, tokens.last_sequence() + 1);
                    tokens.create_token(&id)
                }
            }
        };

        info!("Dispatching search #{}: {}", token.sequence, request.summary());
        self.result.borrow_mut().loading = true;

        let response = self.backend.search(request, token.clone());
        let result = Rc::clone(&self.result);
        let tokens = Rc::clone(&self.tokens);
        let policy = self.policy;

        async move {
            let outcome = response.await;
            tokens.borrow_mut().cleanup_token(&token);

            if policy == StaleResponsePolicy::LatestOnly && token.is_cancelled() {
                debug!("Discarding response for superseded search #{}", token.sequence);
                return DispatchOutcome::Discarded;
            }

            let mut result = result.borrow_mut();
            result.loading = false;
            match outcome {
                Ok(response) => {
                    let (pois, count, counts) = response.into_parts();
                    debug!("Search #{} returned {} POIs", token.sequence, pois.len());
                    let applied = pois.len();
                    result.pois = pois;
                    result.total_count = count;
                    result.counts_by_category = counts;
                    DispatchOutcome::Applied { pois: applied }
                }
                Err(e) => {
                    warn!("Search #{} failed, showing no results: {}", token.sequence, e);
                    result.clear();
                    DispatchOutcome::Failed(e)
                }
            }
        }
        .boxed_local()
    }
}
