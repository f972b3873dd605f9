//! Page-level state machine for the recipe search page.
//!
//! ```text
//! Idle | Success | Error --submit--> Loading
//! Loading --submit--> Loading        (supersedes the pending load)
//! Loading --resolve--> Success
//! Loading --reject--> Error
//! Error --retry--> Loading           (re-submits the last query)
//! ```
//!
//! Each submit bumps a generation stored alongside the state. A load only
//! publishes its outcome if its generation is still current, so a superseded
//! load never overwrites a newer one. The superseded call is not cancelled: it
//! keeps running in the fetch layer and fills the cache.

use crate::fetch::FetchClient;
use crate::spoonacular::{DEFAULT_BATCH_SIZE, FetchError, Recipe};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    Idle,
    Loading,
    Success { results: Vec<Recipe> },
    Error { message: String },
}

impl PageState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PageState::Loading)
    }
}

/// What the page shows: the current state and the query it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub query: String,
    pub state: PageState,
    generation: u64,
}

impl PageView {
    pub fn new(query: impl Into<String>, state: PageState) -> Self {
        Self {
            query: query.into(),
            state,
            generation: 0,
        }
    }

    /// Number of loads submitted so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct Inner {
    client: FetchClient,
    tx: watch::Sender<PageView>,
}

/// Clone-cheap handle to the page state machine.
#[derive(Clone)]
pub struct PageController {
    inner: Arc<Inner>,
}

impl PageController {
    /// A controller that has not loaded anything yet.
    pub fn new(client: FetchClient) -> Self {
        let (tx, _rx) = watch::channel(PageView::new("", PageState::Idle));
        Self {
            inner: Arc::new(Inner { client, tx }),
        }
    }

    /// A controller that immediately starts the featured-recipes load.
    pub fn mount(client: FetchClient) -> Self {
        let controller = Self::new(client);
        controller.submit("");
        controller
    }

    pub fn view(&self) -> PageView {
        self.inner.tx.borrow().clone()
    }

    pub fn state(&self) -> PageState {
        self.inner.tx.borrow().state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PageView> {
        self.inner.tx.subscribe()
    }

    /// Enter `Loading` for `query` and start exactly one fetch for it.
    pub fn submit(&self, query: impl Into<String>) {
        let query = query.into();
        let mut generation = 0;
        self.inner.tx.send_modify(|view| {
            view.generation += 1;
            view.query = query.clone();
            view.state = PageState::Loading;
            generation = view.generation;
        });
        debug!(query = %query, generation, "page load submitted");

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let outcome = load_results(&inner.client, &query).await;
            inner.tx.send_if_modified(|view| {
                if view.generation != generation {
                    debug!(generation, current = view.generation, "discarding superseded page load");
                    return false;
                }
                view.state = match outcome {
                    Ok(results) => PageState::Success { results },
                    Err(err) => {
                        warn!(query = %view.query, error = %err, "page load failed");
                        PageState::Error {
                            message: err.user_message(),
                        }
                    }
                };
                true
            });
        });
    }

    /// Re-submit the last query. Only meaningful from `Error`; returns
    /// whether a new load was started.
    pub fn retry(&self) -> bool {
        let query = {
            let view = self.inner.tx.borrow();
            if !matches!(view.state, PageState::Error { .. }) {
                return false;
            }
            view.query.clone()
        };
        self.submit(query);
        true
    }

    /// Wait until the current load (or whichever supersedes it) settles.
    pub async fn settled(&self) -> PageView {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|view| !view.state.is_loading()).await {
            Ok(view) => view.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.view(),
        };
        settled
    }
}

/// Blank queries show a random batch; anything else is a search.
async fn load_results(client: &FetchClient, query: &str) -> Result<Vec<Recipe>, FetchError> {
    if query.trim().is_empty() {
        Ok(client.random_recipes(DEFAULT_BATCH_SIZE).await?.recipes)
    } else {
        Ok(client
            .search_recipes(query, DEFAULT_BATCH_SIZE, 0)
            .await?
            .results)
    }
}
