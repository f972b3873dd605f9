//! Registry of pending requests, used to coalesce duplicate concurrent calls.
//!
//! The first caller for a fingerprint spawns the starter on its own task and
//! publishes a [`Shared`] completion; later callers clone that completion
//! instead of starting a second call. The work runs to completion even if
//! every caller stops waiting, and the entry is removed the moment it
//! resolves.

use crate::fetch::Payload;
use crate::spoonacular::{FetchError, Fingerprint};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Completion signal observed by every caller joined on one pending request.
pub type Completion = Shared<BoxFuture<'static, Result<Payload, FetchError>>>;

struct InFlightEntry {
    completion: Completion,
    waiters: Arc<AtomicUsize>,
    /// Distinguishes this entry from a later one under the same fingerprint.
    generation: u64,
}

#[derive(Clone, Default)]
pub struct InFlightRegistry {
    entries: Arc<DashMap<Fingerprint, InFlightEntry>>,
    next_generation: Arc<AtomicU64>,
}

/// Removes the registry entry when the starter finishes, or if its task unwinds.
struct ReleaseOnDrop {
    registry: InFlightRegistry,
    key: Fingerprint,
    generation: u64,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.generation);
    }
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the pending call for `key`, or start one with `starter`.
    ///
    /// `starter` is invoked at most once per pending window and runs on a
    /// spawned task, so this must be called from within a Tokio runtime.
    pub fn join<F, Fut>(&self, key: Fingerprint, starter: F) -> Completion
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Payload, FetchError>> + Send + 'static,
    {
        let (completion, sender, generation) = match self.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                let entry = occupied.get();
                let waiters = entry.waiters.fetch_add(1, Ordering::AcqRel) + 1;
                debug!(fingerprint = %key, waiters, "joined in-flight request");
                return entry.completion.clone();
            }
            Entry::Vacant(vacant) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel::<Result<Payload, FetchError>>();
                let completion: Completion = async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(FetchError::Network(
                            "request task ended without a result".to_owned(),
                        ))
                    })
                }
                .boxed()
                .shared();
                vacant.insert(InFlightEntry {
                    completion: completion.clone(),
                    waiters: Arc::new(AtomicUsize::new(1)),
                    generation,
                });
                (completion, tx, generation)
            }
        };

        let release = ReleaseOnDrop {
            registry: self.clone(),
            key,
            generation,
        };
        tokio::spawn(async move {
            let result = starter().await;
            // Release before notifying: anyone arriving after this sees the cache instead.
            drop(release);
            let _ = sender.send(result);
        });

        completion
    }

    fn release(&self, key: &Fingerprint, generation: u64) {
        if let Some((_, entry)) = self
            .entries
            .remove_if(key, |_, entry| entry.generation == generation)
        {
            trace!(
                fingerprint = %key,
                waiters = entry.waiters.load(Ordering::Acquire),
                "in-flight request released"
            );
        }
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of callers attached to the pending request for `key`, if any.
    pub fn waiters(&self, key: &Fingerprint) -> Option<usize> {
        self.entries
            .get(key)
            .map(|entry| entry.waiters.load(Ordering::Acquire))
    }
}
