//! Single-flight deduplication of concurrent identical computations

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::domain::DomainError;

type SharedComputation<V> = Shared<BoxFuture<'static, Result<V, DomainError>>>;
type PendingMap<V> = Arc<Mutex<HashMap<String, SharedComputation<V>>>>;

/// Collapses concurrent computations for the same key into one execution
///
/// Every caller that arrives while a computation for its key is pending
/// receives a clone of that computation's result, including its error.
/// The pending slot is cleared when the computation finishes, so a later
/// call starts afresh.
pub struct Coalescer<V> {
    pending: PendingMap<V>,
}

impl<V> std::fmt::Debug for Coalescer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("in_flight", &lock(&self.pending).len())
            .finish()
    }
}

impl<V> Default for Coalescer<V> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn lock<V>(pending: &PendingMap<V>) -> MutexGuard<'_, HashMap<String, SharedComputation<V>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V> Coalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `compute` unless a computation for `key` is already pending
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> Result<V, DomainError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        let computation = {
            let mut pending = lock(&self.pending);

            match pending.get(key) {
                Some(existing) => {
                    debug!(key, "Joining in-flight computation");
                    existing.clone()
                }
                None => {
                    let registry = Arc::clone(&self.pending);
                    let owned_key = key.to_string();
                    let work = compute();

                    let computation = async move {
                        let result = work.await;
                        lock(&registry).remove(&owned_key);
                        result
                    }
                    .boxed()
                    .shared();

                    pending.insert(key.to_string(), computation.clone());
                    computation
                }
            }
        };

        computation.await
    }

    /// Number of keys with a pending computation
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.pending).contains_key(key)
    }
}
