//! Live queries: a standing query whose full result set is pushed to a
//! listener every time it changes.
//!
//! Each subscription runs on its own tokio task. The task re-runs the query
//! on the blocking pool whenever the change feed reports a write to the
//! query's collection, and calls the listener only when the result set
//! actually differs from the last one delivered.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::models::{ChangeEvent, DocumentSnapshot, Query};
use crate::store::DocumentStore;

/// Set to true on detach. The task holds the lock while calling the
/// listener, so detaching waits out a callback already in progress.
type Detached = Arc<Mutex<bool>>;

fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a running live query. Dropping it detaches the listener too.
///
/// Detaching from inside the listener itself deadlocks.
#[must_use = "dropping a Subscription detaches it immediately"]
pub struct Subscription {
    token: CancellationToken,
    detached: Detached,
}

impl Subscription {
    /// Detach the listener. It is not invoked again after this returns.
    pub fn unsubscribe(self) {
        // Drop does the work
    }

    pub fn is_active(&self) -> bool {
        !*lock(&self.detached)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        *lock(&self.detached) = true;
        self.token.cancel();
    }
}

/// Start a live query. The listener first receives the current result set,
/// then a fresh one after every change that alters it. Query failures are
/// handed to the listener and the subscription stays attached.
///
/// Must be called from within a tokio runtime.
pub fn subscribe<F>(store: Arc<dyn DocumentStore>, query: Query, listener: F) -> Subscription
where
    F: Fn(StoreResult<Vec<DocumentSnapshot>>) + Send + Sync + 'static,
{
    // Subscribe to the feed before the first read so no write slips between them
    let changes = store.changes();
    let token = CancellationToken::new();
    let detached = Detached::default();

    tokio::spawn(run(store, query, listener, changes, token.clone(), detached.clone()));

    Subscription { token, detached }
}

async fn run<F>(
    store: Arc<dyn DocumentStore>,
    query: Query,
    listener: F,
    mut changes: broadcast::Receiver<ChangeEvent>,
    token: CancellationToken,
    detached: Detached,
) where
    F: Fn(StoreResult<Vec<DocumentSnapshot>>) + Send + Sync + 'static,
{
    let mut last: Option<Vec<DocumentSnapshot>> = None;

    loop {
        let result = fetch(&store, &query).await;

        let attached = {
            let guard = lock(&detached);
            if *guard {
                false
            } else {
                match result {
                    Ok(docs) => {
                        if last.as_ref() != Some(&docs) {
                            listener(Ok(docs.clone()));
                            last = Some(docs);
                        }
                    }
                    Err(e) => {
                        warn!(collection = %query.collection, error = %e, "live query failed");
                        listener(Err(e));
                    }
                }
                true
            }
        };

        if !attached || !wait_for_change(&mut changes, &query.collection, &token).await {
            break;
        }
    }

    debug!(collection = %query.collection, "live query detached");
}

async fn fetch(store: &Arc<dyn DocumentStore>, query: &Query) -> StoreResult<Vec<DocumentSnapshot>> {
    let store = store.clone();
    let query = query.clone();
    tokio::task::spawn_blocking(move || store.query(&query))
        .await
        .map_err(|e| StoreError::Unavailable(format!("live query task failed: {e}")))?
}

/// Returns false when the subscription should stop.
async fn wait_for_change(
    changes: &mut broadcast::Receiver<ChangeEvent>,
    collection: &str,
    token: &CancellationToken,
) -> bool {
    loop {
        tokio::select! {
            _ = token.cancelled() => return false,
            event = changes.recv() => match event {
                Ok(event) if event.collection == collection => return true,
                Ok(_) => continue,
                // Missed events: a re-query catches up, snapshots are idempotent
                Err(RecvError::Lagged(_)) => return true,
                Err(RecvError::Closed) => return false,
            },
        }
    }
}
