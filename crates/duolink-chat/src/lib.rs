//! Two-party conversations on top of a document store: canonical room
//! identity, atomic sends, live ordered message windows and read receipts.

pub mod clock;
pub mod directory;
pub mod documents;
pub mod error;
pub mod sync;

pub use clock::{Clock, SteppingClock, SystemClock};
pub use directory::{ConversationDirectory, room_id_for};
pub use duolink_db::Subscription;
pub use error::{ChatError, ChatResult};
pub use sync::{LIVE_WINDOW, OutgoingMessage, SyncEngine};

use std::sync::Arc;

use duolink_db::{DocumentStore, StoreError, StoreResult};

/// Run a store call on the blocking pool so async callers never block a
/// runtime worker on SQLite.
pub(crate) async fn on_store<T, F>(store: &Arc<dyn DocumentStore>, f: F) -> ChatResult<T>
where
    F: FnOnce(&dyn DocumentStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
        .map_err(ChatError::from)
}
