pub mod error;
pub mod live;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use live::{Subscription, subscribe};
pub use models::{
    Batch, ChangeEvent, Direction, Document, DocumentSnapshot, Filter, OrderBy, Query, WriteOp,
    to_document,
};
pub use store::DocumentStore;

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{info, trace};

/// Capacity of the change feed. Slow live queries that fall further behind
/// than this re-query instead of replaying events.
const CHANGE_FEED_CAPACITY: usize = 1024;

/// SQLite-backed document store.
pub struct Database {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Database {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::from_connection(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Self::from_connection(Connection::open_in_memory()?)?;
        info!("In-memory database opened");
        Ok(db)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        migrations::run(&conn)?;

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut conn)
    }

    /// Announce committed writes. Having no live queries is not an error.
    fn notify(&self, collections: Vec<String>) {
        for collection in collections {
            trace!(%collection, "change event");
            let _ = self.changes.send(ChangeEvent { collection });
        }
    }
}
