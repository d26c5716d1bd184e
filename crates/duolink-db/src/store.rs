use tokio::sync::broadcast;
use uuid::Uuid;

use crate::Database;
use crate::error::StoreResult;
use crate::models::{Batch, ChangeEvent, Document, DocumentSnapshot, Query};

/// Collection/document database the chat core is written against.
///
/// Single-document writes default to one-op batches so every write goes
/// through `commit` and is announced on the change feed exactly once.
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<DocumentSnapshot>>;

    fn query(&self, query: &Query) -> StoreResult<Vec<DocumentSnapshot>>;

    /// All ops apply or none do.
    fn commit(&self, batch: Batch) -> StoreResult<()>;

    /// Receiver for events emitted after each successful commit.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;

    fn new_id(&self, _collection: &str) -> String {
        Uuid::new_v4().to_string()
    }

    fn set(&self, collection: &str, id: &str, doc: Document) -> StoreResult<()> {
        let mut batch = Batch::new();
        batch.set(collection, id, doc);
        self.commit(batch)
    }

    fn update(&self, collection: &str, id: &str, patch: Document) -> StoreResult<()> {
        let mut batch = Batch::new();
        batch.update(collection, id, patch);
        self.commit(batch)
    }

    fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut batch = Batch::new();
        batch.delete(collection, id);
        self.commit(batch)
    }
}

impl DocumentStore for Database {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        self.get_document(collection, id)
    }

    fn query(&self, query: &Query) -> StoreResult<Vec<DocumentSnapshot>> {
        self.query_documents(query)
    }

    fn commit(&self, batch: Batch) -> StoreResult<()> {
        self.commit_batch(&batch)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::to_document;
    use serde_json::json;

    #[test]
    fn single_writes_announce_their_collection() {
        let db = Database::open_in_memory().unwrap();
        let mut feed = db.changes();

        db.set("chatRooms", "a_b", to_document(&json!({"id": "a_b"})).unwrap())
            .unwrap();
        db.update("chatRooms", "a_b", to_document(&json!({"x": 1})).unwrap())
            .unwrap();
        db.delete("chatRooms", "a_b").unwrap();

        for _ in 0..3 {
            assert_eq!(feed.try_recv().unwrap().collection, "chatRooms");
        }
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn rejected_batches_are_not_announced() {
        let db = Database::open_in_memory().unwrap();
        let mut feed = db.changes();

        let err = db
            .update("chatRooms", "missing", to_document(&json!({"x": 1})).unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn generated_ids_are_unique() {
        let db = Database::open_in_memory().unwrap();
        assert_ne!(db.new_id("messages"), db.new_id("messages"));
    }
}
