//! Document-level types shared by every store implementation.
//! Kept free of SQLite details so callers only depend on the contract.
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

pub type Document = serde_json::Map<String, Value>;

/// A document together with its identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Document,
}

impl DocumentSnapshot {
    /// Decode the body into `T`, injecting the document id under `id_field`
    /// first so types that carry their own id round-trip.
    pub fn decode_with_id<T: DeserializeOwned>(&self, id_field: &str) -> StoreResult<T> {
        let mut data = self.data.clone();
        data.insert(id_field.to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// Serialize `value` into a document. Fails if it is not a JSON object.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::NotAnObject(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { field: String, value: Value },
    /// Also matches documents where the field is absent.
    NotEq { field: String, value: Value },
    Lt { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn not_eq(field: &str, value: impl Into<Value>) -> Self {
        Self::NotEq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::Lt {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. } | Self::NotEq { field, .. } | Self::Lt { field, .. } => field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn collection(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        collection: String,
        id: String,
        doc: Document,
    },
    /// Merges top-level fields; the document must already exist.
    Update {
        collection: String,
        id: String,
        patch: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }
}

/// Writes committed together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    ops: Vec<WriteOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn set(&mut self, collection: &str, id: &str, doc: Document) -> &mut Self {
        self.add(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            doc,
        })
    }

    pub fn update(&mut self, collection: &str, id: &str, patch: Document) -> &mut Self {
        self.add(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        })
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.add(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Distinct collections touched, in first-seen order.
    pub fn collections(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for op in &self.ops {
            if !seen.iter().any(|c| c == op.collection()) {
                seen.push(op.collection().to_string());
            }
        }
        seen
    }
}

/// Emitted after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_reports_distinct_collections() {
        let mut batch = Batch::new();
        batch
            .set("messages", "m1", Document::new())
            .update("chatRooms", "a_b", Document::new())
            .delete("messages", "m0");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.collections(), vec!["messages", "chatRooms"]);
    }

    #[test]
    fn to_document_rejects_scalars() {
        assert!(matches!(to_document(&5), Err(StoreError::NotAnObject(_))));
        let doc = to_document(&json!({"a": 1})).unwrap();
        assert_eq!(doc["a"], 1);
    }

    #[test]
    fn decode_with_id_injects_identifier() {
        #[derive(serde::Deserialize)]
        struct Row {
            id: String,
            name: String,
        }
        let snapshot = DocumentSnapshot {
            id: "doc-1".into(),
            data: to_document(&json!({"name": "x"})).unwrap(),
        };
        let row: Row = snapshot.decode_with_id("id").unwrap();
        assert_eq!(row.id, "doc-1");
        assert_eq!(row.name, "x");
    }
}
