use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tracing::trace;

use crate::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{Batch, Direction, Document, DocumentSnapshot, Filter, Query, WriteOp};

impl Database {
    // -- Reads --

    pub fn get_document(&self, collection: &str, id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        self.with_conn(|conn| query_document(conn, collection, id))
    }

    pub fn query_documents(&self, query: &Query) -> StoreResult<Vec<DocumentSnapshot>> {
        self.with_conn(|conn| run_query(conn, query))
    }

    // -- Writes --

    /// Apply every op in one transaction, then announce the touched
    /// collections. A failing op rolls back the whole batch.
    pub fn commit_batch(&self, batch: &Batch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for op in batch.ops() {
                apply_op(&tx, op)?;
            }
            tx.commit()?;
            Ok(())
        })?;

        trace!(ops = batch.len(), "batch committed");
        self.notify(batch.collections());
        Ok(())
    }
}

fn apply_op(conn: &Connection, op: &WriteOp) -> StoreResult<()> {
    match op {
        WriteOp::Set {
            collection,
            id,
            doc,
        } => {
            // seq is assigned on first insert only, so overwrites keep their place
            conn.execute(
                "INSERT INTO documents (collection, id, seq, body)
                 VALUES (?1, ?2, COALESCE((SELECT MAX(seq) FROM documents), 0) + 1, ?3)
                 ON CONFLICT(collection, id)
                 DO UPDATE SET body = excluded.body, updated_at = datetime('now')",
                rusqlite::params![collection, id, serde_json::to_string(doc)?],
            )?;
        }
        WriteOp::Update {
            collection,
            id,
            patch,
        } => {
            let mut current = query_document(conn, collection, id)?
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.clone(),
                    id: id.clone(),
                })?
                .data;
            merge(&mut current, patch);
            conn.execute(
                "UPDATE documents SET body = ?1, updated_at = datetime('now')
                 WHERE collection = ?2 AND id = ?3",
                rusqlite::params![serde_json::to_string(&current)?, collection, id],
            )?;
        }
        WriteOp::Delete { collection, id } => {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, id],
            )?;
        }
    }
    Ok(())
}

fn merge(target: &mut Document, patch: &Document) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

fn query_document(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<DocumentSnapshot>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    body.map(|body| {
        Ok::<_, StoreError>(DocumentSnapshot {
            id: id.to_string(),
            data: serde_json::from_str(&body)?,
        })
    })
    .transpose()
}

fn run_query(conn: &Connection, query: &Query) -> StoreResult<Vec<DocumentSnapshot>> {
    let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
    let mut params: Vec<SqlValue> = vec![SqlValue::Text(query.collection.clone())];

    for filter in &query.filters {
        let (op, value) = match filter {
            Filter::Eq { value, .. } => ("IS", value),
            Filter::NotEq { value, .. } => ("IS NOT", value),
            Filter::Lt { value, .. } => ("<", value),
        };
        sql.push_str(&format!(" AND {} {} ?", field_expr(filter.field())?, op));
        params.push(sql_value(value));
    }

    match &query.order_by {
        Some(order) => {
            let dir = match order.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            // equal sort keys fall back to insertion order
            sql.push_str(&format!(
                " ORDER BY {} {dir}, seq {dir}",
                field_expr(&order.field)?
            ));
        }
        None => sql.push_str(" ORDER BY seq ASC"),
    }

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(i64::from(limit)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, body)| {
            Ok::<_, StoreError>(DocumentSnapshot {
                id,
                data: serde_json::from_str(&body)?,
            })
        })
        .collect()
}

/// Field names are spliced into SQL, so only plain identifiers are accepted.
fn field_expr(field: &str) -> StoreResult<String> {
    let valid = !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::InvalidField(field.to_string()));
    }
    Ok(format!("json_extract(body, '$.{field}')"))
}

/// Map a JSON value to what `json_extract` yields for it.
fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::to_document;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        to_document(&value).unwrap()
    }

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn put(db: &Database, collection: &str, id: &str, value: Value) {
        let mut batch = Batch::new();
        batch.set(collection, id, doc(value));
        db.commit_batch(&batch).unwrap();
    }

    #[test]
    fn set_then_get() {
        let db = db();
        put(&db, "rooms", "a_b", json!({"lastActivity": 10}));

        let snapshot = db.get_document("rooms", "a_b").unwrap().unwrap();
        assert_eq!(snapshot.id, "a_b");
        assert_eq!(snapshot.data["lastActivity"], 10);
        assert!(db.get_document("rooms", "missing").unwrap().is_none());
        assert!(db.get_document("other", "a_b").unwrap().is_none());
    }

    #[test]
    fn update_merges_top_level_fields() {
        let db = db();
        put(&db, "rooms", "a_b", json!({"id": "a_b", "lastActivity": 10}));

        let mut batch = Batch::new();
        batch.update("rooms", "a_b", doc(json!({"lastActivity": 20, "lastMessage": {"content": "hi"}})));
        db.commit_batch(&batch).unwrap();

        let data = db.get_document("rooms", "a_b").unwrap().unwrap().data;
        assert_eq!(data["id"], "a_b");
        assert_eq!(data["lastActivity"], 20);
        assert_eq!(data["lastMessage"]["content"], "hi");
    }

    #[test]
    fn failed_update_rolls_back_whole_batch() {
        let db = db();

        let mut batch = Batch::new();
        batch
            .set("messages", "m1", doc(json!({"content": "hi"})))
            .update("rooms", "nope", doc(json!({"lastActivity": 1})));
        let err = db.commit_batch(&batch).unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(db.get_document("messages", "m1").unwrap().is_none());
    }

    #[test]
    fn query_filters_orders_and_limits() {
        let db = db();
        put(&db, "messages", "m1", json!({"room": "r1", "ts": 1, "status": "read"}));
        put(&db, "messages", "m2", json!({"room": "r1", "ts": 3, "status": "sent"}));
        put(&db, "messages", "m3", json!({"room": "r2", "ts": 2, "status": "sent"}));
        put(&db, "messages", "m4", json!({"room": "r1", "ts": 2, "status": "sent"}));

        let query = Query::collection("messages")
            .filter(Filter::eq("room", "r1"))
            .order_by("ts", Direction::Descending)
            .limit(2);
        let ids: Vec<String> = db.query_documents(&query).unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["m2", "m4"]);

        let unread = Query::collection("messages")
            .filter(Filter::eq("room", "r1"))
            .filter(Filter::not_eq("status", "read"));
        assert_eq!(db.query_documents(&unread).unwrap().len(), 2);

        let older = Query::collection("messages")
            .filter(Filter::eq("room", "r1"))
            .filter(Filter::lt("ts", 3))
            .order_by("ts", Direction::Descending);
        let ids: Vec<String> = db.query_documents(&older).unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["m4", "m1"]);
    }

    #[test]
    fn equal_sort_keys_follow_insertion_order() {
        let db = db();
        for id in ["a", "b", "c"] {
            put(&db, "messages", id, json!({"ts": 5}));
        }

        let desc = Query::collection("messages").order_by("ts", Direction::Descending);
        let ids: Vec<String> = db.query_documents(&desc).unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);

        let asc = Query::collection("messages").order_by("ts", Direction::Ascending);
        let ids: Vec<String> = db.query_documents(&asc).unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn overwrite_keeps_insertion_slot() {
        let db = db();
        put(&db, "c", "first", json!({"v": 1}));
        put(&db, "c", "second", json!({"v": 2}));
        put(&db, "c", "first", json!({"v": 3}));

        let all = db.query_documents(&Query::collection("c")).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "first");
        assert_eq!(all[0].data["v"], 3);
    }

    #[test]
    fn boolean_filters_match_json_booleans() {
        let db = db();
        put(&db, "messages", "v", json!({"isVoiceMessage": true}));
        put(&db, "messages", "t", json!({"isVoiceMessage": false}));

        let voice = Query::collection("messages").filter(Filter::eq("isVoiceMessage", true));
        let found = db.query_documents(&voice).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "v");
    }

    #[test]
    fn rejects_unsafe_field_names() {
        let db = db();
        let query = Query::collection("c").filter(Filter::eq("a') OR 1=1 --", 1));
        assert!(matches!(db.query_documents(&query), Err(StoreError::InvalidField(_))));
    }

    #[test]
    fn delete_is_idempotent() {
        let db = db();
        put(&db, "c", "x", json!({}));

        for _ in 0..2 {
            let mut batch = Batch::new();
            batch.delete("c", "x");
            db.commit_batch(&batch).unwrap();
        }
        assert!(db.get_document("c", "x").unwrap().is_none());
    }
}
