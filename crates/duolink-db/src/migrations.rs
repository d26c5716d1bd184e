use rusqlite::Connection;
use tracing::info;

use crate::error::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (documents)");
        conn.execute_batch(
            "
            CREATE TABLE documents (
                collection  TEXT NOT NULL,
                id          TEXT NOT NULL,
                seq         INTEGER NOT NULL,
                body        TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX idx_documents_collection_seq
                ON documents(collection, seq);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        // next-seq lookups scan the whole table without this
        info!("Running migration v2 (seq index)");
        conn.execute_batch(
            "
            CREATE INDEX idx_documents_seq ON documents(seq);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
