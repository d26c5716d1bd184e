use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("value for {0} is not a JSON object")]
    NotAnObject(String),

    #[error("invalid field name: {0:?}")]
    InvalidField(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_document() {
        let e = StoreError::NotFound {
            collection: "chatRooms".into(),
            id: "a_b".into(),
        };
        assert_eq!(e.to_string(), "document not found: chatRooms/a_b");
    }

    #[test]
    fn from_sqlite_error() {
        let e: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(e, StoreError::Sqlite(_)));
    }
}
