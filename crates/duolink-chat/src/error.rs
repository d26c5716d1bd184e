use duolink_db::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    /// The store rejected a read or write. Nothing is retried here.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

pub type ChatResult<T> = Result<T, ChatError>;
