use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("subject id must not be empty")]
    EmptySubject,

    #[error("pairing key must not be empty")]
    InvalidKey,

    #[error("malformed pairing payload")]
    MalformedToken,

    #[error("unknown error-correction level: {0:?}")]
    UnknownErrorCorrection(String),

    #[error("transfer encoding failed: {0}")]
    Encoding(String),
}
