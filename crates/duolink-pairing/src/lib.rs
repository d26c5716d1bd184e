//! duolink pairing
//!
//! Contact pairing over an out-of-band channel: one user shows a QR code
//! carrying a signed, time-limited token; the other scans it and the token
//! is checked before the two are linked.
//!
//! Tokens are HMAC-SHA256 over `subject:issued_at_millis` with a single
//! process-wide key and stay valid for 24 hours.

pub mod error;
pub mod keys;
pub mod service;
pub mod token;
pub mod transfer;

pub use error::PairingError;
pub use keys::PairingKey;
pub use service::PairingService;
pub use token::TOKEN_TTL_MILLIS;
pub use transfer::{ErrorCorrection, TransferOptions};
