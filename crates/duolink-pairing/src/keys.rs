use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

use crate::error::PairingError;

/// Process-wide secret used to sign pairing tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct PairingKey(Vec<u8>);

impl PairingKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, PairingError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(PairingError::InvalidKey);
        }
        Ok(Self(bytes))
    }

    /// Use a configured secret string as-is (its UTF-8 bytes are the key).
    pub fn from_secret(secret: &str) -> Result<Self, PairingError> {
        Self::from_bytes(secret.as_bytes())
    }

    /// Generate a random 256-bit key.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::rng().fill_bytes(&mut key);
        Self(key.to_vec())
    }

    /// Encode the key to base64 for provisioning.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, PairingError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| PairingError::InvalidKey)?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PairingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingKey([{} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrip() {
        let key = PairingKey::generate();
        assert_eq!(key.as_bytes().len(), 32);
        assert_eq!(PairingKey::from_base64(&key.to_base64()).unwrap(), key);
    }

    #[test]
    fn empty_keys_are_rejected() {
        assert!(matches!(PairingKey::from_secret(""), Err(PairingError::InvalidKey)));
        assert!(matches!(PairingKey::from_base64("!!"), Err(PairingError::InvalidKey)));
    }

    #[test]
    fn debug_hides_key_material() {
        let key = PairingKey::from_secret("hunter2").unwrap();
        let shown = format!("{key:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("7 bytes"));
    }
}
