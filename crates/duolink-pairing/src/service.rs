use std::path::PathBuf;

use duolink_types::{PairingToken, TokenValidation};
use tracing::debug;

use crate::error::PairingError;
use crate::keys::PairingKey;
use crate::token;
use crate::transfer::{self, TransferOptions};

/// Issues and checks pairing tokens. One instance per process, built at
/// startup and shared by reference.
pub struct PairingService {
    key: PairingKey,
    transfer: TransferOptions,
}

impl PairingService {
    pub fn new(key: PairingKey, transfer: TransferOptions) -> Self {
        Self { key, transfer }
    }

    /// Sign `subject_id` as of `now_millis`. Same inputs, same token.
    pub fn generate_token(&self, subject_id: &str, now_millis: i64) -> Result<PairingToken, PairingError> {
        if subject_id.is_empty() {
            return Err(PairingError::EmptySubject);
        }

        Ok(PairingToken {
            subject_id: subject_id.to_string(),
            issued_at_millis: now_millis,
            signature: token::sign(&self.key, subject_id, now_millis)?,
        })
    }

    /// JSON payload carried inside the QR code.
    pub fn transfer_payload(&self, token: &PairingToken) -> Result<String, PairingError> {
        token::encode_payload(token)
    }

    pub fn render_svg(&self, token: &PairingToken) -> Result<String, PairingError> {
        transfer::render_svg(&token::encode_payload(token)?, &self.transfer)
    }

    /// Render the token as a QR code and write it to the output directory.
    /// Returns the path of the written artifact.
    pub async fn encode_for_transfer(&self, token: &PairingToken) -> Result<PathBuf, PairingError> {
        let svg = self.render_svg(token)?;
        let path = transfer::write_artifact(&token.subject_id, &svg, &self.transfer).await?;
        debug!(path = %path.display(), "pairing code written");
        Ok(path)
    }

    /// Check a scanned payload: freshness first, then the signature.
    /// Unparseable, expired and forged payloads all come back as rejected
    /// with no subject, so callers cannot tell them apart.
    pub fn validate_token(&self, payload: &str, now_millis: i64) -> TokenValidation {
        let Ok(token) = token::decode_payload(payload) else {
            debug!("pairing payload rejected");
            return TokenValidation::rejected();
        };

        if !token::is_fresh(&token, now_millis) || !token::verify_signature(&self.key, &token) {
            debug!("pairing payload rejected");
            return TokenValidation::rejected();
        }

        TokenValidation::accepted(token.subject_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TOKEN_TTL_MILLIS;

    const T0: i64 = 1_700_000_000_000;

    fn service() -> PairingService {
        PairingService::new(
            PairingKey::from_secret("test-secret-key").unwrap(),
            TransferOptions::default(),
        )
    }

    #[test]
    fn generated_token_validates() {
        let svc = service();
        let token = svc.generate_token("alice", T0).unwrap();
        let payload = svc.transfer_payload(&token).unwrap();

        let result = svc.validate_token(&payload, T0);
        assert_eq!(result, TokenValidation::accepted("alice".into()));
    }

    #[test]
    fn empty_subject_is_rejected() {
        assert!(matches!(service().generate_token("", T0), Err(PairingError::EmptySubject)));
    }

    #[test]
    fn expiry_boundary() {
        let svc = service();
        let payload = svc.transfer_payload(&svc.generate_token("alice", T0).unwrap()).unwrap();

        assert!(svc.validate_token(&payload, T0 + TOKEN_TTL_MILLIS - 1).valid);
        assert!(svc.validate_token(&payload, T0 + TOKEN_TTL_MILLIS).valid);
        assert_eq!(
            svc.validate_token(&payload, T0 + TOKEN_TTL_MILLIS + 1),
            TokenValidation::rejected()
        );
    }

    #[test]
    fn expired_and_forged_look_identical() {
        let svc = service();
        let token = svc.generate_token("alice", T0).unwrap();

        let expired = svc.validate_token(&svc.transfer_payload(&token).unwrap(), T0 + TOKEN_TTL_MILLIS + 1);

        let mut forged = token.clone();
        forged.signature = "0".repeat(64);
        let forged = svc.validate_token(&svc.transfer_payload(&forged).unwrap(), T0);

        let malformed = svc.validate_token("{not json", T0);

        assert_eq!(expired, forged);
        assert_eq!(forged, malformed);
    }

    #[test]
    fn any_single_character_change_to_signature_is_rejected() {
        let svc = service();
        let token = svc.generate_token("alice", T0).unwrap();

        let original = token.signature.as_bytes();
        for i in 0..original.len() {
            for replacement in [b'0', b'f', b'G', b'A', b' '] {
                if original[i] == replacement {
                    continue;
                }
                let mut bytes = original.to_vec();
                bytes[i] = replacement;
                let mut tampered = token.clone();
                tampered.signature = String::from_utf8(bytes).unwrap();
                let payload = svc.transfer_payload(&tampered).unwrap();
                assert!(!svc.validate_token(&payload, T0 + 1).valid, "position {i}");
            }
        }
    }

    #[test]
    fn future_dated_tokens_are_fresh() {
        let svc = service();
        let payload = svc.transfer_payload(&svc.generate_token("alice", T0 + 5_000).unwrap()).unwrap();
        assert!(svc.validate_token(&payload, T0).valid);
    }
}
