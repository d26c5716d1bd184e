// Pairing token signing - HMAC-SHA256 over "subject:issued_at_millis"

use duolink_types::PairingToken;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::PairingError;
use crate::keys::PairingKey;

type HmacSha256 = Hmac<Sha256>;

/// Tokens older than this are rejected.
pub const TOKEN_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Wire shape of a scanned code.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TransferPayload {
    user_id: String,
    timestamp: i64,
    signature: String,
}

pub fn sign(key: &PairingKey, subject_id: &str, issued_at_millis: i64) -> Result<String, PairingError> {
    let mac = keyed_mac(key, subject_id, issued_at_millis)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of `token.signature`. Only canonical lowercase hex
/// is accepted so a token has exactly one valid encoding.
pub fn verify_signature(key: &PairingKey, token: &PairingToken) -> bool {
    if !is_canonical_hex(&token.signature) {
        return false;
    }
    let Ok(provided) = hex::decode(&token.signature) else {
        return false;
    };
    match keyed_mac(key, &token.subject_id, token.issued_at_millis) {
        Ok(mac) => mac.verify_slice(&provided).is_ok(),
        Err(_) => false,
    }
}

/// `now - issued_at` within the TTL; exactly the TTL still counts as fresh.
pub fn is_fresh(token: &PairingToken, now_millis: i64) -> bool {
    now_millis.saturating_sub(token.issued_at_millis) <= TOKEN_TTL_MILLIS
}

pub fn encode_payload(token: &PairingToken) -> Result<String, PairingError> {
    let payload = TransferPayload {
        user_id: token.subject_id.clone(),
        timestamp: token.issued_at_millis,
        signature: token.signature.clone(),
    };
    serde_json::to_string(&payload).map_err(|e| PairingError::Encoding(e.to_string()))
}

pub fn decode_payload(payload: &str) -> Result<PairingToken, PairingError> {
    let parsed: TransferPayload =
        serde_json::from_str(payload).map_err(|_| PairingError::MalformedToken)?;
    if parsed.user_id.is_empty() {
        return Err(PairingError::MalformedToken);
    }
    Ok(PairingToken {
        subject_id: parsed.user_id,
        issued_at_millis: parsed.timestamp,
        signature: parsed.signature,
    })
}

fn keyed_mac(key: &PairingKey, subject_id: &str, issued_at_millis: i64) -> Result<HmacSha256, PairingError> {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| PairingError::InvalidKey)?;
    mac.update(format!("{subject_id}:{issued_at_millis}").as_bytes());
    Ok(mac)
}

fn is_canonical_hex(signature: &str) -> bool {
    signature.len() == 64 && signature.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
