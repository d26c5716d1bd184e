use serde::{Deserialize, Serialize};

// -- Pairing --

/// Outcome of checking a scanned pairing payload. Expired and forged
/// tokens produce the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
}

impl TokenValidation {
    pub fn rejected() -> Self {
        Self {
            valid: false,
            subject_id: None,
        }
    }

    pub fn accepted(subject_id: String) -> Self {
        Self {
            valid: true,
            subject_id: Some(subject_id),
        }
    }
}
