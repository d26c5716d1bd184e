use std::path::PathBuf;

use duolink_pairing::{ErrorCorrection, PairingKey, TransferOptions};
use thiserror::Error;

pub const ENV_PAIRING_SECRET: &str = "DUOLINK_PAIRING_SECRET";
pub const ENV_DB_PATH: &str = "DUOLINK_DB_PATH";
pub const ENV_QR_DIR: &str = "DUOLINK_QR_DIR";
pub const ENV_QR_EC_LEVEL: &str = "DUOLINK_QR_EC_LEVEL";
pub const ENV_QR_SIZE: &str = "DUOLINK_QR_SIZE";

/// Secrets shipped in sample configs. Starting with one of these would let
/// anyone forge pairing codes.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "your-secret-key",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Prefix marking a secret as base64 key material from `PairingKey::to_base64`.
const BASE64_PREFIX: &str = "base64:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DUOLINK_PAIRING_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pairing_key: PairingKey,
    pub store: StoreLocation,
    pub transfer: TransferOptions,
}

impl Config {
    /// Read configuration from the process environment, loading `.env`
    /// first if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret = lookup(ENV_PAIRING_SECRET).unwrap_or_default();
        let secret = secret.trim();
        if secret.is_empty() || PLACEHOLDER_SECRETS.contains(&secret) {
            return Err(ConfigError::MissingSecret);
        }
        let pairing_key = match secret.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => PairingKey::from_base64(encoded),
            None => PairingKey::from_secret(secret),
        }
        .map_err(|e| invalid(ENV_PAIRING_SECRET, e))?;

        let store = match lookup(ENV_DB_PATH).as_deref() {
            Some(":memory:") => StoreLocation::InMemory,
            Some(path) if !path.is_empty() => StoreLocation::File(path.into()),
            _ => StoreLocation::File("duolink.db".into()),
        };

        let mut transfer = TransferOptions::default();
        if let Some(dir) = lookup(ENV_QR_DIR).filter(|d| !d.is_empty()) {
            transfer.output_dir = dir.into();
        }
        if let Some(level) = lookup(ENV_QR_EC_LEVEL) {
            transfer.error_correction = level
                .parse::<ErrorCorrection>()
                .map_err(|e| invalid(ENV_QR_EC_LEVEL, e))?;
        }
        if let Some(size) = lookup(ENV_QR_SIZE) {
            transfer.size_px = match size.trim().parse::<u32>() {
                Ok(px) if px > 0 => px,
                Ok(_) => return Err(invalid(ENV_QR_SIZE, "must be positive")),
                Err(e) => return Err(invalid(ENV_QR_SIZE, e)),
            };
        }

        Ok(Self {
            pairing_key,
            store,
            transfer,
        })
    }
}

fn invalid(var: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.to_string(),
    }
}
