//! duolink
//!
//! Wires the pairing, directory and sync services to one shared store.
//! Applications build a [`Config`] (usually from the environment) and call
//! [`Services::start`].

pub mod config;
pub mod services;

pub use config::{Config, ConfigError, StoreLocation};
pub use services::Services;

pub use duolink_chat as chat;
pub use duolink_db as db;
pub use duolink_pairing as pairing;
pub use duolink_types as types;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter. Calling it again is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duolink=debug,duolink_chat=debug,duolink_db=info,duolink_pairing=debug".into()),
        )
        .try_init();
}
