use std::sync::Arc;

use anyhow::Context;
use duolink_chat::{Clock, ConversationDirectory, SyncEngine, SystemClock};
use duolink_db::{Database, DocumentStore};
use duolink_pairing::PairingService;
use tracing::info;

use crate::config::{Config, StoreLocation};

/// The running services, all sharing one store.
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub pairing: PairingService,
    pub directory: ConversationDirectory,
    pub sync: SyncEngine,
}

impl Services {
    /// Open the configured store and build every service on top of it.
    pub fn start(config: Config) -> anyhow::Result<Self> {
        let db = match &config.store {
            StoreLocation::File(path) => Database::open(path)
                .with_context(|| format!("opening store at {}", path.display()))?,
            StoreLocation::InMemory => Database::open_in_memory().context("opening in-memory store")?,
        };

        let services = Self::with_store(Arc::new(db), Arc::new(SystemClock), config);
        info!("duolink services started");
        Ok(services)
    }

    /// Build the services over an existing store and clock.
    pub fn with_store(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            pairing: PairingService::new(config.pairing_key, config.transfer),
            directory: ConversationDirectory::new(store.clone(), clock.clone()),
            sync: SyncEngine::new(store.clone(), clock),
            store,
        }
    }
}
