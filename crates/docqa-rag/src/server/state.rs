//! Application state for the document Q&A server

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RagConfig;
use crate::error::Result;
use crate::ingestion::DocumentProcessor;
use crate::providers::{CloudProviderFactory, ProviderFactory, Providers};
use crate::server::session::SessionManager;
use crate::storage::CollectionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: Arc<RagConfig>,
    /// Collection store shared by every session
    store: CollectionStore,
    /// Live sessions
    sessions: SessionManager,
    /// Builds per-session providers from user credentials
    factory: Arc<dyn ProviderFactory>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Open the on-disk collection store and use the cloud providers
    pub fn new(config: RagConfig) -> Result<Self> {
        let config = Arc::new(config);
        let path = config.vector_db.database_path();
        tracing::info!("Opening collection store at {}", path.display());

        let store = CollectionStore::open(&path)?;
        let factory = Arc::new(CloudProviderFactory::new(config.clone()));
        Ok(Self::with_factory(config, store, factory))
    }

    /// Build state around an existing store and provider factory
    pub fn with_factory(
        config: Arc<RagConfig>,
        store: CollectionStore,
        factory: Arc<dyn ProviderFactory>,
    ) -> Self {
        let sessions = SessionManager::new(
            Duration::from_secs(config.sessions.idle_ttl_secs),
            config.chat.history_turns,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                sessions,
                factory,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &Arc<RagConfig> {
        &self.inner.config
    }

    /// Get the collection store
    pub fn store(&self) -> &CollectionStore {
        &self.inner.store
    }

    /// Get the session registry
    pub fn sessions(&self) -> &SessionManager {
        &self.inner.sessions
    }

    /// Get the provider factory
    pub fn factory(&self) -> &Arc<dyn ProviderFactory> {
        &self.inner.factory
    }

    /// Processor using one session's providers
    pub fn processor(&self, providers: Providers) -> DocumentProcessor {
        DocumentProcessor::new(self.inner.config.clone(), self.inner.store.clone(), providers)
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
