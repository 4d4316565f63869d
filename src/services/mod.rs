//! Composition root
//!
//! Everything the commands use is built here once from `Config` and handed
//! down explicitly. There is no global client.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::core::data::database::SqliteBackend;
use crate::core::query::client::QueryClient;
use crate::error::Result;
use crate::signal_handler::ShutdownSignal;

pub mod factory;

pub use factory::ServiceFactory;

pub struct Services {
    config: Arc<Config>,
    client: QueryClient,
    sqlite: Option<Arc<SqliteBackend>>,
    shutdown: ShutdownSignal,
}

impl Services {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_shutdown(config, ShutdownSignal::new())
    }

    pub fn with_shutdown(config: Config, shutdown: ShutdownSignal) -> Result<Self> {
        let factory = ServiceFactory::new(Arc::new(config));
        let (backend, sqlite) = factory.create_backend()?;
        let session = factory.create_session()?;
        let cache = factory.create_cache(&session)?;

        debug!(
            backend = backend.name(),
            authenticated = session.is_authenticated(),
            cached = cache.len(),
            "Services ready"
        );

        Ok(Self {
            config: factory.config(),
            client: QueryClient::new(backend, cache, session),
            sqlite,
            shutdown,
        })
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// The local database, when the SQLite backend is configured.
    pub fn sqlite(&self) -> Option<&SqliteBackend> {
        self.sqlite.as_deref()
    }

    /// A token scoped to one command, cancelled on shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Persist the cache index if configured. Failures are logged, not raised.
    pub fn shutdown(&self) {
        if !self.config.persist_cache {
            return;
        }
        let index_path = self.config.cache_index_path();
        if let Err(e) = self.client.save_cache(&index_path) {
            warn!("Failed to save cache index {}: {}", index_path.display(), e);
        }
    }
}
