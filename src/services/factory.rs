use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{BackendKind, Config};
use crate::core::data::database::SqliteBackend;
use crate::core::infrastructure::cache::QueryCache;
use crate::core::infrastructure::session::Session;
use crate::core::services::backend::Backend;
use crate::core::services::rest::RestBackend;
use crate::error::{ConfigError, Result};

/// Builds each core service from configuration, one constructor per concern.
pub struct ServiceFactory {
    config: Arc<Config>,
}

impl ServiceFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn create_sqlite_backend(&self) -> Result<SqliteBackend> {
        SqliteBackend::open(&self.config.database_path)
    }

    pub fn create_rest_backend(&self) -> Result<RestBackend> {
        let api_url = self.config.api_url.as_deref().ok_or_else(|| ConfigError::MissingField {
            field: "api_url".to_string(),
        })?;
        RestBackend::new(
            api_url,
            self.config.api_key.clone(),
            self.config.access_token.clone(),
            self.config.request_timeout(),
            self.config.max_query_attempts,
        )
    }

    /// The configured backend, plus the SQLite handle when that is the one in use
    pub fn create_backend(&self) -> Result<(Arc<dyn Backend>, Option<Arc<SqliteBackend>>)> {
        match self.config.backend {
            BackendKind::Rest => {
                info!("Using REST backend at {}", self.config.api_url.as_deref().unwrap_or("?"));
                let rest: Arc<dyn Backend> = Arc::new(self.create_rest_backend()?);
                Ok((rest, None))
            }
            BackendKind::Sqlite => {
                let sqlite = Arc::new(self.create_sqlite_backend()?);
                let backend: Arc<dyn Backend> = sqlite.clone();
                Ok((backend, Some(sqlite)))
            }
        }
    }

    /// Access token first, then the configured local user, else anonymous.
    pub fn create_session(&self) -> Result<Session> {
        if let Some(token) = self.config.access_token.as_deref() {
            let session = Session::from_access_token(token)?;
            if !session.is_authenticated() {
                warn!("Configured access token has expired; requests will run without an identity");
            }
            return Ok(session);
        }
        match self.config.user_id.as_deref() {
            Some(user_id) => Ok(Session::local(user_id)),
            None => {
                debug!("No access token or user id configured");
                Ok(Session::anonymous())
            }
        }
    }

    /// The query cache, reloaded from disk only if `session` saved it.
    pub fn create_cache(&self, session: &Session) -> Result<QueryCache> {
        let ttl = self.config.cache_ttl();
        let max_entries = self.config.cache_max_entries;
        if self.config.persist_cache {
            QueryCache::load(&self.config.cache_index_path(), ttl, max_entries, session.user_id())
        } else {
            Ok(QueryCache::new(ttl, max_entries))
        }
    }

    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        Config {
            database_path: dir.path().join("herd.db"),
            ..Config::default()
        }
    }

    #[test]
    fn test_session_precedence() {
        let dir = TempDir::new().unwrap();
        let anonymous = ServiceFactory::new(Arc::new(config(&dir))).create_session().unwrap();
        assert!(!anonymous.is_authenticated());

        let local = ServiceFactory::new(Arc::new(Config {
            user_id: Some("user-9".to_string()),
            ..config(&dir)
        }))
        .create_session()
        .unwrap();
        assert_eq!(local.user_id(), Some("user-9"));
    }

    #[test]
    fn test_sqlite_backend_is_exposed() {
        let dir = TempDir::new().unwrap();
        let factory = ServiceFactory::new(Arc::new(config(&dir)));
        let (backend, sqlite) = factory.create_backend().unwrap();
        assert_eq!(backend.name(), "sqlite");
        assert!(sqlite.is_some());
        assert!(dir.path().join("herd.db").exists());
    }

    #[test]
    fn test_rest_backend_needs_url() {
        let dir = TempDir::new().unwrap();
        let factory = ServiceFactory::new(Arc::new(Config {
            backend: BackendKind::Rest,
            ..config(&dir)
        }));
        assert!(factory.create_backend().is_err());
    }
}
