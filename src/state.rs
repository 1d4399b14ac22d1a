//! Application state for the `persona` front end.
//!
//! Wires the injected collaborators together once: token store, navigator,
//! transport, toast surface and clipboard. Everything downstream borrows from
//! here instead of reaching for globals.

use std::sync::Arc;

use crate::api::{ApiClient, ReqwestTransport};
use crate::clipboard::ClipboardWriter;
use crate::config::{Config, TokenStoreKind};
use crate::navigation::{LogNavigator, Navigator};
use crate::notify::{NotificationSink, StderrSink, Toaster};
use crate::session::{FileStore, KeychainStore, MemoryStore, Session, SessionStore, StoreError};

pub struct AppState {
    pub config: Config,
    /// HTTP client for PersonaMem API communication.
    pub api: Arc<ApiClient<ReqwestTransport>>,
    pub toaster: Arc<Toaster>,
    pub clipboard: ClipboardWriter,
}

impl AppState {
    /// Build state with the production collaborators for `config`.
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let store = open_store(&config)?;
        let navigator: Arc<dyn Navigator> =
            Arc::new(LogNavigator::new(&config.api_base_url, &config.entry_path));
        let sink: Arc<dyn NotificationSink> = Arc::new(StderrSink);
        Ok(Self::with_parts(config, store, navigator, sink))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let session = Session::new(store, config.token_key.clone());
        let transport = ReqwestTransport::new(&config.api_base_url);
        let api = Arc::new(ApiClient::new(transport, session, navigator));
        let toaster = Arc::new(Toaster::new(sink).with_duration(config.toast_duration));
        let clipboard = ClipboardWriter::system(Arc::clone(&toaster));

        Self {
            config,
            api,
            toaster,
            clipboard,
        }
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn SessionStore>, StoreError> {
    let store: Arc<dyn SessionStore> = match config.token_store {
        TokenStoreKind::Memory => Arc::new(MemoryStore::new()),
        TokenStoreKind::Keychain => Arc::new(KeychainStore::default()),
        TokenStoreKind::File => {
            let path = config
                .storage_path
                .clone()
                .or_else(FileStore::default_path)
                .ok_or_else(|| {
                    StoreError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no data directory for the session store",
                    ))
                })?;
            log::debug!("Session store at {}", path.display());
            Arc::new(FileStore::new(path))
        }
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::tests::RecordingSink;

    #[test]
    fn test_file_store_honors_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            storage_path: Some(dir.path().join("store.json")),
            ..Config::default()
        };

        let state = AppState::new(config).unwrap();
        state.session().set_token("abc").unwrap();
        assert!(dir.path().join("store.json").exists());
    }

    #[test]
    fn test_with_parts_shares_the_injected_store() {
        let store = Arc::new(MemoryStore::new());
        let config = Config {
            token_key: "access".into(),
            ..Config::default()
        };
        let state = AppState::with_parts(
            config,
            store.clone(),
            Arc::new(LogNavigator::new("http://localhost", "/")),
            Arc::new(RecordingSink::default()),
        );

        state.session().set_token("xyz").unwrap();
        assert_eq!(store.get("access").unwrap().as_deref(), Some("xyz"));
    }
}
