//! Session context: the persistent token store and the token held in it.
//!
//! The store is a profile-scoped key-value map. The session token lives under
//! one fixed key; `clear()` wipes every key, not just the token.

pub mod file;
pub mod keychain;

pub use file::FileStore;
pub use keychain::KeychainStore;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::Engine;
use thiserror::Error;

/// Default key the session token is stored under.
pub const DEFAULT_TOKEN_KEY: &str = "token";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("Keychain operation failed: {0}")]
    Keychain(String),
    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No session token stored")]
    NoToken,
    #[error("Invalid JWT format")]
    MalformedToken,
    #[error("Failed to decode JWT payload: {0}")]
    Payload(String),
    #[error("JWT payload missing 'sub' claim")]
    MissingSubject,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistent key-value storage backing the session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Remove every key in the store.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store. Nothing survives the process; used headless and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.clear();
        Ok(())
    }
}

/// Explicit session context shared by the request executor and the CLI.
///
/// Wraps the injected store so callers never touch the token key directly.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
    token_key: String,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>, token_key: impl Into<String>) -> Self {
        Self {
            store,
            token_key: token_key.into(),
        }
    }

    /// Current session token, if any.
    ///
    /// A store that cannot be read counts as "no token"; the caller will send
    /// the user back to the entry point, which is the only recovery anyway.
    pub fn token(&self) -> Option<String> {
        match self.store.get(&self.token_key) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                log::warn!("Failed to read session token: {}", e);
                None
            }
        }
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(&self.token_key, token)?;
        log::info!("Session token stored");
        Ok(())
    }

    /// Wipe the whole store (not only the token).
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        log::info!("Session store cleared");
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// User ID (`sub` claim) of the stored token.
    pub fn subject(&self) -> Result<String, SessionError> {
        let token = self.token().ok_or(SessionError::NoToken)?;
        extract_subject_from_jwt(&token)
    }
}

/// Extract the `sub` claim from a JWT access token.
///
/// Decodes the payload without verification; the server verifies the token on
/// every request, the client only needs the ID for display.
pub fn extract_subject_from_jwt(token: &str) -> Result<String, SessionError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(SessionError::MalformedToken);
    }

    let payload = parts[1].trim_end_matches('=');
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| SessionError::Payload(e.to_string()))?;

    let json: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|e| SessionError::Payload(e.to_string()))?;

    json["sub"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or(SessionError::MissingSubject)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_jwt(payload: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
        let payload = engine.encode(payload.as_bytes());
        format!("{}.{}.fake-signature", header, payload)
    }

    #[test]
    fn test_memory_store_clear_removes_every_key() {
        let store = MemoryStore::new();
        store.set("token", "abc").unwrap();
        store.set("theme", "dark").unwrap();
        assert_eq!(store.len(), 2);

        store.clear().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.get("theme").unwrap(), None);
    }

    #[test]
    fn test_session_token_roundtrip() {
        let session = Session::new(Arc::new(MemoryStore::new()), DEFAULT_TOKEN_KEY);
        assert_eq!(session.token(), None);

        session.set_token("abc").unwrap();
        assert_eq!(session.token().as_deref(), Some("abc"));
        assert_eq!(
            session.store().get(DEFAULT_TOKEN_KEY).unwrap().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_session_empty_token_counts_as_absent() {
        let session = Session::new(Arc::new(MemoryStore::new()), DEFAULT_TOKEN_KEY);
        session.set_token("").unwrap();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn test_extract_subject_from_jwt() {
        let token = make_jwt("{\"sub\":\"user-123-abc\",\"exp\":1700000000}");
        assert_eq!(extract_subject_from_jwt(&token).unwrap(), "user-123-abc");
    }

    #[test]
    fn test_extract_subject_invalid_jwt() {
        assert!(matches!(
            extract_subject_from_jwt("not-a-jwt"),
            Err(SessionError::MalformedToken)
        ));
    }

    #[test]
    fn test_extract_subject_missing_sub() {
        let token = make_jwt("{\"exp\":1700000000}");
        assert!(matches!(
            extract_subject_from_jwt(&token),
            Err(SessionError::MissingSubject)
        ));
    }

    #[test]
    fn test_session_subject_without_token() {
        let session = Session::new(Arc::new(MemoryStore::new()), DEFAULT_TOKEN_KEY);
        assert!(matches!(session.subject(), Err(SessionError::NoToken)));
    }
}
