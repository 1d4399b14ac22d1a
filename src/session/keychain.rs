//! OS keychain session store.
//!
//! Uses the `keyring` crate. The keychain cannot enumerate entries, so every
//! key written is also recorded in an index entry; `clear()` walks the index.

use keyring::Entry;

use super::{SessionStore, StoreError};

/// Keychain service name all entries are filed under.
pub const SERVICE_NAME: &str = "com.personamem.client";

/// Special username holding the JSON list of keys written so far.
const KEY_INDEX: &str = "__keys";

/// Whether `keyring` is built with a persistent backend for this target.
/// Elsewhere it falls back to a mock where every entry forgets its value.
pub const NATIVE_BACKEND: bool = cfg!(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "windows"
));

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        StoreError::Keychain(err.to_string())
    }
}

/// Raw credential access underneath the indexed store.
trait Credentials: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Idempotent: a missing entry is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

struct Keyring {
    service: String,
}

impl Keyring {
    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Credentials for Keyring {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct KeychainStore {
    creds: Box<dyn Credentials>,
}

impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            creds: Box::new(Keyring {
                service: service.into(),
            }),
        }
    }

    fn index(&self) -> Result<Vec<String>, StoreError> {
        match self.creds.read(KEY_INDEX)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_index(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return self.creds.delete(KEY_INDEX);
        }
        self.creds.write(KEY_INDEX, &serde_json::to_string(keys)?)
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl SessionStore for KeychainStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.creds.read(key)
    }

    /// The index is updated before the value, so a stored value is always
    /// reachable from `clear()`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut keys = self.index()?;
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            self.write_index(&keys)?;
        }
        self.creds.write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.creds.delete(key)?;
        let mut keys = self.index()?;
        let before = keys.len();
        keys.retain(|k| k != key);
        if keys.len() != before {
            self.write_index(&keys)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        for key in self.index()? {
            self.creds.delete(&key)?;
        }
        self.creds.delete(KEY_INDEX)
    }
}
