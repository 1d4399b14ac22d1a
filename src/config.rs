//! Runtime configuration read from the environment.
//!
//! `.env` is loaded by the binary before `Config::from_env()` runs, so both
//! real environment variables and dotenv entries are honored.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::navigation::DEFAULT_ENTRY_PATH;
use crate::notify::TOAST_DURATION;
use crate::session::{keychain, DEFAULT_TOKEN_KEY};

/// Default API location (the PersonaMem dev server).
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8001";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown token store '{0}' (expected file, keychain or memory)")]
    UnknownStore(String),
    #[error("Token store '{0}' has no persistent backend on this platform")]
    UnsupportedStore(String),
    #[error("Invalid {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenStoreKind {
    #[default]
    File,
    Keychain,
    Memory,
}

impl FromStr for TokenStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(TokenStoreKind::File),
            "keychain" if keychain::NATIVE_BACKEND => Ok(TokenStoreKind::Keychain),
            "keychain" => Err(ConfigError::UnsupportedStore("keychain".to_string())),
            "memory" => Ok(TokenStoreKind::Memory),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub entry_path: String,
    pub token_key: String,
    pub token_store: TokenStoreKind,
    /// Overrides the file store location.
    pub storage_path: Option<PathBuf>,
    pub toast_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            entry_path: DEFAULT_ENTRY_PATH.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            token_store: TokenStoreKind::default(),
            storage_path: None,
            toast_duration: TOAST_DURATION,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        // PERSONA_API_URL > API_URL > default
        if let Some(url) = get("PERSONA_API_URL").or_else(|| get("API_URL")) {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = get("PERSONA_ENTRY_PATH") {
            config.entry_path = if path.starts_with('/') {
                path
            } else {
                format!("/{}", path)
            };
        }
        if let Some(key) = get("PERSONA_TOKEN_KEY") {
            config.token_key = key;
        }
        if let Some(kind) = get("PERSONA_TOKEN_STORE") {
            config.token_store = kind.parse()?;
        }
        config.storage_path = get("PERSONA_STORAGE_PATH").map(PathBuf::from);
        if let Some(ms) = get("PERSONA_TOAST_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PERSONA_TOAST_MS",
                value: ms.clone(),
            })?;
            config.toast_duration = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.entry_path, "/");
        assert_eq!(config.token_key, "token");
        assert_eq!(config.token_store, TokenStoreKind::File);
        assert_eq!(config.toast_duration, Duration::from_millis(3200));
        assert!(config.storage_path.is_none());
    }

    #[test]
    fn test_api_url_precedence() {
        let config = Config::from_lookup(lookup(&[
            ("API_URL", "http://fallback"),
            ("PERSONA_API_URL", "https://persona.example/"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://persona.example");

        let config = Config::from_lookup(lookup(&[
            ("API_URL", "http://fallback"),
            ("PERSONA_API_URL", ""),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://fallback");
    }

    #[test]
    fn test_keychain_only_where_it_persists() {
        let parsed = "keychain".parse::<TokenStoreKind>();
        if keychain::NATIVE_BACKEND {
            assert_eq!(parsed.unwrap(), TokenStoreKind::Keychain);
        } else {
            assert!(matches!(parsed, Err(ConfigError::UnsupportedStore(_))));
        }
        if cfg!(any(target_os = "macos", target_os = "linux", target_os = "windows")) {
            assert!(keychain::NATIVE_BACKEND);
        }
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PERSONA_ENTRY_PATH", "login"),
            ("PERSONA_TOKEN_KEY", "access_token"),
            ("PERSONA_TOKEN_STORE", "Memory"),
            ("PERSONA_STORAGE_PATH", "/tmp/persona.json"),
            ("PERSONA_TOAST_MS", "1500"),
        ]))
        .unwrap();
        assert_eq!(config.entry_path, "/login");
        assert_eq!(config.token_key, "access_token");
        assert_eq!(config.token_store, TokenStoreKind::Memory);
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/persona.json")));
        assert_eq!(config.toast_duration, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PERSONA_TOKEN_STORE", "cookie")])),
            Err(ConfigError::UnknownStore(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("PERSONA_TOAST_MS", "soon")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
