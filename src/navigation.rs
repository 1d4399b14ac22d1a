//! Navigation capability used when a session ends.

/// Application entry point every redirect targets.
pub const DEFAULT_ENTRY_PATH: &str = "/";

/// Sends the user back to the application entry point.
///
/// The request executor calls this when no token is stored and when the
/// server rejects the token. Test doubles record calls instead.
pub trait Navigator: Send + Sync {
    fn redirect_to_entry(&self);
}

/// Navigator for headless front ends: there is no page to leave, so the
/// redirect is reported and the user is told where to sign in again.
pub struct LogNavigator {
    entry_url: String,
}

impl LogNavigator {
    pub fn new(base_url: &str, entry_path: &str) -> Self {
        Self {
            entry_url: format!("{}{}", base_url.trim_end_matches('/'), entry_path),
        }
    }

    pub fn entry_url(&self) -> &str {
        &self.entry_url
    }
}

impl Navigator for LogNavigator {
    fn redirect_to_entry(&self) {
        log::info!("Redirecting to entry point {}", self.entry_url);
        eprintln!("Signed out. Sign in again at {}", self.entry_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_url_joins_without_double_slash() {
        let nav = LogNavigator::new("http://localhost:8001/", DEFAULT_ENTRY_PATH);
        assert_eq!(nav.entry_url(), "http://localhost:8001/");

        let nav = LogNavigator::new("http://localhost:8001", "/app");
        assert_eq!(nav.entry_url(), "http://localhost:8001/app");
    }
}
