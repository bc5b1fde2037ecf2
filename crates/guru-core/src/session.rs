//! Credential store
//!
//! Holds the bearer token and display name for the current user. The
//! session is constructed once and passed to the flows that need it; it
//! never performs network I/O.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::view::Surface;

/// Shown when no display name has been stored
pub const FALLBACK_DISPLAY_NAME: &str = "Student";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCredential {
    token: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct Session {
    stored: StoredCredential,
    path: Option<PathBuf>,
}

impl Session {
    /// A session that lives only in memory
    pub fn ephemeral() -> Self {
        Self::default()
    }

    /// Load a session file. A missing file is an empty session.
    pub fn load(path: &Path) -> Result<Self> {
        let stored = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content)
                .map_err(|e| anyhow!("Invalid session file {:?}: {}", path, e))?
        } else {
            StoredCredential::default()
        };

        Ok(Self {
            stored,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Config::config_dir()?.join("session.json"))
    }

    /// Store the credential. The in-memory value is updated even if writing
    /// the session file fails.
    pub fn set_credential(&mut self, token: Option<&str>, display_name: &str) -> Result<()> {
        self.stored.token = token.map(str::to_string);
        self.stored.display_name = Some(display_name.to_string());
        self.persist()
    }

    pub fn token(&self) -> Option<&str> {
        self.stored.token.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.stored
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
    }

    /// Forget the credential. Returns the surface the caller should show next.
    pub fn clear(&mut self) -> Surface {
        self.stored = StoredCredential::default();
        if let Err(e) = self.persist() {
            tracing::warn!("Failed to persist cleared session: {}", e);
        }
        Surface::Login
    }

    /// Where a client should start: straight to chat if a token is stored
    pub fn initial_surface(&self) -> Surface {
        if self.stored.token.is_some() {
            Surface::Chat
        } else {
            Surface::Login
        }
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.stored)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        let session = Session::ephemeral();
        assert_eq!(session.display_name(), "Student");
        assert_eq!(session.token(), None);
        assert_eq!(session.initial_surface(), Surface::Login);
    }

    #[test]
    fn test_set_and_clear() {
        let mut session = Session::ephemeral();
        session.set_credential(Some("tok-1"), "asha").unwrap();
        assert_eq!(session.token(), Some("tok-1"));
        assert_eq!(session.display_name(), "asha");
        assert_eq!(session.initial_surface(), Surface::Chat);

        assert_eq!(session.clear(), Surface::Login);
        assert_eq!(session.token(), None);
        assert_eq!(session.display_name(), "Student");
    }

    #[test]
    fn test_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guru").join("session.json");

        let mut session = Session::load(&path).unwrap();
        session.set_credential(Some("tok-2"), "bikash").unwrap();

        let reloaded = Session::load(&path).unwrap();
        assert_eq!(reloaded.token(), Some("tok-2"));
        assert_eq!(reloaded.display_name(), "bikash");
    }

    #[test]
    fn test_clear_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = Session::load(&path).unwrap();
        session.set_credential(Some("tok-3"), "chandra").unwrap();
        session.clear();

        let reloaded = Session::load(&path).unwrap();
        assert_eq!(reloaded.token(), None);
        assert_eq!(reloaded.initial_surface(), Surface::Login);
    }

    #[test]
    fn test_cookie_login_without_token() {
        let mut session = Session::ephemeral();
        session.set_credential(None, "dipa").unwrap();
        assert_eq!(session.token(), None);
        assert_eq!(session.display_name(), "dipa");
    }

    #[test]
    fn test_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(Session::load(&path).is_err());
    }
}
