//! JSON-file-backed SessionStore implementation.

use std::path::{Path, PathBuf};

use libris_core::error::{LibrisError, Result};
use libris_core::session::{Session, SessionStore};

use crate::storage::AtomicJsonFile;

/// Persists the session as a single JSON document.
///
/// The whole record (`user`, `access_token`, `refresh_token`) lives in one
/// file that is replaced atomically, which is what makes the store's
/// all-or-nothing contract hold across crashes: a reader finds either the
/// previous complete session or the new complete session, never a mix.
///
/// Layout:
/// ```text
/// base_dir/
/// └── session.json
/// ```
pub struct JsonSessionStore {
    file: AtomicJsonFile<Session>,
}

impl JsonSessionStore {
    const SESSION_FILE: &'static str = "session.json";

    /// Creates a store rooted at the specified base directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            file: AtomicJsonFile::new(base_dir.join(Self::SESSION_FILE)),
        })
    }

    /// Creates a store at the default location (~/.libris).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// directory cannot be created.
    pub fn default_location() -> Result<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| LibrisError::storage("failed to get home directory"))?;
        Self::new(home_dir.join(".libris"))
    }

    /// The file the session is persisted to.
    pub fn session_path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

impl SessionStore for JsonSessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        self.file.save(session)?;
        tracing::debug!(path = %self.file.path().display(), "session persisted");
        Ok(())
    }

    fn load(&self) -> Result<Option<Session>> {
        self.file.load()
    }

    fn clear(&self) -> Result<()> {
        self.file.remove()?;
        tracing::debug!(path = %self.file.path().display(), "session cleared");
        Ok(())
    }
}
