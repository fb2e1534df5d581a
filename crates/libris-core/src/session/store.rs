//! Session persistence trait.

use std::sync::Mutex;

use crate::error::Result;
use crate::session::model::Session;

/// Durable storage for the current session.
///
/// The contract is all-or-nothing: `save` writes the whole session record,
/// `clear` removes all of it, and `load` never observes a partial state
/// between calls. Implementations decide the medium (JSON file, embedded
/// DB, OS keychain); `SessionContext` is their only writer.
pub trait SessionStore: Send + Sync {
    /// Persists the session, replacing any previous one.
    fn save(&self, session: &Session) -> Result<()>;

    /// Returns the previously saved session, or `None` when logged out.
    fn load(&self) -> Result<Option<Session>>;

    /// Removes the persisted session entirely.
    fn clear(&self) -> Result<()>;
}

/// In-memory store, for tests and embedding scenarios that do not want
/// anything written to disk.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        *self.inner.lock().expect("session store lock poisoned") = Some(session.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Session>> {
        Ok(self.inner.lock().expect("session store lock poisoned").clone())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock().expect("session store lock poisoned") = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;

    #[test]
    fn test_save_load_clear_round_trip() {
        let store = MemorySessionStore::new();
        assert!(store.load().unwrap().is_none());

        let session = Session::new(User::new("alice"), "access-1", "refresh-1");
        store.save(&session).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, session);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
