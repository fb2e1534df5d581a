//! Session lifecycle management.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::error::Result;
use crate::session::model::Session;
use crate::session::store::SessionStore;
use crate::user::User;

/// The two states of the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No session; only public views may render
    Anonymous,
    /// A session exists for this user
    Authenticated(User),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// In-memory holder of the current identity.
///
/// `SessionContext` owns the login/logout lifecycle and is the single
/// writer of the [`SessionStore`]. The initial state is derived
/// synchronously from the store at construction, so a persisted session
/// survives a restart. State transitions are broadcast on a watch channel
/// so views can react (a logout while a protected view is showing must
/// redirect to the login view).
///
/// Only two transitions exist: Anonymous → Authenticated via [`login`] and
/// Authenticated → Anonymous via [`logout`]. There is deliberately no
/// "credential refreshed" transition; the refresh token is persisted as
/// part of the session group but no flow consumes it.
///
/// [`login`]: SessionContext::login
/// [`logout`]: SessionContext::logout
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    session: RwLock<Option<Session>>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionContext {
    /// Rehydrates the context from the persisted store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn from_store(store: Arc<dyn SessionStore>) -> Result<Self> {
        let session = store.load()?;
        let state = match &session {
            Some(session) => SessionState::Authenticated(session.user.clone()),
            None => SessionState::Anonymous,
        };
        tracing::debug!(restored = session.is_some(), "session context initialized");

        let (state_tx, _) = watch::channel(state);
        Ok(Self {
            store,
            session: RwLock::new(session),
            state_tx,
        })
    }

    /// Returns the current state of the state machine.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Returns the current user while authenticated.
    pub fn current_user(&self) -> Option<User> {
        self.session
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|session| session.user.clone())
    }

    /// Returns the bearer credential the gateway should attach, if any.
    pub fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Anonymous → Authenticated.
    ///
    /// Persists the session first, then updates the in-memory identity, so
    /// an observer never sees an authenticated context whose session is not
    /// durable yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write; in that case the
    /// context stays in its previous state.
    pub fn login(
        &self,
        user: User,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<()> {
        let session = Session::new(user.clone(), access_token, refresh_token);
        self.store.save(&session)?;
        *self.session.write().expect("session lock poisoned") = Some(session);
        self.state_tx
            .send_replace(SessionState::Authenticated(user.clone()));
        tracing::info!(username = %user.username, "logged in");
        Ok(())
    }

    /// Authenticated → Anonymous.
    ///
    /// Clears the persisted session and the in-memory identity, then
    /// broadcasts the transition. Views subscribed to [`subscribe`] use
    /// that signal to navigate back to the login view.
    ///
    /// [`subscribe`]: SessionContext::subscribe
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the clear.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        *self.session.write().expect("session lock poisoned") = None;
        self.state_tx.send_replace(SessionState::Anonymous);
        tracing::info!("logged out");
        Ok(())
    }
}
