//! Session domain model.

use serde::{Deserialize, Serialize};

use crate::user::User;

/// The persisted session record.
///
/// Created on a successful login, cleared entirely on logout. The three
/// fields form an atomic group: a store never exposes a session with only
/// some of them present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The authenticated identity
    pub user: User,
    /// Bearer credential attached to every authenticated request
    pub access_token: String,
    /// Stored alongside the access token; no refresh flow consumes it
    pub refresh_token: String,
}

impl Session {
    /// Creates a session from a login response.
    pub fn new(
        user: User,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}
