//! User identity domain model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The identity record returned by the login endpoint.
///
/// Only `username` is interpreted client-side. Whatever else the service
/// includes (ids, e-mail, profile fields) is carried along opaquely in
/// `extra` so it survives a persist/reload round trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Login name, also used for display
    pub username: String,
    /// Remaining identity fields, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Creates a user with no extra identity fields.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let raw = r#"{"username":"alice","id":42,"email":"a@example.com"}"#;
        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.extra.get("id"), Some(&Value::from(42)));

        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back.get("email"), Some(&Value::from("a@example.com")));
    }
}
