//! Cache key types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A named remote collection.
///
/// Invalidation operates on whole resources: a mutation that affects the
/// catalog stales every `Books` entry at once, regardless of parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Books,
    MyBorrows,
    Recommendations,
}

impl Resource {
    /// The path segment the service serves this resource under.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::MyBorrows => "my-borrows",
            Self::Recommendations => "recommendations",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parameter half of a resource key.
///
/// Backed by a sorted map so that two parameter sets with the same entries
/// are the same key no matter the insertion order, and so the resulting
/// query string is deterministic. Any difference in any entry yields a
/// distinct key and therefore an independent cache slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one parameter, builder style.
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a = QueryParams::new().set("genre", "Fantasy").set("page", 1);
        let b = QueryParams::new().set("page", 1).set("genre", "Fantasy");
        assert_eq!(a, b);
    }

    #[test]
    fn test_any_parameter_change_is_a_new_key() {
        let base = QueryParams::new().set("genre", "Fantasy").set("page", 1);
        assert_ne!(base, base.clone().set("page", 2));
        assert_ne!(base, base.clone().set("genre", "Horror"));
    }

    #[test]
    fn test_serializes_as_query_pairs() {
        let params = QueryParams::new().set("page", 2).set("genre", "Fantasy");
        let encoded = serde_json::to_value(&params).unwrap();
        assert_eq!(encoded["genre"], "Fantasy");
        assert_eq!(encoded["page"], "2");
    }
}
