//! Book catalog domain models.

use serde::{Deserialize, Serialize};

use crate::query::QueryParams;

/// A catalog entry owned by the remote service.
///
/// The client only ever holds read-only cached copies; `available_copies`
/// changes server-side when someone borrows or returns the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub available_copies: u32,
}

impl Book {
    /// Whether at least one copy can currently be borrowed.
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

/// A catalog entry ranked by popularity, as served by `recommendations/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedBook {
    #[serde(flatten)]
    pub book: Book,
    /// How often the book has been read, the ranking signal
    pub read_count: u64,
}

/// Catalog filter values.
///
/// Two copies of this struct exist in a browsing view: the free-form draft
/// the user is editing and the applied filter that actually parameterizes
/// the catalog query. `Default` is the empty filter (everything matches).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BookFilter {
    pub genre: String,
    pub author: String,
    pub available: Option<bool>,
}

impl BookFilter {
    /// Builds the parameter set for one page of the filtered catalog.
    ///
    /// All keys are always present, empty when unset, mirroring the query
    /// string the service expects (`books/?genre=&author=&available=&page=`).
    pub fn params(&self, page: u32) -> QueryParams {
        let available = match self.available {
            Some(true) => "true",
            Some(false) => "false",
            None => "",
        };
        QueryParams::new()
            .set("genre", &self.genre)
            .set("author", &self.author)
            .set("available", available)
            .set("page", page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_available() {
        let mut book = Book {
            id: 1,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: "Science Fiction".to_string(),
            available_copies: 2,
        };
        assert!(book.is_available());
        book.available_copies = 0;
        assert!(!book.is_available());
    }

    #[test]
    fn test_empty_filter_still_sends_all_keys() {
        let params = BookFilter::default().params(1);
        assert_eq!(params.get("genre"), Some(""));
        assert_eq!(params.get("author"), Some(""));
        assert_eq!(params.get("available"), Some(""));
        assert_eq!(params.get("page"), Some("1"));
    }

    #[test]
    fn test_filter_values_parameterize_the_key() {
        let filter = BookFilter {
            genre: "Fantasy".to_string(),
            author: String::new(),
            available: Some(true),
        };
        let params = filter.params(3);
        assert_eq!(params.get("genre"), Some("Fantasy"));
        assert_eq!(params.get("available"), Some("true"));
        assert_eq!(params.get("page"), Some("3"));
        assert_ne!(params, BookFilter::default().params(3));
    }

    #[test]
    fn test_recommended_book_flattens() {
        let raw = r#"{"id":9,"title":"Emma","author":"Jane Austen","genre":"Classic","available_copies":1,"read_count":57}"#;
        let rec: RecommendedBook = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.book.title, "Emma");
        assert_eq!(rec.read_count, 57);
    }
}
