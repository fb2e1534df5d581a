//! Borrow record domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::book::Book;

/// An active loan held by the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRecord {
    pub id: u64,
    /// The borrowed book, embedded as served by `my-borrows/`
    pub book: Book,
    pub borrowed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_service_shape() {
        let raw = r#"{
            "id": 3,
            "book": {"id": 7, "title": "Hexwood", "author": "Diana Wynne Jones", "genre": "Fantasy", "available_copies": 0},
            "borrowed_at": "2025-11-02T09:30:00Z"
        }"#;
        let record: BorrowRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.book.id, 7);
        assert_eq!(record.borrowed_at.to_rfc3339(), "2025-11-02T09:30:00+00:00");
    }
}
