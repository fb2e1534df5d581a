//! Typed endpoints of the remote lending API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use libris_core::book::{Book, RecommendedBook};
use libris_core::borrow::BorrowRecord;
use libris_core::error::{LibrisError, Result};
use libris_core::query::QueryParams;
use libris_core::user::User;

use crate::gateway::ApiGateway;

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

/// One page of the catalog listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookPage {
    pub results: Vec<Book>,
    /// URL of the following page; `None` on the last page
    pub next: Option<String>,
}

impl BookPage {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Collection endpoints answer either with a bare array or with a
/// `{"results": [...]}` page; both shapes must be accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListOrPage<T> {
    Bare(Vec<T>),
    Page { results: Vec<T> },
}

impl<T> ListOrPage<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) => items,
            Self::Page { results } => results,
        }
    }
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct BookRequest {
    book_id: u64,
}

/// The remote lending service, one method per consumed endpoint.
///
/// The query and mutation layers depend on this trait rather than on the
/// HTTP implementation, so they can be exercised against a scripted
/// in-memory double.
#[async_trait]
pub trait LendingApi: Send + Sync {
    /// `POST login/`
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;

    /// `POST register/`
    async fn register(&self, username: &str, password: &str) -> Result<()>;

    /// `GET books/?genre=&author=&available=&page=`
    async fn books(&self, params: &QueryParams) -> Result<BookPage>;

    /// `GET my-borrows/`
    async fn my_borrows(&self) -> Result<Vec<BorrowRecord>>;

    /// `GET recommendations/`
    async fn recommendations(&self) -> Result<Vec<RecommendedBook>>;

    /// `POST borrow/`
    async fn borrow(&self, book_id: u64) -> Result<()>;

    /// `POST return/`
    async fn return_book(&self, book_id: u64) -> Result<()>;
}

/// [`LendingApi`] over the real HTTP gateway.
pub struct HttpLendingApi {
    gateway: ApiGateway,
}

impl HttpLendingApi {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl LendingApi for HttpLendingApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        self.gateway
            .post_json("login/", &Credentials { username, password })
            .await
            .map_err(|err| match err {
                // A rejected login is an authentication failure, carrying
                // the service's own message for inline display
                LibrisError::Api { status, message } if (400..500).contains(&status) => {
                    LibrisError::auth(message)
                }
                other => other,
            })
    }

    async fn register(&self, username: &str, password: &str) -> Result<()> {
        self.gateway
            .post_unit("register/", &Credentials { username, password })
            .await
    }

    async fn books(&self, params: &QueryParams) -> Result<BookPage> {
        self.gateway.get_json("books/", params).await
    }

    async fn my_borrows(&self) -> Result<Vec<BorrowRecord>> {
        let list: ListOrPage<BorrowRecord> = self
            .gateway
            .get_json("my-borrows/", &QueryParams::new())
            .await?;
        Ok(list.into_vec())
    }

    async fn recommendations(&self) -> Result<Vec<RecommendedBook>> {
        let list: ListOrPage<RecommendedBook> = self
            .gateway
            .get_json("recommendations/", &QueryParams::new())
            .await?;
        Ok(list.into_vec())
    }

    async fn borrow(&self, book_id: u64) -> Result<()> {
        self.gateway.post_unit("borrow/", &BookRequest { book_id }).await
    }

    async fn return_book(&self, book_id: u64) -> Result<()> {
        self.gateway.post_unit("return/", &BookRequest { book_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_bare_array_shape() {
        let raw = r#"[{"id":1,"title":"Emma","author":"Jane Austen","genre":"Classic","available_copies":1,"read_count":3}]"#;
        let list: ListOrPage<RecommendedBook> = serde_json::from_str(raw).unwrap();
        let items = list.into_vec();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].read_count, 3);
    }

    #[test]
    fn test_accepts_paginated_shape() {
        let raw = r#"{"results":[{"id":1,"title":"Emma","author":"Jane Austen","genre":"Classic","available_copies":1,"read_count":3}]}"#;
        let list: ListOrPage<RecommendedBook> = serde_json::from_str(raw).unwrap();
        assert_eq!(list.into_vec().len(), 1);
    }

    #[test]
    fn test_book_page_last_page_has_no_next() {
        let raw = r#"{"results":[],"next":null}"#;
        let page: BookPage = serde_json::from_str(raw).unwrap();
        assert!(!page.has_next());

        let raw = r#"{"results":[],"next":"http://x/books/?page=2"}"#;
        let page: BookPage = serde_json::from_str(raw).unwrap();
        assert!(page.has_next());
    }

    #[test]
    fn test_request_bodies_match_the_wire_shape() {
        let body = serde_json::to_value(&BookRequest { book_id: 7 }).unwrap();
        assert_eq!(body, serde_json::json!({"book_id": 7}));

        let body = serde_json::to_value(&Credentials {
            username: "alice",
            password: "secret",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"username": "alice", "password": "secret"})
        );
    }
}
