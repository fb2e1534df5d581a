//! Query and mutation layers over the lending API.

use std::sync::Arc;

use libris_core::book::{BookFilter, RecommendedBook};
use libris_core::borrow::BorrowRecord;
use libris_core::error::Result;
use libris_core::query::{QueryParams, Resource, ResourceCache};

use crate::api::{BookPage, LendingApi};

/// Resources staled by a successful borrow: every paginated/filtered
/// variant of the listing (availability changed) and the caller's loans.
const BORROW_INVALIDATES: &[Resource] = &[Resource::Books, Resource::MyBorrows];

/// Resources staled by a successful return; same groups as borrowing.
const RETURN_INVALIDATES: &[Resource] = &[Resource::Books, Resource::MyBorrows];

/// Read/mutate/invalidate hub for the remote collections.
///
/// Reads go through one [`ResourceCache`] per resource, so repeated
/// renders are free and concurrent identical reads collapse into a single
/// request. Mutations call the API and, on success only, invalidate the
/// cache groups their static table names; any view bound to those
/// resources re-fetches on its next read.
///
/// Mutations are deliberately not de-duplicated: at-most-one-in-flight is
/// a read-side guarantee, and the service treats borrow/return as
/// idempotent.
pub struct LibraryService {
    api: Arc<dyn LendingApi>,
    books: ResourceCache<BookPage>,
    borrows: ResourceCache<Vec<BorrowRecord>>,
    recommendations: ResourceCache<Vec<RecommendedBook>>,
}

impl LibraryService {
    pub fn new(api: Arc<dyn LendingApi>) -> Self {
        Self {
            api,
            books: ResourceCache::new(Resource::Books),
            borrows: ResourceCache::new(Resource::MyBorrows),
            recommendations: ResourceCache::new(Resource::Recommendations),
        }
    }

    /// One page of the catalog under the applied filter.
    pub async fn books(&self, filter: &BookFilter, page: u32) -> Result<Arc<BookPage>> {
        let params = filter.params(page);
        let api = Arc::clone(&self.api);
        let request = params.clone();
        self.books
            .fetch_with(params, move || async move { api.books(&request).await })
            .await
    }

    /// The current user's active loans.
    pub async fn my_borrows(&self) -> Result<Arc<Vec<BorrowRecord>>> {
        let api = Arc::clone(&self.api);
        self.borrows
            .fetch_with(QueryParams::new(), move || async move {
                api.my_borrows().await
            })
            .await
    }

    /// Personalized recommendations.
    pub async fn recommendations(&self) -> Result<Arc<Vec<RecommendedBook>>> {
        let api = Arc::clone(&self.api);
        self.recommendations
            .fetch_with(QueryParams::new(), move || async move {
                api.recommendations().await
            })
            .await
    }

    /// Borrows one book. On success the affected cache groups are staled;
    /// on failure the error is surfaced and every cache stays as it was.
    pub async fn borrow(&self, book_id: u64) -> Result<()> {
        self.api.borrow(book_id).await?;
        tracing::info!(book_id, "borrowed");
        self.invalidate_groups(BORROW_INVALIDATES);
        Ok(())
    }

    /// Returns one borrowed book; invalidation mirrors [`borrow`].
    ///
    /// [`borrow`]: LibraryService::borrow
    pub async fn return_book(&self, book_id: u64) -> Result<()> {
        self.api.return_book(book_id).await?;
        tracing::info!(book_id, "returned");
        self.invalidate_groups(RETURN_INVALIDATES);
        Ok(())
    }

    fn invalidate_groups(&self, resources: &[Resource]) {
        for resource in resources {
            match resource {
                Resource::Books => self.books.invalidate(),
                Resource::MyBorrows => self.borrows.invalidate(),
                Resource::Recommendations => self.recommendations.invalidate(),
            }
        }
    }
}
