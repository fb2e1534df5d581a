//! Per-resource query cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::error::{LibrisError, Result};
use crate::query::key::{QueryParams, Resource};

/// The pending fetch for one slot, shared by every caller that asked for
/// the same key while it was in flight.
type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<T>>>>;

enum SlotState<T> {
    /// Nothing cached; the next read starts a request
    Empty,
    InFlight(SharedFetch<T>),
    Ready(Arc<T>),
    Failed(LibrisError),
}

struct Slot<T> {
    /// Bumped whenever a new request starts and on every invalidation, so
    /// each request generation is distinguishable; a response only lands
    /// if the epoch it was issued under still matches (stale-response
    /// guard)
    epoch: u64,
    state: SlotState<T>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            epoch: 0,
            state: SlotState::Empty,
        }
    }
}

/// Observable status of one cache entry, for rendering.
#[derive(Debug, Clone)]
pub enum QueryStatus<T> {
    /// A request for this key is in flight
    Loading,
    /// The last request succeeded
    Ready(Arc<T>),
    /// The last request failed; the next read retries
    Error(LibrisError),
}

/// Cache for one remote collection, keyed by parameter set.
///
/// Guarantees, per distinct [`QueryParams`] key:
///
/// - at most one request in flight at a time: concurrent callers share the
///   pending result instead of fetching again;
/// - a successful result is served from cache until [`invalidate`] is
///   called for the whole resource;
/// - a failed request surfaces its error to every sharing caller and does
///   not poison the slot: the next explicit read starts a fresh request
///   (there is no automatic retry);
/// - a response that resolves after the resource was invalidated is
///   discarded rather than clobbering newer state.
///
/// Requests are driven by their callers. If every caller of a pending
/// fetch is dropped, the request is abandoned where it stands and the
/// cache is left untouched; a later read for the same key resumes it.
///
/// [`invalidate`]: ResourceCache::invalidate
pub struct ResourceCache<T> {
    resource: Resource,
    slots: Mutex<HashMap<QueryParams, Slot<T>>>,
}

impl<T: Send + Sync + 'static> ResourceCache<T> {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// Returns the cached value for `params`, or runs `fetch` to produce it.
    ///
    /// `fetch` is only invoked when the slot holds no usable value; when a
    /// request for the same key is already in flight the caller joins it
    /// instead.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error to every caller sharing the request.
    pub async fn fetch_with<F, Fut>(&self, params: QueryParams, fetch: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (pending, epoch) = {
            let mut slots = self.slots.lock().expect("query cache lock poisoned");
            let slot = slots.entry(params.clone()).or_insert_with(Slot::new);
            match &slot.state {
                SlotState::Ready(value) => return Ok(Arc::clone(value)),
                SlotState::InFlight(shared) => (shared.clone(), slot.epoch),
                SlotState::Empty | SlotState::Failed(_) => {
                    tracing::debug!(resource = %self.resource, ?params, "fetching");
                    let shared = fetch().map(|result| result.map(Arc::new)).boxed().shared();
                    slot.epoch += 1;
                    slot.state = SlotState::InFlight(shared.clone());
                    (shared, slot.epoch)
                }
            }
        };

        let result = pending.await;
        self.commit(&params, epoch, &result);
        result
    }

    /// Writes a resolved request back into its slot.
    ///
    /// Every sharing caller calls this; only the first write per request
    /// takes effect. A result from a previous epoch is dropped on the
    /// floor so a slow response cannot overwrite newer state.
    fn commit(&self, params: &QueryParams, epoch: u64, result: &Result<Arc<T>>) {
        let mut slots = self.slots.lock().expect("query cache lock poisoned");
        let Some(slot) = slots.get_mut(params) else {
            return;
        };
        if slot.epoch != epoch || !matches!(slot.state, SlotState::InFlight(_)) {
            tracing::debug!(resource = %self.resource, ?params, "discarding stale response");
            return;
        }
        slot.state = match result {
            Ok(value) => SlotState::Ready(Arc::clone(value)),
            Err(err) => SlotState::Failed(err.clone()),
        };
    }

    /// Observable status of the entry for `params`, if one exists.
    pub fn status(&self, params: &QueryParams) -> Option<QueryStatus<T>> {
        let slots = self.slots.lock().expect("query cache lock poisoned");
        match &slots.get(params)?.state {
            SlotState::Empty => None,
            SlotState::InFlight(_) => Some(QueryStatus::Loading),
            SlotState::Ready(value) => Some(QueryStatus::Ready(Arc::clone(value))),
            SlotState::Failed(err) => Some(QueryStatus::Error(err.clone())),
        }
    }

    /// Marks every entry of this resource stale.
    ///
    /// The next read of any key re-fetches, and responses still in flight
    /// at the time of the call no longer land.
    pub fn invalidate(&self) {
        let mut slots = self.slots.lock().expect("query cache lock poisoned");
        for slot in slots.values_mut() {
            slot.epoch += 1;
            slot.state = SlotState::Empty;
        }
        tracing::debug!(resource = %self.resource, "cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    fn page(n: u32) -> QueryParams {
        QueryParams::new().set("page", n)
    }

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_distinct_parameter_sets_are_independent() {
        let cache = ResourceCache::new(Resource::Books);
        let calls = Arc::new(AtomicUsize::new(0));

        let one = cache.fetch_with(page(1), counting_fetch(&calls, 1)).await.unwrap();
        let two = cache.fetch_with(page(2), counting_fetch(&calls, 2)).await.unwrap();
        assert_eq!((*one, *two), (1, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Re-reading page 1 serves the cached value, untouched by page 2.
        let again = cache.fetch_with(page(1), counting_fetch(&calls, 99)).await.unwrap();
        assert_eq!(*again, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_reads_share_one_request() {
        let cache = ResourceCache::new(Resource::MyBorrows);
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch_with(page(1), counting_fetch(&calls, 7)),
            cache.fetch_with(page(1), counting_fetch(&calls, 7)),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = ResourceCache::new(Resource::Books);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch_with(page(1), counting_fetch(&calls, 1)).await.unwrap();
        cache.fetch_with(page(1), counting_fetch(&calls, 1)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate();
        let value = cache.fetch_with(page(1), counting_fetch(&calls, 2)).await.unwrap();
        assert_eq!(*value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_surfaces_and_next_read_retries() {
        let cache: ResourceCache<u32> = ResourceCache::new(Resource::Recommendations);

        let err = cache
            .fetch_with(page(1), || async { Err(LibrisError::network("boom")) }.boxed())
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert!(matches!(
            cache.status(&page(1)),
            Some(QueryStatus::Error(_))
        ));

        // No automatic retry happened, but an explicit read starts fresh.
        let value = cache
            .fetch_with(page(1), || async { Ok(5) }.boxed())
            .await
            .unwrap();
        assert_eq!(*value, 5);
    }

    #[tokio::test]
    async fn test_late_failure_does_not_clobber_a_replacement_request() {
        let cache = Arc::new(ResourceCache::<u32>::new(Resource::Books));
        let gate = Arc::new(Notify::new());

        let err = cache
            .fetch_with(page(1), || async { Err(LibrisError::network("boom")) }.boxed())
            .await
            .unwrap_err();
        assert!(err.is_network());

        let retry = {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                cache
                    .fetch_with(page(1), move || async move {
                        gate.notified().await;
                        Ok(3)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await; // let the retry register

        // A second caller of the failed request wakes late and writes its
        // error back under the old epoch; the in-flight retry survives.
        cache.commit(&page(1), 1, &Err(LibrisError::network("boom")));

        gate.notify_one();
        let value = retry.await.unwrap().unwrap();
        assert_eq!(*value, 3);
        match cache.status(&page(1)) {
            Some(QueryStatus::Ready(value)) => assert_eq!(*value, 3),
            other => panic!("expected the retry result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let cache = Arc::new(ResourceCache::new(Resource::Books));
        let gate = Arc::new(Notify::new());

        let slow = {
            let cache = Arc::clone(&cache);
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                cache
                    .fetch_with(page(1), move || async move {
                        gate.notified().await;
                        Ok("old".to_string())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await; // let the slow request register

        cache.invalidate();
        let fresh = cache
            .fetch_with(page(1), || async { Ok("new".to_string()) })
            .await
            .unwrap();
        assert_eq!(*fresh, "new");

        // The slow response resolves last; its caller sees it, the cache
        // keeps the newer result.
        gate.notify_one();
        let old = slow.await.unwrap().unwrap();
        assert_eq!(*old, "old");
        match cache.status(&page(1)) {
            Some(QueryStatus::Ready(value)) => assert_eq!(*value, "new"),
            other => panic!("expected fresh value, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dropped_caller_leaves_cache_untouched() {
        let cache = ResourceCache::new(Resource::Books);
        let gate = Arc::new(Notify::new());

        {
            let gate = Arc::clone(&gate);
            let pending = cache.fetch_with(page(1), move || async move {
                gate.notified().await;
                Ok(1)
            });
            tokio::select! {
                biased;
                _ = pending => panic!("gated fetch should not resolve"),
                _ = tokio::task::yield_now() => {}
            }
        }

        // Abandoned, not failed: the slot still reports the request.
        assert!(matches!(cache.status(&page(1)), Some(QueryStatus::Loading)));

        cache.invalidate();
        let value = cache
            .fetch_with(page(1), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(*value, 2);
    }
}
