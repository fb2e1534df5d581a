//! Resource query module.
//!
//! Read-side machinery for remote collections: composite cache keys and the
//! per-resource cache that de-duplicates in-flight fetches, guards against
//! stale responses, and is invalidated as a group by mutations.
//!
//! # Module Structure
//!
//! - `key`: resource names and parameter sets (`Resource`, `QueryParams`)
//! - `cache`: the cache itself (`ResourceCache`, `QueryStatus`)

mod cache;
mod key;

// Re-export public API
pub use cache::{QueryStatus, ResourceCache};
pub use key::{QueryParams, Resource};
