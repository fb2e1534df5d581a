//! Session domain module.
//!
//! Everything the client knows about "who is logged in": the persisted
//! session record, the store abstraction it is saved through, and the
//! in-memory context that owns the login/logout lifecycle.
//!
//! # Module Structure
//!
//! - `model`: the persisted session record (`Session`)
//! - `store`: persistence trait (`SessionStore`) and an in-memory implementation
//! - `context`: the session state machine (`SessionContext`, `SessionState`)

mod context;
mod model;
mod store;

// Re-export public API
pub use context::{SessionContext, SessionState};
pub use model::Session;
pub use store::{MemorySessionStore, SessionStore};
