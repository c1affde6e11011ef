//! # Vellum Store
//!
//! Authoritative document store for the Vellum patch synchronization
//! engine: document lifecycle, optimistic-concurrency preconditions, and
//! publish snapshots.
//!
//! ## Core Principles
//!
//! 1. **Server authority**: the store's content is the truth; clients
//!    resynchronize to it on conflict
//! 2. **Atomic conditional writes**: precondition check, patch
//!    application, and the write commit together, never as a separate
//!    read-then-write pair
//! 3. **Detect, don't merge**: stale writes are rejected with a conflict,
//!    never silently combined

mod clock;
mod document;
mod error;
mod guard;
mod store;

pub use clock::{Clock, SystemClock};
pub use document::{Document, PublishedSnapshot};
pub use error::StoreError;
pub use guard::check_preconditions;
pub use store::DocumentStore;
