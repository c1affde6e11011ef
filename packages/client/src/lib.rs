//! # Vellum Client
//!
//! Client side of the Vellum patch synchronization engine.
//!
//! ```text
//! keystrokes ──► strategy: encode one Change (positional or
//!                          content-addressed)
//!                    │
//!                    ▼
//!                buffer: coalesce into one whole-content delta,
//!                        idle/max-wait timers, conflict + retry
//!                    │
//!                    ▼
//!                driver: tokio task running the timers and the
//!                        transport round-trips
//! ```
//!
//! ## Core Principles
//!
//! 1. **One flush in flight**: the Flushing state gates dispatch; edits
//!    arriving mid-flight are tracked, never raced
//! 2. **Coalesce, don't replay**: a flush sends one whole-content replace
//!    against the last confirmed baseline, not a keystroke log
//! 3. **Conflicts reload, never merge**: a rejected precondition surfaces
//!    to the caller; the stale write is not retried

mod buffer;
mod driver;
mod error;
mod strategy;
mod transport;

pub use buffer::{
    BufferConfig, BufferState, ChangeBuffer, FlushDisposition, FlushOutcome, FlushRequest,
    FlushToken,
};
pub use driver::{spawn_sync, SyncEvent, SyncHandle};
pub use error::SyncError;
pub use strategy::{
    encode_edit, select, Decision, EditContext, Rule, Strategy, QUEUE_DEPTH_THRESHOLD,
    STALE_SYNC_THRESHOLD,
};
pub use transport::{PatchResponse, PatchTransport, TransportError};
