//! Time source for document timestamps and fingerprints.

use chrono::{DateTime, Utc};

/// Monotonic-enough wall clock seam; swapped for a manual clock in tests
/// so fingerprints are reproducible.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
