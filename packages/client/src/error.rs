//! Error types for the sync client

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The buffer was destroyed (document closed); the edit was dropped.
    #[error("Buffer destroyed")]
    BufferDestroyed,

    /// The driver task is gone; commands can no longer be delivered.
    #[error("Sync driver is not running")]
    DriverStopped,
}
