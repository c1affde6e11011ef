//! # Sync Driver
//!
//! Owns one [`ChangeBuffer`] per open document and runs its timers.
//!
//! The driver is a single tokio task: it multiplexes incoming commands
//! with the buffer's next deadline, dispatches at most one request at a
//! time (edits arriving mid-flight queue behind the await), and surfaces
//! results as [`SyncEvent`]s. The suspension points are exactly the two
//! timers and the network call.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::buffer::{ChangeBuffer, FlushDisposition, FlushOutcome, FlushRequest};
use crate::transport::{PatchTransport, TransportError};
use crate::SyncError;

#[derive(Debug)]
enum SyncCommand {
    Edit(String),
    ForceFlush,
    Shutdown,
}

/// What happened to the document, as seen from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A flush landed; the baseline advanced.
    Saved { version: u64, fingerprint: String },
    /// The server rejected a stale write; reload authoritative state.
    Conflict,
    /// A transient failure; `will_retry` is false once attempts are
    /// exhausted.
    Error { message: String, will_retry: bool },
}

/// Handle for feeding a running driver.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    pub async fn edit(&self, content: impl Into<String>) -> Result<(), SyncError> {
        self.commands
            .send(SyncCommand::Edit(content.into()))
            .await
            .map_err(|_| SyncError::DriverStopped)
    }

    /// Flush immediately (used on navigation away).
    pub async fn force_flush(&self) -> Result<(), SyncError> {
        self.commands
            .send(SyncCommand::ForceFlush)
            .await
            .map_err(|_| SyncError::DriverStopped)
    }

    /// Final flush, then tear the driver down.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SyncCommand::Shutdown).await;
    }
}

/// Spawn a driver for `document_id` over `transport`.
///
/// Returns the command handle and the event stream. Dropping the handle
/// (all clones) shuts the driver down after a final flush.
pub fn spawn_sync(
    document_id: String,
    transport: Arc<dyn PatchTransport>,
    buffer: ChangeBuffer,
) -> (SyncHandle, mpsc::Receiver<SyncEvent>) {
    let (command_tx, command_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    tokio::spawn(run(document_id, transport, buffer, command_rx, event_tx));
    (
        SyncHandle {
            commands: command_tx,
        },
        event_rx,
    )
}

async fn run(
    document_id: String,
    transport: Arc<dyn PatchTransport>,
    mut buffer: ChangeBuffer,
    mut commands: mpsc::Receiver<SyncCommand>,
    events: mpsc::Sender<SyncEvent>,
) {
    loop {
        let deadline = buffer.next_deadline();
        tokio::select! {
            command = commands.recv() => match command {
                Some(SyncCommand::Edit(content)) => {
                    // Destroyed buffers only occur after shutdown, which
                    // ends this loop; the edit cannot fail here.
                    let _ = buffer.record_edit(content, Instant::now());
                }
                Some(SyncCommand::ForceFlush) => {
                    if let Some(request) = buffer.force_flush() {
                        dispatch(&document_id, transport.as_ref(), &mut buffer, request, &events)
                            .await;
                    }
                }
                Some(SyncCommand::Shutdown) | None => {
                    if let Some(request) = buffer.force_flush() {
                        dispatch(&document_id, transport.as_ref(), &mut buffer, request, &events)
                            .await;
                    }
                    buffer.destroy();
                    tracing::debug!(%document_id, "sync driver stopped");
                    return;
                }
            },
            _ = sleep_until(deadline) => {
                if let Some(request) = buffer.poll(Instant::now()) {
                    dispatch(&document_id, transport.as_ref(), &mut buffer, request, &events)
                        .await;
                }
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn dispatch(
    document_id: &str,
    transport: &dyn PatchTransport,
    buffer: &mut ChangeBuffer,
    request: FlushRequest,
    events: &mpsc::Sender<SyncEvent>,
) {
    let token = request.token;
    let result = transport
        .apply(
            document_id,
            request.changes,
            Some(request.expected_fingerprint),
        )
        .await;
    let now = Instant::now();

    match result {
        Ok(response) => {
            let version = response.version;
            let fingerprint = response.fingerprint.clone();
            let disposition = buffer.complete_flush(
                token,
                FlushOutcome::Saved {
                    content: response.content,
                    fingerprint: response.fingerprint,
                },
                now,
            );
            if disposition != FlushDisposition::Stale {
                tracing::debug!(%document_id, version, "flush saved");
                let _ = events
                    .send(SyncEvent::Saved {
                        version,
                        fingerprint,
                    })
                    .await;
            }
        }
        Err(TransportError::Transient(message)) => {
            let disposition = buffer.complete_flush(token, FlushOutcome::Failed, now);
            if disposition != FlushDisposition::Stale {
                tracing::warn!(%document_id, %message, "flush failed; will retry");
                let _ = events
                    .send(SyncEvent::Error {
                        message,
                        will_retry: disposition == FlushDisposition::RetryScheduled,
                    })
                    .await;
            }
        }
        Err(err) => {
            let disposition = buffer.complete_flush(token, FlushOutcome::Conflict, now);
            if disposition != FlushDisposition::Stale {
                tracing::warn!(%document_id, %err, "flush conflicted; reload required");
                let _ = events.send(SyncEvent::Conflict).await;
            }
        }
    }
}
