//! # Change Buffer
//!
//! Client-resident coalescing and timed dispatch of edits.
//!
//! The buffer is an explicit finite-state machine over
//! `Idle → Pending → Flushing` with owned deadline fields; every
//! transition takes `now` as a parameter, so the machine is fully
//! deterministic under test and the driver owns the only real timers.
//!
//! A flush does not replay the keystroke stream: all accumulated edits
//! coalesce into one whole-content replace against the last confirmed
//! baseline, guarded by the fingerprint the server last returned.

use std::time::Duration;

use tokio::time::Instant;
use vellum_patch::Change;

use crate::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Idle,
    Pending,
    Flushing,
}

#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Inactivity window before a flush; re-armed on every edit.
    pub idle_window: Duration,
    /// Staleness ceiling; armed once per pending run, never re-armed by
    /// further edits, so continuous typing still flushes.
    pub max_wait: Duration,
    /// Base delay for retrying non-conflict failures; doubles per attempt.
    pub retry_base_delay: Duration,
    /// Retry attempts before the buffer parks and waits for new input.
    pub max_retries: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            idle_window: Duration::from_millis(1000),
            max_wait: Duration::from_millis(5000),
            retry_base_delay: Duration::from_millis(500),
            max_retries: 5,
        }
    }
}

/// Ties an in-flight flush to the buffer generation that issued it, so a
/// result that lands after a reload or document switch is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushToken {
    epoch: u64,
}

/// One dispatchable patch request.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushRequest {
    pub token: FlushToken,
    pub changes: Vec<Change>,
    pub expected_fingerprint: String,
}

/// What the transport reported back for a flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Saved { content: String, fingerprint: String },
    /// Precondition failed on the server.
    Conflict,
    /// Transient carriage failure; the content is still worth retrying.
    Failed,
}

/// How the buffer settled after a flush result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushDisposition {
    /// Baseline advanced; buffer is idle.
    Settled,
    /// The editor diverged while the request was in flight; an immediate
    /// follow-up flush is armed.
    FollowUpScheduled,
    /// Stale write rejected; caller must reload authoritative state.
    ReloadRequired,
    /// Transient failure; a backoff retry is armed.
    RetryScheduled,
    /// Transient failure with attempts exhausted; buffer holds its
    /// content and waits for the next edit or force flush.
    RetriesExhausted,
    /// The token belongs to an earlier buffer generation; ignored.
    Stale,
}

pub struct ChangeBuffer {
    config: BufferConfig,
    state: BufferState,
    /// Baseline the server last confirmed.
    last_saved_content: String,
    /// Live local text.
    current_content: String,
    fingerprint: String,
    idle_deadline: Option<Instant>,
    max_deadline: Option<Instant>,
    retry_attempts: u32,
    epoch: u64,
    destroyed: bool,
}

impl ChangeBuffer {
    pub fn new(baseline: String, fingerprint: String, config: BufferConfig) -> Self {
        ChangeBuffer {
            config,
            state: BufferState::Idle,
            current_content: baseline.clone(),
            last_saved_content: baseline,
            fingerprint,
            idle_deadline: None,
            max_deadline: None,
            retry_attempts: 0,
            epoch: 0,
            destroyed: false,
        }
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn current_content(&self) -> &str {
        &self.current_content
    }

    pub fn last_saved_content(&self) -> &str {
        &self.last_saved_content
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn is_dirty(&self) -> bool {
        self.current_content != self.last_saved_content
    }

    /// Record the editor's current text after an edit.
    ///
    /// Idle: arms the idle timer and, if absent, the max-wait timer.
    /// Pending: re-arms the idle timer only.
    /// Flushing: content is tracked but nothing is dispatched until the
    /// in-flight request resolves.
    pub fn record_edit(&mut self, content: String, now: Instant) -> Result<(), SyncError> {
        if self.destroyed {
            return Err(SyncError::BufferDestroyed);
        }
        self.current_content = content;
        match self.state {
            BufferState::Idle => {
                self.state = BufferState::Pending;
                self.idle_deadline = Some(now + self.config.idle_window);
                if self.max_deadline.is_none() {
                    self.max_deadline = Some(now + self.config.max_wait);
                }
            }
            BufferState::Pending => {
                self.idle_deadline = Some(now + self.config.idle_window);
            }
            BufferState::Flushing => {}
        }
        Ok(())
    }

    /// Earliest armed deadline, for the driver's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.idle_deadline, self.max_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire a due timer: transition to Flushing and emit the coalesced
    /// request. Returns `None` when nothing is due or nothing changed.
    pub fn poll(&mut self, now: Instant) -> Option<FlushRequest> {
        if self.state != BufferState::Pending {
            return None;
        }
        let due = self.next_deadline().is_some_and(|d| d <= now);
        if !due {
            return None;
        }
        self.begin_flush()
    }

    /// Flush immediately, bypassing timers (used on navigation away).
    pub fn force_flush(&mut self) -> Option<FlushRequest> {
        if self.destroyed || self.state == BufferState::Flushing {
            return None;
        }
        self.begin_flush()
    }

    fn begin_flush(&mut self) -> Option<FlushRequest> {
        self.idle_deadline = None;
        self.max_deadline = None;
        if !self.is_dirty() {
            self.state = BufferState::Idle;
            return None;
        }
        self.state = BufferState::Flushing;
        let change = Change::replace(
            0,
            self.last_saved_content.chars().count(),
            self.current_content.clone(),
        );
        Some(FlushRequest {
            token: FlushToken { epoch: self.epoch },
            changes: vec![change],
            expected_fingerprint: self.fingerprint.clone(),
        })
    }

    /// Feed the transport's result back into the machine.
    pub fn complete_flush(
        &mut self,
        token: FlushToken,
        outcome: FlushOutcome,
        now: Instant,
    ) -> FlushDisposition {
        if token.epoch != self.epoch {
            return FlushDisposition::Stale;
        }
        match outcome {
            FlushOutcome::Saved {
                content,
                fingerprint,
            } => {
                self.retry_attempts = 0;
                self.fingerprint = fingerprint;
                self.last_saved_content = content;
                if self.is_dirty() {
                    // The editor moved on while the request was in
                    // flight; flush the divergence right away.
                    self.state = BufferState::Pending;
                    self.idle_deadline = Some(now);
                    FlushDisposition::FollowUpScheduled
                } else {
                    self.state = BufferState::Idle;
                    FlushDisposition::Settled
                }
            }
            FlushOutcome::Conflict => {
                // The local baseline is stale; retrying the same write
                // would clobber someone else's edit.
                self.state = BufferState::Idle;
                self.retry_attempts = 0;
                tracing::warn!("flush rejected by precondition; reload required");
                FlushDisposition::ReloadRequired
            }
            FlushOutcome::Failed => {
                self.state = BufferState::Pending;
                self.retry_attempts += 1;
                if self.retry_attempts <= self.config.max_retries {
                    let backoff = self.config.retry_base_delay
                        * 2u32.saturating_pow(self.retry_attempts - 1);
                    self.idle_deadline = Some(now + backoff);
                    FlushDisposition::RetryScheduled
                } else {
                    FlushDisposition::RetriesExhausted
                }
            }
        }
    }

    /// Adopt authoritative state after a conflict reload or document
    /// switch. Outstanding flush results become stale.
    pub fn reset_baseline(&mut self, content: String, fingerprint: String) {
        self.epoch += 1;
        self.state = BufferState::Idle;
        self.idle_deadline = None;
        self.max_deadline = None;
        self.retry_attempts = 0;
        self.current_content = content.clone();
        self.last_saved_content = content;
        self.fingerprint = fingerprint;
    }

    /// Tear down on unmount: clears timers and invalidates in-flight
    /// results. Further edits are rejected.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.epoch += 1;
        self.state = BufferState::Idle;
        self.idle_deadline = None;
        self.max_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_millis(1000);
    const MAX_WAIT: Duration = Duration::from_millis(5000);

    fn test_buffer() -> ChangeBuffer {
        ChangeBuffer::new(
            "base".to_string(),
            "fp-0".to_string(),
            BufferConfig {
                idle_window: IDLE,
                max_wait: MAX_WAIT,
                retry_base_delay: Duration::from_millis(500),
                max_retries: 2,
            },
        )
    }

    fn saved(content: &str, fingerprint: &str) -> FlushOutcome {
        FlushOutcome::Saved {
            content: content.to_string(),
            fingerprint: fingerprint.to_string(),
        }
    }

    #[test]
    fn test_burst_coalesces_to_one_request() {
        let mut buf = test_buffer();
        let t0 = Instant::now();

        buf.record_edit("b".to_string(), t0).unwrap();
        buf.record_edit("bas".to_string(), t0 + Duration::from_millis(100)).unwrap();
        buf.record_edit("base two".to_string(), t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(buf.state(), BufferState::Pending);

        // Not due before the idle window elapses from the *last* edit.
        assert!(buf.poll(t0 + Duration::from_millis(1100)).is_none());

        let req = buf.poll(t0 + Duration::from_millis(1200)).unwrap();
        assert_eq!(buf.state(), BufferState::Flushing);
        assert_eq!(req.changes.len(), 1);
        assert_eq!(req.changes[0], Change::replace(0, 4, "base two"));
        assert_eq!(req.expected_fingerprint, "fp-0");

        // No second request while one is in flight.
        assert!(buf.poll(t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_max_wait_fires_under_continuous_typing() {
        let mut buf = test_buffer();
        let t0 = Instant::now();

        // Keep typing faster than the idle window right up to the ceiling.
        let mut t = t0;
        for i in 0..12 {
            buf.record_edit(format!("edit {i}"), t).unwrap();
            t += Duration::from_millis(400);
        }

        // The idle timer was always re-armed (next due at t0 + 5400ms),
        // but the max-wait ceiling armed at t0 still fires first.
        assert!(buf.poll(t0 + MAX_WAIT - Duration::from_millis(1)).is_none());
        let req = buf.poll(t0 + MAX_WAIT).unwrap();
        assert_eq!(req.changes[0].text, "edit 11");
    }

    #[test]
    fn test_flush_success_returns_to_idle() {
        let mut buf = test_buffer();
        let t0 = Instant::now();
        buf.record_edit("base!".to_string(), t0).unwrap();
        let req = buf.force_flush().unwrap();

        let disposition = buf.complete_flush(req.token, saved("base!", "fp-1"), t0);
        assert_eq!(disposition, FlushDisposition::Settled);
        assert_eq!(buf.state(), BufferState::Idle);
        assert_eq!(buf.last_saved_content(), "base!");
        assert_eq!(buf.fingerprint(), "fp-1");
        assert!(buf.next_deadline().is_none());
    }

    #[test]
    fn test_divergence_in_flight_schedules_follow_up() {
        let mut buf = test_buffer();
        let t0 = Instant::now();
        buf.record_edit("base!".to_string(), t0).unwrap();
        let req = buf.force_flush().unwrap();

        // User keeps typing while the request is in flight.
        buf.record_edit("base!?".to_string(), t0 + Duration::from_millis(10)).unwrap();
        assert_eq!(buf.state(), BufferState::Flushing);

        let t1 = t0 + Duration::from_millis(50);
        let disposition = buf.complete_flush(req.token, saved("base!", "fp-1"), t1);
        assert_eq!(disposition, FlushDisposition::FollowUpScheduled);
        assert_eq!(buf.state(), BufferState::Pending);

        // Follow-up is immediate, not idle-window delayed.
        let follow_up = buf.poll(t1).unwrap();
        assert_eq!(follow_up.changes[0].text, "base!?");
        assert_eq!(follow_up.expected_fingerprint, "fp-1");
    }

    #[test]
    fn test_conflict_goes_idle_without_retry() {
        let mut buf = test_buffer();
        let t0 = Instant::now();
        buf.record_edit("local".to_string(), t0).unwrap();
        let req = buf.force_flush().unwrap();

        let disposition = buf.complete_flush(req.token, FlushOutcome::Conflict, t0);
        assert_eq!(disposition, FlushDisposition::ReloadRequired);
        assert_eq!(buf.state(), BufferState::Idle);
        assert!(buf.next_deadline().is_none());

        // Caller reloads authoritative state.
        buf.reset_baseline("remote".to_string(), "fp-remote".to_string());
        assert!(!buf.is_dirty());
        assert_eq!(buf.fingerprint(), "fp-remote");
    }

    #[test]
    fn test_transient_failure_retries_with_backoff() {
        let mut buf = test_buffer();
        let t0 = Instant::now();
        buf.record_edit("base!".to_string(), t0).unwrap();

        let req = buf.force_flush().unwrap();
        let d1 = buf.complete_flush(req.token, FlushOutcome::Failed, t0);
        assert_eq!(d1, FlushDisposition::RetryScheduled);
        assert_eq!(buf.next_deadline(), Some(t0 + Duration::from_millis(500)));

        let req = buf.poll(t0 + Duration::from_millis(500)).unwrap();
        let d2 = buf.complete_flush(req.token, FlushOutcome::Failed, t0 + Duration::from_millis(500));
        assert_eq!(d2, FlushDisposition::RetryScheduled);
        assert_eq!(
            buf.next_deadline(),
            Some(t0 + Duration::from_millis(500) + Duration::from_millis(1000))
        );

        // Third failure exceeds max_retries = 2: the buffer parks.
        let t2 = t0 + Duration::from_millis(1500);
        let req = buf.poll(t2).unwrap();
        let d3 = buf.complete_flush(req.token, FlushOutcome::Failed, t2);
        assert_eq!(d3, FlushDisposition::RetriesExhausted);
        assert_eq!(buf.state(), BufferState::Pending);
        assert!(buf.next_deadline().is_none());

        // Content is preserved; the next edit revives scheduling.
        assert_eq!(buf.current_content(), "base!");
        buf.record_edit("base!!".to_string(), t2).unwrap();
        assert!(buf.next_deadline().is_some());
    }

    #[test]
    fn test_force_flush_with_clean_content_is_noop() {
        let mut buf = test_buffer();
        assert!(buf.force_flush().is_none());
        assert_eq!(buf.state(), BufferState::Idle);
    }

    #[test]
    fn test_stale_token_after_reset_is_discarded() {
        let mut buf = test_buffer();
        let t0 = Instant::now();
        buf.record_edit("local".to_string(), t0).unwrap();
        let req = buf.force_flush().unwrap();

        // Document switch while the request is in flight.
        buf.reset_baseline("other doc".to_string(), "fp-other".to_string());

        let disposition = buf.complete_flush(req.token, saved("local", "fp-1"), t0);
        assert_eq!(disposition, FlushDisposition::Stale);
        assert_eq!(buf.last_saved_content(), "other doc");
        assert_eq!(buf.fingerprint(), "fp-other");
    }

    #[test]
    fn test_destroy_clears_timers_and_rejects_edits() {
        let mut buf = test_buffer();
        let t0 = Instant::now();
        buf.record_edit("x".to_string(), t0).unwrap();
        buf.destroy();
        assert!(buf.next_deadline().is_none());
        assert_eq!(
            buf.record_edit("y".to_string(), t0),
            Err(SyncError::BufferDestroyed)
        );
        assert!(buf.force_flush().is_none());
    }

    #[test]
    fn test_edits_during_flight_do_not_dispatch_concurrently() {
        let mut buf = test_buffer();
        let t0 = Instant::now();
        buf.record_edit("a".to_string(), t0).unwrap();
        let _req = buf.force_flush().unwrap();

        buf.record_edit("ab".to_string(), t0).unwrap();
        assert!(buf.poll(t0 + Duration::from_secs(60)).is_none());
        assert!(buf.force_flush().is_none());
    }
}
