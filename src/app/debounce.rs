use std::time::{Duration, Instant};

use crate::document::Snapshot;

/// Holds back snapshots until edits pause for `delay`.
///
/// Only the newest snapshot is kept; each new one restarts the timer.
#[derive(Debug)]
pub(super) struct SnapshotDebouncer {
    delay: Duration,
    pending: Option<(Snapshot, Instant)>,
}

impl SnapshotDebouncer {
    pub(super) const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub(super) fn queue(&mut self, snapshot: Snapshot, now: Instant) {
        self.pending = Some((snapshot, now));
    }

    pub(super) fn take_ready(&mut self, now: Instant) -> Option<Snapshot> {
        let (_, queued_at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*queued_at) >= self.delay {
            self.pending.take().map(|(snapshot, _)| snapshot)
        } else {
            None
        }
    }

    /// Release the pending snapshot regardless of the timer.
    pub(super) fn take_now(&mut self) -> Option<Snapshot> {
        self.pending.take().map(|(snapshot, _)| snapshot)
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
