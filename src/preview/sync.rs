use tracing::trace;

use crate::document::Snapshot;
use crate::render::{RenderResult, Renderer};

/// A snapshot queued for rendering, tagged with its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    seq: u64,
    snapshot: Snapshot,
}

impl RenderRequest {
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Render the snapshot. Runs on whichever thread calls it.
    pub fn run(&self, renderer: &Renderer) -> RenderDone {
        RenderDone {
            seq: self.seq,
            revision: self.snapshot.revision(),
            result: renderer.render(self.snapshot.text()),
        }
    }
}

/// A finished render, waiting to be accepted or discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDone {
    seq: u64,
    revision: u64,
    result: RenderResult,
}

impl RenderDone {
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Document revision the result was rendered from.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub const fn result(&self) -> &RenderResult {
        &self.result
    }
}

/// Keeps the displayed preview tied to the most recent render request.
///
/// Requests get strictly increasing sequence numbers. A completion is only
/// accepted if it answers the newest request issued so far; anything older
/// is stale no matter when it arrives.
#[derive(Debug, Default)]
pub struct PreviewSync {
    last_issued: Option<u64>,
    displayed: Option<RenderDone>,
}

impl PreviewSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a request for `snapshot`, superseding every earlier request.
    pub fn begin(&mut self, snapshot: Snapshot) -> RenderRequest {
        let seq = self.last_issued.map_or(0, |last| last + 1);
        self.last_issued = Some(seq);
        trace!(seq, revision = snapshot.revision(), "render requested");
        RenderRequest { seq, snapshot }
    }

    /// Offer a finished render.
    ///
    /// Returns the result to display when `done` belongs to the newest
    /// request, or `None` when it is stale and has been dropped.
    pub fn complete(&mut self, done: RenderDone) -> Option<&RenderResult> {
        if Some(done.seq) != self.last_issued {
            trace!(seq = done.seq, latest = ?self.last_issued, "dropping stale render");
            crate::perf::log_event(
                "preview.stale",
                format!("seq={} latest={:?}", done.seq, self.last_issued),
            );
            return None;
        }
        if self.displayed.as_ref().is_some_and(|shown| shown.seq >= done.seq) {
            return None;
        }
        self.displayed = Some(done);
        self.displayed.as_ref().map(|shown| &shown.result)
    }

    /// Render `snapshot` on the calling thread and accept the result.
    pub fn render_now(&mut self, snapshot: Snapshot, renderer: &Renderer) -> Option<&RenderResult> {
        let request = self.begin(snapshot);
        let done = request.run(renderer);
        self.complete(done)
    }

    /// Sequence number of the newest request, if any was issued.
    pub const fn latest_requested(&self) -> Option<u64> {
        self.last_issued
    }

    /// True when the newest request's result is on display.
    pub fn is_settled(&self) -> bool {
        match (self.last_issued, &self.displayed) {
            (None, _) => true,
            (Some(latest), Some(shown)) => shown.seq == latest,
            (Some(_), None) => false,
        }
    }

    /// The result currently on display.
    pub fn displayed(&self) -> Option<&RenderResult> {
        self.displayed.as_ref().map(|shown| &shown.result)
    }

    /// Document revision of the result on display.
    pub fn displayed_revision(&self) -> Option<u64> {
        self.displayed.as_ref().map(|shown| shown.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(revision: u64, text: &str) -> Snapshot {
        Snapshot::new(revision, text)
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let mut sync = PreviewSync::new();
        let a = sync.begin(snap(1, "a"));
        let b = sync.begin(snap(2, "b"));
        assert!(b.seq() > a.seq());
        assert_eq!(sync.latest_requested(), Some(b.seq()));
    }

    #[test]
    fn test_in_order_completion_displays_latest() {
        let renderer = Renderer::default();
        let mut sync = PreviewSync::new();
        let first = sync.begin(snap(1, "first"));
        let second = sync.begin(snap(2, "second"));

        assert!(sync.complete(first.run(&renderer)).is_none());
        let shown = sync.complete(second.run(&renderer)).unwrap();
        assert!(shown.html().contains("second"));
        assert!(sync.is_settled());
    }

    #[test]
    fn test_out_of_order_completion_keeps_latest() {
        let renderer = Renderer::default();
        let mut sync = PreviewSync::new();
        let first = sync.begin(snap(1, "first"));
        let second = sync.begin(snap(2, "second"));

        assert!(sync.complete(second.run(&renderer)).is_some());
        assert!(sync.complete(first.run(&renderer)).is_none());
        assert!(sync.displayed().unwrap().html().contains("second"));
        assert_eq!(sync.displayed_revision(), Some(2));
    }

    #[test]
    fn test_not_settled_while_latest_in_flight() {
        let renderer = Renderer::default();
        let mut sync = PreviewSync::new();
        assert!(sync.is_settled());

        let first = sync.begin(snap(1, "first"));
        assert!(!sync.is_settled());
        sync.complete(first.run(&renderer));
        assert!(sync.is_settled());

        let _second = sync.begin(snap(2, "second"));
        assert!(!sync.is_settled());
        assert!(sync.displayed().unwrap().html().contains("first"));
    }

    #[test]
    fn test_duplicate_completion_is_ignored() {
        let renderer = Renderer::default();
        let mut sync = PreviewSync::new();
        let request = sync.begin(snap(1, "x"));
        let done = request.run(&renderer);
        assert!(sync.complete(done.clone()).is_some());
        assert!(sync.complete(done).is_none());
    }

    #[test]
    fn test_render_now_displays_immediately() {
        let mut sync = PreviewSync::new();
        let shown = sync
            .render_now(snap(3, "# Now"), &Renderer::default())
            .unwrap();
        assert!(shown.html().contains("<h1>Now</h1>"));
        assert_eq!(sync.displayed_revision(), Some(3));
    }
}
