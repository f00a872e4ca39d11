use std::io;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::debounce::SnapshotDebouncer;
use crate::document::{Document, DocumentError, Snapshot, SubscriptionId};
use crate::preview::{PreviewSurface, PreviewSync, PreviewWorker, RenderDone};
use crate::render::Renderer;

/// A document wired to a live preview.
///
/// The session subscribes to the document, debounces its snapshots, renders
/// them on a worker thread and shows only results that belong to the newest
/// request. Call [`Session::step`] regularly from the owning loop.
pub struct Session<S: PreviewSurface> {
    document: Document,
    subscription: SubscriptionId,
    changes: Receiver<Snapshot>,
    debouncer: SnapshotDebouncer,
    sync: PreviewSync,
    worker: PreviewWorker,
    surface: S,
}

impl<S: PreviewSurface> Session<S> {
    /// Start a session and request the first preview right away.
    ///
    /// # Errors
    /// Returns an error if the render thread cannot be started.
    pub fn new(
        mut document: Document,
        renderer: Renderer,
        surface: S,
        debounce: Duration,
    ) -> io::Result<Self> {
        let (tx, changes) = mpsc::channel();
        let subscription = document.subscribe(move |snapshot| {
            let _ = tx.send(snapshot.clone());
        });
        let worker = PreviewWorker::spawn(renderer)?;

        let mut session = Self {
            document,
            subscription,
            changes,
            debouncer: SnapshotDebouncer::new(debounce),
            sync: PreviewSync::new(),
            worker,
            surface,
        };
        let initial = session.document.snapshot();
        session.request(initial);
        Ok(session)
    }

    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for edits; every change is picked up by the next step.
    pub const fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub const fn sync(&self) -> &PreviewSync {
        &self.sync
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// Take over the text on disk after an external edit.
    ///
    /// # Errors
    /// Returns the document's read error; the preview keeps its last state.
    pub fn reload_source(&mut self) -> Result<bool, DocumentError> {
        self.document.reload()
    }

    /// Advance the preview: collect edits, release debounced snapshots and
    /// display accepted results. Returns how many results were displayed.
    pub fn step(&mut self, now: Instant) -> usize {
        self.collect_changes(now);
        if let Some(snapshot) = self.debouncer.take_ready(now) {
            self.request(snapshot);
        }
        let mut shown = 0;
        while let Some(done) = self.worker.try_recv() {
            shown += usize::from(self.accept(done));
        }
        shown
    }

    /// Render pending edits without waiting for the debounce window and
    /// block until the newest request is displayed or `timeout` passes.
    ///
    /// Returns whether the preview settled.
    pub fn flush(&mut self, timeout: Duration) -> bool {
        self.collect_changes(Instant::now());
        if let Some(snapshot) = self.debouncer.take_now() {
            self.request(snapshot);
        }
        let deadline = Instant::now() + timeout;
        while !self.sync.is_settled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if let Some(done) = self.worker.recv_timeout(remaining) {
                self.accept(done);
            }
        }
        true
    }

    /// End the session and hand the document back.
    pub fn into_document(self) -> Document {
        let Self {
            mut document,
            subscription,
            ..
        } = self;
        document.unsubscribe(subscription);
        document
    }

    fn collect_changes(&mut self, now: Instant) {
        while let Ok(snapshot) = self.changes.try_recv() {
            self.debouncer.queue(snapshot, now);
        }
    }

    fn request(&mut self, snapshot: Snapshot) {
        let request = self.sync.begin(snapshot);
        debug!(
            seq = request.seq(),
            revision = request.snapshot().revision(),
            "preview requested"
        );
        if !self.worker.submit(request) {
            warn!("preview render thread is gone; preview will not update");
        }
    }

    fn accept(&mut self, done: RenderDone) -> bool {
        let Some(result) = self.sync.complete(done) else {
            return false;
        };
        if let Some(message) = result.error_message() {
            warn!(error = message, "preview shows render error");
        }
        self.surface.display(result.html());
        true
    }

    /// Whether an edit is still waiting out the debounce window.
    pub const fn has_pending_edit(&self) -> bool {
        self.debouncer.is_pending()
    }
}
