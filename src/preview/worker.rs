//! Background rendering thread.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::sync::{RenderDone, RenderRequest};
use crate::render::Renderer;

/// Renders requests off the calling thread.
///
/// Queued requests that are already superseded by a newer one are skipped.
/// Results arrive in completion order; feed them through
/// [`PreviewSync::complete`](super::PreviewSync::complete) to drop stale ones.
pub struct PreviewWorker {
    jobs: Option<Sender<RenderRequest>>,
    results: Receiver<RenderDone>,
    handle: Option<JoinHandle<()>>,
}

impl PreviewWorker {
    /// Start the render thread.
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(renderer: Renderer) -> io::Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<RenderRequest>();
        let (done_tx, done_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("preview-render".to_string())
            .spawn(move || run_worker(&renderer, &job_rx, &done_tx))?;

        Ok(Self {
            jobs: Some(job_tx),
            results: done_rx,
            handle: Some(handle),
        })
    }

    /// Queue a request. Returns `false` if the worker has stopped.
    pub fn submit(&self, request: RenderRequest) -> bool {
        self.jobs
            .as_ref()
            .is_some_and(|jobs| jobs.send(request).is_ok())
    }

    /// Next finished render, if one is ready.
    pub fn try_recv(&self) -> Option<RenderDone> {
        self.results.try_recv().ok()
    }

    /// Wait up to `timeout` for the next finished render.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<RenderDone> {
        match self.results.recv_timeout(timeout) {
            Ok(done) => Some(done),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("preview render thread panicked");
        }
    }
}

fn run_worker(renderer: &Renderer, jobs: &Receiver<RenderRequest>, done: &Sender<RenderDone>) {
    while let Ok(mut request) = jobs.recv() {
        let mut skipped = 0u32;
        while let Ok(newer) = jobs.try_recv() {
            request = newer;
            skipped += 1;
        }
        if skipped > 0 {
            crate::perf::log_event(
                "preview.superseded",
                format!("skipped={skipped} rendering seq={}", request.seq()),
            );
        }

        let finished = request.run(renderer);
        if done.send(finished).is_err() {
            break;
        }
    }
    debug!("preview render thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Snapshot;
    use crate::preview::PreviewSync;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_worker_renders_submitted_request() {
        let worker = PreviewWorker::spawn(Renderer::default()).unwrap();
        let mut sync = PreviewSync::new();

        assert!(worker.submit(sync.begin(Snapshot::new(1, "# Worker"))));
        let done = worker.recv_timeout(WAIT).expect("render result");
        let shown = sync.complete(done).expect("latest result accepted");
        assert!(shown.html().contains("<h1>Worker</h1>"));
    }

    #[test]
    fn test_burst_settles_on_last_request() {
        let worker = PreviewWorker::spawn(Renderer::default()).unwrap();
        let mut sync = PreviewSync::new();

        for i in 0..50 {
            assert!(worker.submit(sync.begin(Snapshot::new(i, format!("rev {i}")))));
        }

        while !sync.is_settled() {
            let done = worker.recv_timeout(WAIT).expect("worker stalled");
            sync.complete(done);
        }
        assert_eq!(sync.displayed_revision(), Some(49));
        assert!(sync.displayed().unwrap().html().contains("rev 49"));
    }

    #[test]
    fn test_drop_joins_thread() {
        let worker = PreviewWorker::spawn(Renderer::default()).unwrap();
        worker.submit(PreviewSync::new().begin(Snapshot::new(0, "x")));
        drop(worker);
    }
}
