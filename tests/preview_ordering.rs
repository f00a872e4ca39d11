//! The preview must end on the newest snapshot, whatever order renders finish in.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use together::document::{Document, Snapshot};
use together::preview::{PreviewSurface, PreviewSync, PreviewWorker};
use together::render::Renderer;

#[derive(Default)]
struct RecordingSurface {
    pages: Vec<String>,
}

impl PreviewSurface for RecordingSurface {
    fn display(&mut self, html: &str) {
        self.pages.push(html.to_string());
    }
}

fn settle_on(order: &[usize], texts: &[&str]) -> (RecordingSurface, PreviewSync) {
    let renderer = Renderer::default();
    let mut sync = PreviewSync::new();
    let requests: Vec<_> = texts
        .iter()
        .enumerate()
        .map(|(rev, text)| sync.begin(Snapshot::new(rev as u64, *text)))
        .collect();

    let mut surface = RecordingSurface::default();
    for &index in order {
        if let Some(result) = sync.complete(requests[index].run(&renderer)) {
            surface.display(result.html());
        }
    }
    (surface, sync)
}

#[test]
fn test_second_request_wins_in_order() {
    let (surface, sync) = settle_on(&[0, 1], &["# s1", "# s2"]);
    assert!(sync.is_settled());
    assert!(surface.pages.last().unwrap().contains("<h1>s2</h1>"));
    assert!(surface.pages.iter().all(|p| !p.contains("<h1>s1</h1>")));
}

#[test]
fn test_second_request_wins_out_of_order() {
    let (surface, sync) = settle_on(&[1, 0], &["# s1", "# s2"]);
    assert!(sync.is_settled());
    assert_eq!(surface.pages.len(), 1);
    assert!(surface.pages[0].contains("<h1>s2</h1>"));
}

#[test]
fn test_every_permutation_of_three_settles_on_last() {
    let texts = ["# a", "# b", "# c"];
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for order in &orders {
        let (surface, sync) = settle_on(order, &texts);
        assert!(sync.is_settled(), "order {order:?}");
        assert_eq!(sync.displayed_revision(), Some(2), "order {order:?}");
        assert!(
            surface.pages.last().unwrap().contains("<h1>c</h1>"),
            "order {order:?}"
        );
    }
}

#[test]
fn test_document_edits_through_worker_settle_on_latest() {
    let mut doc = Document::new();
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);
    doc.subscribe(move |snap| sink.lock().unwrap().push(snap.clone()));

    for word in ["alpha", "beta", "gamma", "delta"] {
        doc.set_text(&format!("# {word}"));
    }

    let worker = PreviewWorker::spawn(Renderer::default()).unwrap();
    let mut sync = PreviewSync::new();
    let mut surface = RecordingSurface::default();
    for snapshot in snapshots.lock().unwrap().drain(..) {
        assert!(worker.submit(sync.begin(snapshot)));
    }
    while !sync.is_settled() {
        let done = worker
            .recv_timeout(Duration::from_secs(5))
            .expect("worker result");
        if let Some(result) = sync.complete(done) {
            surface.display(result.html());
        }
    }

    assert_eq!(sync.displayed_revision(), Some(doc.revision()));
    assert!(surface.pages.last().unwrap().contains("<h1>delta</h1>"));
}
