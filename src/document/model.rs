use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ropey::Rope;
use tracing::{debug, trace};

use super::snapshot::{DocumentError, Snapshot, SubscriptionId};

type Listener = Box<dyn FnMut(&Snapshot) + Send>;

/// The authoritative markdown source being edited.
///
/// Text lives in a rope so single-character edits stay cheap on large
/// files. Every change bumps the revision and notifies subscribers with a
/// fresh [`Snapshot`]; nothing else ever sees the live text.
pub struct Document {
    rope: Rope,
    path: Option<PathBuf>,
    dirty: bool,
    revision: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Document {
    /// Create an empty, unnamed document.
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Create an unnamed document holding `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            path: None,
            dirty: false,
            revision: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Load a document from a UTF-8 text file.
    ///
    /// # Errors
    /// Returns [`DocumentError::Read`] when the file cannot be read and
    /// [`DocumentError::InvalidUtf8`] when it is not UTF-8.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = read_text(path)?;
        debug!(path = %path.display(), bytes = text.len(), "opened document");
        let mut doc = Self::from_text(&text);
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the text changed since it was opened or last saved.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// The full text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Length in chars.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Copy the current text for a reader.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.revision, self.text())
    }

    /// Insert `text` at char index `at`, clamped to the end of the document.
    pub fn insert(&mut self, at: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = at.min(self.rope.len_chars());
        self.rope.insert(at, text);
        self.changed();
    }

    /// Remove the chars in `range`, clamped to the document.
    pub fn remove(&mut self, range: Range<usize>) {
        let len = self.rope.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len);
        if start >= end {
            return;
        }
        self.rope.remove(start..end);
        self.changed();
    }

    /// Replace the whole text. Does nothing when the text is unchanged.
    pub fn set_text(&mut self, text: &str) {
        if self.rope == text {
            return;
        }
        self.rope = Rope::from_str(text);
        self.changed();
    }

    /// Re-read the text from the document's file.
    ///
    /// Returns `true` if the text on disk differed and was taken over.
    /// The document counts as clean afterwards either way.
    ///
    /// # Errors
    /// Returns [`DocumentError::NoPath`] for unnamed documents, or the read
    /// error from [`Document::open`].
    pub fn reload(&mut self) -> Result<bool, DocumentError> {
        let path = self.path.clone().ok_or(DocumentError::NoPath)?;
        let text = read_text(&path)?;
        let changed = self.rope != text.as_str();
        if changed {
            self.rope = Rope::from_str(&text);
            self.changed();
        }
        self.dirty = false;
        debug!(path = %path.display(), changed, "reloaded document");
        Ok(changed)
    }

    /// Write the text back to the document's file.
    ///
    /// # Errors
    /// Returns [`DocumentError::NoPath`] for unnamed documents and
    /// [`DocumentError::Write`] when the file cannot be written.
    pub fn save(&mut self) -> Result<(), DocumentError> {
        let path = self.path.clone().ok_or(DocumentError::NoPath)?;
        self.write_to(&path)
    }

    /// Write the text to `path` and make it the document's file.
    ///
    /// # Errors
    /// Returns [`DocumentError::Write`] when the file cannot be written.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        self.write_to(path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Register `listener` to receive a snapshot after every change.
    pub fn subscribe(&mut self, listener: impl FnMut(&Snapshot) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Drop a listener. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn write_to(&mut self, path: &Path) -> Result<(), DocumentError> {
        let mut bytes = Vec::with_capacity(self.rope.len_bytes());
        for chunk in self.rope.chunks() {
            bytes.extend_from_slice(chunk.as_bytes());
        }
        fs::write(path, bytes).map_err(|source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        self.dirty = false;
        debug!(path = %path.display(), revision = self.revision, "saved document");
        Ok(())
    }

    fn changed(&mut self) {
        self.revision += 1;
        self.dirty = true;
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        trace!(
            revision = snapshot.revision(),
            listeners = self.listeners.len(),
            "notifying document subscribers"
        );
        for (_, listener) in &mut self.listeners {
            listener(&snapshot);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("len_chars", &self.rope.len_chars())
            .field("dirty", &self.dirty)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn read_text(path: &Path) -> Result<String, DocumentError> {
    let bytes = fs::read(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| DocumentError::InvalidUtf8 {
        path: path.to_path_buf(),
    })
}
