//! BlobStore trait: the abstract interface for envelope persistence.
//!
//! A backend stores one opaque envelope string per document name. It knows
//! nothing about encryption or JSON; that lives in [`crate::DocumentStore`].
//! Implementations include an encrypted-file directory (primary), SQLite,
//! and in-memory (for tests).

use privkit_core::{DocumentId, Revision};

use crate::error::Result;

/// A stored envelope and its revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// The envelope text, `hex(iv):hex(ciphertext)`.
    pub envelope: String,
    /// Blake3 hash of `envelope`.
    pub revision: Revision,
}

impl StoredBlob {
    /// Wrap an envelope, computing its revision.
    pub fn new(envelope: String) -> Self {
        let revision = Revision::of(&envelope);
        Self { envelope, revision }
    }
}

/// Precondition for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Write unconditionally.
    Any,
    /// Write only if the document does not exist yet.
    Absent,
    /// Write only if the stored envelope still has this revision.
    Revision(Revision),
}

impl Expect {
    /// The precondition matching what a reader observed.
    pub fn observed(blob: Option<&StoredBlob>) -> Self {
        match blob {
            Some(blob) => Expect::Revision(blob.revision),
            None => Expect::Absent,
        }
    }

    /// Check the precondition against the current stored revision.
    pub fn holds(&self, current: Option<Revision>) -> bool {
        match (self, current) {
            (Expect::Any, _) => true,
            (Expect::Absent, None) => true,
            (Expect::Absent, Some(_)) => false,
            (Expect::Revision(want), Some(have)) => *want == have,
            (Expect::Revision(_), None) => false,
        }
    }
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutResult {
    /// The envelope was written; this is its new revision.
    Written(Revision),
    /// The precondition failed; nothing was written.
    Stale {
        /// The revision currently stored, if any.
        current: Option<Revision>,
    },
}

/// The BlobStore trait: blocking interface for envelope persistence.
///
/// Methods are blocking so the same backend serves both the async API
/// (through `spawn_blocking`) and the synchronous process-exit path.
/// The trait is object safe; callers hold backends as `Arc<dyn BlobStore>`.
///
/// # Design Notes
///
/// - **Compare-and-swap**: `put` honours an [`Expect`] precondition and
///   reports `Stale` instead of overwriting a concurrent writer.
/// - **Whole-document writes**: a `put` replaces the previous envelope
///   entirely; readers never observe a partially written document.
pub trait BlobStore: Send + Sync + 'static {
    /// A short backend name for log events.
    fn kind(&self) -> &'static str;

    /// Fetch the stored envelope for a document.
    ///
    /// Returns `None` if the document does not exist. An empty stored
    /// envelope is also reported as `None`.
    fn get(&self, id: &DocumentId) -> Result<Option<StoredBlob>>;

    /// Store an envelope if the precondition holds.
    fn put(&self, id: &DocumentId, envelope: &str, expect: Expect) -> Result<PutResult>;

    /// List the documents currently stored.
    fn list(&self) -> Result<Vec<DocumentId>>;
}
