//! An editing session: one document plus the engine state tracking it.
//!
//! # Overview
//!
//! [`Session`] bundles the [`Document`] with the
//! [`AntiDependencyIndex`] mirroring its resolved references, and carries
//! the checkpoint stack transactions roll back to. Hosts read through the
//! session between transactions and hand it to a
//! [`Processor`](crate::processor::Processor) to mutate it.

use log::debug;

use armillary_core::document::Document;

use crate::antidep::AntiDependencyIndex;

struct Checkpoint {
    document: Document,
    index: AntiDependencyIndex,
}

/// One document under edit, with its reverse-reference index and rollback
/// checkpoints.
///
/// # Examples
///
/// ```
/// use armillary::session::Session;
/// use armillary_core::document::Document;
///
/// let session = Session::new(Document::new("Model"));
/// assert_eq!(session.document().len(), 1);
/// assert!(session.index().is_empty());
/// ```
pub struct Session {
    document: Document,
    index: AntiDependencyIndex,
    checkpoints: Vec<Checkpoint>,
}

impl Session {
    /// Wraps a document in a session.
    ///
    /// The reverse index is rebuilt from whatever resolved references the
    /// document already carries, so a session can be opened over a document
    /// in any state.
    pub fn new(document: Document) -> Self {
        let mut index = AntiDependencyIndex::new();
        for (owner, element) in document.iter() {
            for reference in element.references() {
                if let Some(target) = reference.target() {
                    index.record(owner, target);
                }
            }
        }
        Self {
            document,
            index,
            checkpoints: Vec::new(),
        }
    }

    /// Returns the document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access to the document.
    ///
    /// Binding transitions must go through the
    /// [`resolver`](crate::resolver) so the reverse index stays in step;
    /// everything else is fair game.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Returns the reverse-reference index.
    pub fn index(&self) -> &AntiDependencyIndex {
        &self.index
    }

    pub(crate) fn index_mut(&mut self) -> &mut AntiDependencyIndex {
        &mut self.index
    }

    /// Reports whether a transaction currently holds a checkpoint.
    pub fn in_transaction(&self) -> bool {
        !self.checkpoints.is_empty()
    }

    /// Snapshots the current document and index.
    pub(crate) fn begin_checkpoint(&mut self) {
        debug!(depth = self.checkpoints.len() + 1; "checkpoint taken");
        self.checkpoints.push(Checkpoint {
            document: self.document.clone(),
            index: self.index.clone(),
        });
    }

    /// Discards the most recent checkpoint, keeping all changes since.
    pub(crate) fn commit_checkpoint(&mut self) {
        let dropped = self.checkpoints.pop();
        debug_assert!(dropped.is_some());
        debug!(depth = self.checkpoints.len(); "checkpoint committed");
    }

    /// Restores the most recent checkpoint, dropping all changes since.
    pub(crate) fn rollback_checkpoint(&mut self) {
        if let Some(checkpoint) = self.checkpoints.pop() {
            self.document = checkpoint.document;
            self.index = checkpoint.index;
            debug!(depth = self.checkpoints.len(); "checkpoint rolled back");
        } else {
            debug_assert!(false, "rollback without a checkpoint");
        }
    }
}
