//! What a committed transaction reports back to its caller.
//!
//! # Overview
//!
//! Exported types:
//! - [`CommitReport`]: Everything a caller learns from a committed
//!   transaction
//! - [`ChangeRecord`]: One observable document change, in the order the
//!   changes happened
//! - [`UnresolvedReference`]: A binding that is still dangling after the
//!   final resolution pass
//! - [`TxStats`]: Counters for how much work the transaction did
//!
//! Failed transactions return an error instead; there is no report for
//! work that was rolled back.

use armillary_core::{
    arena::ElementId,
    identifier::{Name, Symbol},
    schema::{ElementKind, ReferenceKind},
};

/// One observable document change.
///
/// Records carry symbols and names rather than just handles, because for
/// deletions the handle is stale by the time the caller reads the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    /// An element was created.
    Created {
        /// Handle of the new element.
        element: ElementId,
        /// Kind of the new element.
        kind: ElementKind,
        /// Qualified symbol, for named kinds.
        symbol: Option<Symbol>,
    },
    /// An element was deleted. The handle is stale.
    Deleted {
        /// Handle the element had.
        element: ElementId,
        /// Kind of the deleted element.
        kind: ElementKind,
        /// Qualified symbol it was registered under, for named kinds.
        symbol: Option<Symbol>,
    },
    /// An element was renamed.
    Renamed {
        /// Handle of the renamed element.
        element: ElementId,
        /// The previous name.
        from: Option<Name>,
        /// The new name.
        to: Name,
    },
    /// An attribute was set or overwritten.
    AttributeSet {
        /// Handle of the element.
        element: ElementId,
        /// The attribute name.
        attribute: Name,
    },
    /// A reference slot was given a target or a new name.
    ReferenceSet {
        /// Handle of the owning element.
        element: ElementId,
        /// Kind of the reference.
        kind: ReferenceKind,
        /// The symbolic name now carried by the slot, if any.
        text: Option<Symbol>,
    },
    /// A reference slot was cleared to explicitly-undefined.
    ReferenceCleared {
        /// Handle of the owning element.
        element: ElementId,
        /// Kind of the reference.
        kind: ReferenceKind,
    },
    /// A reference slot was removed from its owner.
    ReferenceRemoved {
        /// Handle of the owning element.
        element: ElementId,
        /// Kind of the reference.
        kind: ReferenceKind,
    },
}

/// A binding still dangling when the transaction committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedReference {
    owner: ElementId,
    kind: ReferenceKind,
    text: Option<Symbol>,
}

impl UnresolvedReference {
    pub(crate) fn new(owner: ElementId, kind: ReferenceKind, text: Option<Symbol>) -> Self {
        Self { owner, kind, text }
    }

    /// Returns the element owning the dangling binding.
    pub fn owner(&self) -> ElementId {
        self.owner
    }

    /// Returns the reference kind of the dangling binding.
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Returns the name the binding is waiting to resolve, if one is set.
    pub fn text(&self) -> Option<Symbol> {
        self.text
    }
}

/// Counters for how much work one transaction did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
    operations_run: usize,
    rules_run: usize,
    resolve_attempts: usize,
}

impl TxStats {
    /// Returns how many operations executed, nested ones included.
    pub fn operations_run(&self) -> usize {
        self.operations_run
    }

    /// Returns how many deferred rules executed.
    pub fn rules_run(&self) -> usize {
        self.rules_run
    }

    /// Returns how many binding resolutions were attempted, the final pass
    /// included.
    pub fn resolve_attempts(&self) -> usize {
        self.resolve_attempts
    }

    pub(crate) fn note_operation(&mut self) {
        self.operations_run += 1;
    }

    pub(crate) fn note_rule(&mut self) {
        self.rules_run += 1;
    }

    pub(crate) fn note_resolve_attempts(&mut self, attempts: usize) {
        self.resolve_attempts += attempts;
    }
}

/// Everything a caller learns from a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    label: String,
    stats: TxStats,
    changes: Vec<ChangeRecord>,
    unresolved: Vec<UnresolvedReference>,
}

impl CommitReport {
    pub(crate) fn new(
        label: String,
        stats: TxStats,
        changes: Vec<ChangeRecord>,
        unresolved: Vec<UnresolvedReference>,
    ) -> Self {
        Self {
            label,
            stats,
            changes,
            unresolved,
        }
    }

    /// Returns the transaction's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the work counters.
    pub fn stats(&self) -> TxStats {
        self.stats
    }

    /// Returns the change records in the order the changes happened.
    pub fn changes(&self) -> &[ChangeRecord] {
        &self.changes
    }

    /// Returns the bindings still dangling after the final resolution
    /// pass, in document order.
    ///
    /// Dangling bindings are legal: the document is allowed to reference
    /// names that nothing defines yet.
    pub fn unresolved(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }
}
