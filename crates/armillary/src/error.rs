//! Error types for Armillary transactions.
//!
//! This module provides [`ValidationError`], raised by an operation's own
//! precondition checks, and [`EngineError`], the failure type a whole
//! transaction reports. Any error reaching the processor aborts the
//! transaction and rolls the session back.

use thiserror::Error;

use armillary_core::{arena::ElementId, document::DocumentError};

use crate::operation::OperationId;

/// A precondition failure reported by an operation before it mutates
/// anything.
///
/// Carries the offending element when there is one, so hosts can point at
/// it; the message is self-contained either way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    subject: Option<ElementId>,
}

impl ValidationError {
    /// Creates a validation error with no particular subject element.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subject: None,
        }
    }

    /// Creates a validation error blaming one element.
    pub fn for_element(subject: ElementId, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subject: Some(subject),
        }
    }

    /// Returns the element the error blames, if any.
    pub fn subject(&self) -> Option<ElementId> {
        self.subject
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The failure type for a transaction.
///
/// Every variant is fatal to the transaction that raised it: the processor
/// stops, restores the pre-transaction session state, and returns the error.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An operation's preconditions did not hold.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A structural mutation was rejected by the document.
    #[error("document rejected a mutation: {0}")]
    Document(#[from] DocumentError),

    /// A reference slot index did not exist on its owner.
    #[error("element {owner} has no reference slot {slot}")]
    SlotNotFound {
        /// The element the slot was expected on.
        owner: ElementId,
        /// The missing slot index.
        slot: usize,
    },

    /// An operation asked for the output of a prerequisite that never ran
    /// or ran without producing an element.
    #[error("operation `{label}` requires the output of {missing}, which never ran or produced no element")]
    MissingPrerequisite {
        /// Label of the operation whose prerequisite is missing.
        label: String,
        /// The prerequisite operation that has no recorded output.
        missing: OperationId,
    },

    /// Operations are queued but every one of them is waiting on a
    /// prerequisite that is not in the queue and has not completed.
    #[error("no queued operation is ready to run; {waiting} waiting on unmet prerequisites")]
    StalledQueue {
        /// Number of operations stuck in the queue.
        waiting: usize,
    },

    /// One transaction executed more operations than the configured cap.
    #[error("operation limit of {limit} exceeded in one transaction")]
    OperationLimitExceeded {
        /// The configured cap.
        limit: usize,
    },

    /// Rule scheduling kept producing work past the configured number of
    /// drain passes.
    #[error("rule pass limit of {limit} exceeded in one transaction")]
    RuleLimitExceeded {
        /// The configured cap.
        limit: usize,
    },

    /// The reverse-reference index disagreed with the document about an
    /// edge. Indicates a bookkeeping bug, never user error.
    #[error("reverse-reference index out of step for owner {owner} and target {target}")]
    IndexOutOfStep {
        /// Owner side of the edge.
        owner: ElementId,
        /// Target side of the edge.
        target: ElementId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("name `Customer` is already in use");
        assert_eq!(err.to_string(), "name `Customer` is already in use");
        assert_eq!(err.subject(), None);
    }

    #[test]
    fn test_validation_error_converts() {
        let err: EngineError = ValidationError::new("bad input").into();
        assert_eq!(err.to_string(), "bad input");
    }

    #[test]
    fn test_document_error_converts() {
        let err: EngineError = DocumentError::RootRemoval.into();
        assert!(err.to_string().contains("document rejected a mutation"));
    }
}
