//! Operations: the unit of mutation a transaction executes.
//!
//! # Overview
//!
//! Everything that changes a document goes through an [`Operation`]. The
//! processor drives each one through a fixed lifecycle, and an operation
//! may declare prerequisites: other operations whose produced elements it
//! needs, which the processor guarantees have completed first.
//!
//! The built-in operations cover the model editing surface:
//!
//! - [`CreateElement`]: create an element, with optional initial
//!   attributes and reference slots
//! - [`DeleteElement`]: cascading delete of an element, its subtree, and
//!   its required anti-dependents
//! - [`RenameElement`]: rename an element and heal the bindings into its
//!   subtree
//! - [`SetAttribute`]: set or remove one attribute
//! - [`SetReference`]: point, name, or clear one reference slot
//!
//! # Design
//!
//! - Operations are built before any of them run, so one cannot hold the
//!   element another will create. Prerequisite declarations close that gap:
//!   the dependent names the producer's [`OperationId`] and pulls the
//!   element out of the context once the producer has run.
//! - An operation never rolls back its own work. Failure anywhere aborts
//!   the whole transaction and the session restores the pre-transaction
//!   state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use armillary_core::arena::ElementId;

use crate::{
    error::{EngineError, ValidationError},
    transaction::TxContext,
};

mod create;
mod delete;
mod rename;
mod set_attribute;
mod set_reference;

pub use create::{CreateElement, NameSpec, ParentSource};
pub use delete::DeleteElement;
pub use rename::RenameElement;
pub use set_attribute::SetAttribute;
pub use set_reference::{RefValue, SetReference};

static NEXT_OPERATION_ID: AtomicU64 = AtomicU64::new(1);

/// The identity of one operation.
///
/// Ids are unique within the process, so a prerequisite declaration can
/// never collide with an operation from some other batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId(u64);

impl OperationId {
    /// Returns an id no other operation in this process has.
    pub fn fresh() -> Self {
        Self(NEXT_OPERATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// One unit of document mutation.
///
/// The processor drives an operation through a fixed lifecycle:
///
/// 1. [`resolve_prerequisites`](Operation::resolve_prerequisites): pull the
///    outputs of completed prerequisites into the operation's own fields.
/// 2. [`validate`](Operation::validate): check preconditions. Nothing has
///    mutated yet, so failing here is always clean.
/// 3. [`pre_invoke`](Operation::pre_invoke): capture before-state and raise
///    rules that apply regardless of the outcome.
/// 4. [`invoke`](Operation::invoke): the mutation itself. May enqueue
///    follow-up operations into the same transaction.
/// 5. [`post_invoke`](Operation::post_invoke): record results and raise
///    rules contingent on them.
///
/// All methods other than `validate` and `invoke` have no-op defaults.
pub trait Operation: fmt::Debug {
    /// Returns the identity other operations declare prerequisites by.
    fn id(&self) -> OperationId;

    /// Returns a short human-readable label, for logs and error messages.
    fn label(&self) -> &str;

    /// Returns the operations whose outputs this one needs. The processor
    /// will not run this operation before every one of them has completed.
    fn prerequisites(&self) -> &[OperationId] {
        &[]
    }

    /// Pulls prerequisite outputs out of the context.
    ///
    /// # Errors
    ///
    /// Fails if a declared prerequisite has no recorded output; the
    /// transaction aborts.
    fn resolve_prerequisites(&mut self, _ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    /// Checks preconditions against the current document.
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] here aborts the transaction before this
    /// operation mutates anything.
    fn validate(&self, ctx: &TxContext<'_>) -> Result<(), ValidationError>;

    /// Captures before-state and raises rules that must run because this
    /// operation happened, whatever its result.
    ///
    /// # Errors
    ///
    /// Any error aborts the transaction.
    fn pre_invoke(&mut self, _ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    /// Performs the mutation.
    ///
    /// # Errors
    ///
    /// Any error aborts the transaction; partially applied work is rolled
    /// back with it.
    fn invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError>;

    /// Raises rules contingent on the mutation's result and records what
    /// needed the mutation complete to describe.
    ///
    /// # Errors
    ///
    /// Any error aborts the transaction.
    fn post_invoke(&mut self, _ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    /// Returns the element this operation produced, once it has run.
    /// Dependents receive it through their own
    /// [`resolve_prerequisites`](Operation::resolve_prerequisites).
    fn output(&self) -> Option<ElementId> {
        None
    }
}
