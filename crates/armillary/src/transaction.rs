//! Per-transaction state and the context handed to operations.
//!
//! # Overview
//!
//! A transaction is one batch of work against a session: the operation
//! queue, the outputs of completed operations, the raised rules, the change
//! records, and a bag of context values operations use to coordinate. The
//! [`TxContext`] borrows that state together with the session and is the
//! only handle an operation receives during its lifecycle.
//!
//! # Design
//!
//! - Operations never see the processor. Everything they may legitimately
//!   do, [`TxContext`] exposes; everything else stays out of reach.
//! - Outputs are keyed by operation id, which is what prerequisite
//!   declarations name.
//! - The deleting set guards cascade recursion: an element already being
//!   deleted in this transaction is never deleted twice, however tangled
//!   the reference graph.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

use armillary_core::{arena::ElementId, document::Document, value::Value};

use crate::{
    config::EngineConfig,
    error::EngineError,
    operation::{Operation, OperationId},
    report::{ChangeRecord, CommitReport, TxStats, UnresolvedReference},
    rules::{Rule, RuleKind, RuleScheduler},
    session::Session,
};

/// One value in a transaction's context bag.
///
/// The bag lets cooperating operations pass state around without knowing
/// about each other, e.g. a paste handler stashing the target container for
/// the operations it enqueues.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// An element handle.
    Element(ElementId),
    /// A plain scalar.
    Scalar(Value),
}

impl ContextValue {
    /// Returns the element handle if this is one.
    pub fn as_element(&self) -> Option<ElementId> {
        match self {
            Self::Element(id) => Some(*id),
            Self::Scalar(_) => None,
        }
    }

    /// Returns the scalar if this is one.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Element(_) => None,
            Self::Scalar(value) => Some(value),
        }
    }
}

/// The accumulated state of one running transaction.
#[derive(Debug)]
pub(crate) struct Transaction {
    label: String,
    config: EngineConfig,
    queue: VecDeque<Box<dyn Operation>>,
    outputs: IndexMap<OperationId, Option<ElementId>>,
    scheduler: RuleScheduler,
    deleting: IndexSet<ElementId>,
    context: IndexMap<String, ContextValue>,
    changes: Vec<ChangeRecord>,
    stats: TxStats,
}

impl Transaction {
    pub(crate) fn new(label: String, config: EngineConfig) -> Self {
        Self {
            label,
            config,
            queue: VecDeque::new(),
            outputs: IndexMap::new(),
            scheduler: RuleScheduler::new(),
            deleting: IndexSet::new(),
            context: IndexMap::new(),
            changes: Vec::new(),
            stats: TxStats::default(),
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn enqueue(&mut self, operation: Box<dyn Operation>) {
        self.queue.push_back(operation);
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_queue_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Position of the first queued operation whose prerequisites have all
    /// completed. `None` with a non-empty queue means the batch is stuck.
    pub(crate) fn ready_position(&self) -> Option<usize> {
        self.queue.iter().position(|operation| {
            operation
                .prerequisites()
                .iter()
                .all(|prerequisite| self.outputs.contains_key(prerequisite))
        })
    }

    pub(crate) fn take_operation(&mut self, position: usize) -> Option<Box<dyn Operation>> {
        self.queue.remove(position)
    }

    pub(crate) fn register_output(&mut self, id: OperationId, output: Option<ElementId>) {
        self.outputs.insert(id, output);
    }

    pub(crate) fn output_of(&self, id: OperationId) -> Option<ElementId> {
        self.outputs.get(&id).copied().flatten()
    }

    pub(crate) fn schedule_rule(&mut self, kind: RuleKind, subject: ElementId) -> bool {
        self.scheduler.schedule(kind, subject)
    }

    pub(crate) fn rules_pending(&self) -> bool {
        !self.scheduler.is_empty()
    }

    pub(crate) fn take_pending_rules(&mut self) -> Vec<Rule> {
        self.scheduler.take_pending()
    }

    pub(crate) fn mark_deleting(&mut self, id: ElementId) -> bool {
        self.deleting.insert(id)
    }

    pub(crate) fn is_deleting(&self, id: ElementId) -> bool {
        self.deleting.contains(&id)
    }

    pub(crate) fn record_change(&mut self, change: ChangeRecord) {
        self.changes.push(change);
    }

    pub(crate) fn set_context_value(&mut self, key: String, value: ContextValue) {
        self.context.insert(key, value);
    }

    pub(crate) fn context_value(&self, key: &str) -> Option<&ContextValue> {
        self.context.get(key)
    }

    pub(crate) fn stats(&self) -> TxStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TxStats {
        &mut self.stats
    }

    /// Assembles the commit report, emptying the change journal.
    pub(crate) fn build_report(&mut self, unresolved: Vec<UnresolvedReference>) -> CommitReport {
        CommitReport::new(
            self.label.clone(),
            self.stats,
            std::mem::take(&mut self.changes),
            unresolved,
        )
    }
}

/// What an operation sees while it runs.
///
/// A context borrows the session and the transaction for the duration of
/// one lifecycle call. Mutating the document goes through
/// [`TxContext::session_mut`] and the resolver functions; the rest of the
/// surface is the transaction-level machinery operations coordinate
/// through.
pub struct TxContext<'a> {
    session: &'a mut Session,
    tx: &'a mut Transaction,
}

impl<'a> TxContext<'a> {
    pub(crate) fn new(session: &'a mut Session, tx: &'a mut Transaction) -> Self {
        Self { session, tx }
    }

    /// Returns the session.
    pub fn session(&self) -> &Session {
        self.session
    }

    /// Returns the session mutably, for resolver calls and index reads.
    pub fn session_mut(&mut self) -> &mut Session {
        self.session
    }

    /// Returns the document.
    pub fn document(&self) -> &Document {
        self.session.document()
    }

    /// Returns the document mutably.
    pub fn document_mut(&mut self) -> &mut Document {
        self.session.document_mut()
    }

    /// Returns the transaction's label.
    pub fn label(&self) -> &str {
        self.tx.label()
    }

    /// Adds an operation to the end of the live queue. It runs within the
    /// same transaction, after the operations already queued.
    pub fn enqueue(&mut self, operation: Box<dyn Operation>) {
        self.tx.enqueue(operation);
    }

    /// Returns the element a completed operation produced, if it produced
    /// one.
    pub fn output_of(&self, id: OperationId) -> Option<ElementId> {
        self.tx.output_of(id)
    }

    /// Returns the element a completed prerequisite produced.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::MissingPrerequisite`] if the operation
    /// never ran or produced no element. The processor never runs an
    /// operation before its declared prerequisites, so hitting this means
    /// the prerequisite was not declared.
    pub fn require_output(&self, label: &str, id: OperationId) -> Result<ElementId, EngineError> {
        self.tx
            .output_of(id)
            .ok_or_else(|| EngineError::MissingPrerequisite {
                label: label.to_owned(),
                missing: id,
            })
    }

    /// Raises a rule to run after the operation queue drains. Returns
    /// whether it was newly raised.
    pub fn schedule_rule(&mut self, kind: RuleKind, subject: ElementId) -> bool {
        self.tx.schedule_rule(kind, subject)
    }

    /// Appends one entry to the transaction's change journal.
    pub fn record_change(&mut self, change: ChangeRecord) {
        self.tx.record_change(change);
    }

    /// Stores a context value under `key`, replacing any previous one.
    pub fn set_context_value(&mut self, key: impl Into<String>, value: ContextValue) {
        self.tx.set_context_value(key.into(), value);
    }

    /// Returns the context value stored under `key`.
    pub fn context_value(&self, key: &str) -> Option<&ContextValue> {
        self.tx.context_value(key)
    }

    pub(crate) fn mark_deleting(&mut self, id: ElementId) -> bool {
        self.tx.mark_deleting(id)
    }

    pub(crate) fn is_deleting(&self, id: ElementId) -> bool {
        self.tx.is_deleting(id)
    }

    pub(crate) fn operations_run(&self) -> usize {
        self.tx.stats().operations_run()
    }

    pub(crate) fn max_operations(&self) -> usize {
        self.tx.config().max_operations()
    }

    pub(crate) fn note_operation(&mut self) {
        self.tx.stats_mut().note_operation();
    }

    pub(crate) fn note_resolve_attempts(&mut self, attempts: usize) {
        self.tx.stats_mut().note_resolve_attempts(attempts);
    }

    pub(crate) fn register_output(&mut self, id: OperationId, output: Option<ElementId>) {
        self.tx.register_output(id, output);
    }
}
