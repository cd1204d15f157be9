//! The transaction processor.
//!
//! # Overview
//!
//! A [`Processor`] runs one transaction against a session: operations in
//! enqueue order except where prerequisites force waiting, then rule
//! draining to quiescence, then one final document-wide resolution pass.
//! Committing returns a [`CommitReport`]; any error rolls the session back
//! to the state it had before the transaction started.
//!
//! # Design
//!
//! - The work queue is live. Operations and rules may enqueue more
//!   operations mid-flight and they join the same transaction;
//!   [`EngineConfig`] caps total work so a self-feeding batch fails instead
//!   of spinning.
//! - A processor is one-shot: [`Processor::invoke`] consumes it. A new
//!   transaction means a new processor over the same session.
//! - Nested execution goes through [`invoke_single`], which shares the
//!   enclosing transaction's rules, outputs, context values, and change
//!   records.

use log::{debug, error, info};

use armillary_core::arena::ElementId;

use crate::{
    config::EngineConfig,
    error::EngineError,
    operation::Operation,
    report::CommitReport,
    resolver, rules,
    session::Session,
    transaction::{Transaction, TxContext},
};

/// Drives one transaction over a session.
///
/// # Examples
///
/// ```
/// use armillary::{
///     document::Document,
///     operation::{CreateElement, NameSpec},
///     processor::Processor,
///     schema::ElementKind,
///     session::Session,
///     identifier::Name,
/// };
///
/// let mut session = Session::new(Document::new("Model"));
/// let root = session.document().root();
///
/// let mut processor = Processor::new(&mut session, "add customer");
/// processor.enqueue(Box::new(CreateElement::new(
///     ElementKind::EntityType,
///     root,
///     NameSpec::Explicit(Name::new("Customer")),
/// )));
/// let report = processor.invoke().expect("transaction failed");
///
/// assert_eq!(report.label(), "add customer");
/// assert_eq!(report.stats().operations_run(), 1);
/// ```
pub struct Processor<'a> {
    session: &'a mut Session,
    tx: Transaction,
}

impl<'a> Processor<'a> {
    /// Creates a processor for one labelled transaction with default caps.
    pub fn new(session: &'a mut Session, label: impl Into<String>) -> Self {
        Self::with_config(session, label, EngineConfig::default())
    }

    /// Creates a processor with explicit caps.
    pub fn with_config(
        session: &'a mut Session,
        label: impl Into<String>,
        config: EngineConfig,
    ) -> Self {
        Self {
            session,
            tx: Transaction::new(label.into(), config),
        }
    }

    /// Adds an operation to the transaction's queue.
    pub fn enqueue(&mut self, operation: Box<dyn Operation>) {
        self.tx.enqueue(operation);
    }

    /// Runs every queued operation to fixed point, drains the rules, makes
    /// the final resolution pass, and commits.
    ///
    /// # Errors
    ///
    /// Any failure anywhere in the batch aborts the whole transaction and
    /// restores the session to the state it had before this call.
    pub fn invoke(mut self) -> Result<CommitReport, EngineError> {
        info!(label = self.tx.label(); "transaction started");
        self.session.begin_checkpoint();
        match self.run() {
            Ok(report) => {
                self.session.commit_checkpoint();
                info!(
                    label = report.label(),
                    operations = report.stats().operations_run(),
                    rules = report.stats().rules_run(),
                    changes = report.changes().len();
                    "transaction committed"
                );
                Ok(report)
            }
            Err(err) => {
                self.session.rollback_checkpoint();
                error!(label = self.tx.label(), err:% = err; "transaction rolled back");
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<CommitReport, EngineError> {
        let mut passes = 0usize;
        loop {
            self.drain_operations()?;
            if !self.tx.rules_pending() {
                break;
            }
            passes += 1;
            if passes > self.tx.config().max_rule_passes() {
                return Err(EngineError::RuleLimitExceeded {
                    limit: self.tx.config().max_rule_passes(),
                });
            }
            for rule in self.tx.take_pending_rules() {
                let mut ctx = TxContext::new(&mut *self.session, &mut self.tx);
                rules::run(&mut ctx, rule)?;
                self.tx.stats_mut().note_rule();
            }
        }

        // Final pass: bindings left unresolved earlier may be satisfiable
        // by elements this transaction added.
        let root = self.session.document().root();
        let outcome = resolver::resolve_subtree(self.session, root)?;
        self.tx.stats_mut().note_resolve_attempts(outcome.attempts());
        let unresolved = resolver::unresolved_under(self.session.document(), root);
        Ok(self.tx.build_report(unresolved))
    }

    /// Runs queued operations until none remain, always picking the first
    /// one whose prerequisites have completed.
    fn drain_operations(&mut self) -> Result<(), EngineError> {
        while !self.tx.is_queue_empty() {
            let Some(position) = self.tx.ready_position() else {
                return Err(EngineError::StalledQueue {
                    waiting: self.tx.queue_len(),
                });
            };
            let Some(operation) = self.tx.take_operation(position) else {
                // The position came from the queue itself.
                break;
            };
            let mut ctx = TxContext::new(&mut *self.session, &mut self.tx);
            invoke_single(&mut ctx, operation)?;
        }
        Ok(())
    }
}

/// Runs one operation through its full lifecycle inside an existing
/// transaction, recording its output for later prerequisite pulls.
///
/// This is how cascades and rules run nested operations. The operation
/// shares the enclosing transaction's rule set, outputs, context values,
/// and change records, and counts against the same operation cap.
///
/// # Errors
///
/// Fails if the operation cap is exhausted or any lifecycle step fails;
/// the error aborts the enclosing transaction.
pub fn invoke_single(
    ctx: &mut TxContext<'_>,
    mut operation: Box<dyn Operation>,
) -> Result<Option<ElementId>, EngineError> {
    let limit = ctx.max_operations();
    if ctx.operations_run() >= limit {
        return Err(EngineError::OperationLimitExceeded { limit });
    }
    ctx.note_operation();

    debug!(id:% = operation.id(), label = operation.label(); "operation starting");
    operation.resolve_prerequisites(ctx)?;
    operation.validate(ctx)?;
    operation.pre_invoke(ctx)?;
    operation.invoke(ctx)?;
    operation.post_invoke(ctx)?;

    let output = operation.output();
    ctx.register_output(operation.id(), output);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use armillary_core::{
        document::Document,
        identifier::Name,
        schema::ElementKind,
    };

    use crate::operation::{CreateElement, NameSpec, OperationId};

    #[test]
    fn test_empty_transaction_commits() {
        let mut session = Session::new(Document::new("Model"));
        let processor = Processor::new(&mut session, "noop");

        let report = processor.invoke().unwrap();
        assert_eq!(report.label(), "noop");
        assert_eq!(report.stats().operations_run(), 0);
        assert!(report.changes().is_empty());
    }

    #[test]
    fn test_unsatisfiable_prerequisite_stalls() {
        let mut session = Session::new(Document::new("Model"));
        let mut processor = Processor::new(&mut session, "stuck");
        processor.enqueue(Box::new(CreateElement::under_output(
            ElementKind::Property,
            OperationId::fresh(),
            NameSpec::Explicit(Name::new("Id")),
        )));

        let err = processor.invoke().unwrap_err();
        assert_eq!(err, EngineError::StalledQueue { waiting: 1 });
        assert_eq!(session.document().len(), 1);
    }

    #[test]
    fn test_operation_cap_aborts() {
        let mut session = Session::new(Document::new("Model"));
        let root = session.document().root();
        let mut processor =
            Processor::with_config(&mut session, "too much", EngineConfig::new(1, 100));
        processor.enqueue(Box::new(CreateElement::new(
            ElementKind::EntityType,
            root,
            NameSpec::Explicit(Name::new("A")),
        )));
        processor.enqueue(Box::new(CreateElement::new(
            ElementKind::EntityType,
            root,
            NameSpec::Explicit(Name::new("B")),
        )));

        let err = processor.invoke().unwrap_err();
        assert_eq!(err, EngineError::OperationLimitExceeded { limit: 1 });
        // Rolled back: neither create survived.
        assert_eq!(session.document().len(), 1);
    }

    #[test]
    fn test_rule_pass_cap_aborts() {
        let mut session = Session::new(Document::new("Model"));
        let root = session.document().root();
        let mut processor =
            Processor::with_config(&mut session, "no rules allowed", EngineConfig::new(100, 0));
        processor.enqueue(Box::new(CreateElement::new(
            ElementKind::EntityType,
            root,
            NameSpec::Explicit(Name::new("Customer")),
        )));

        let err = processor.invoke().unwrap_err();
        assert_eq!(err, EngineError::RuleLimitExceeded { limit: 0 });
        assert_eq!(session.document().len(), 1);
    }
}
