//! Deferred consistency rules and their scheduler.
//!
//! # Overview
//!
//! Operations do not fix every invariant inline. Where a mutation leaves
//! follow-up work that several operations in one batch might demand for the
//! same element, they raise a rule: a `(kind, subject)` pair held by the
//! [`RuleScheduler`] until the operation queue drains. Duplicate raisings
//! collapse, so the work runs once no matter how many operations asked for
//! it.
//!
//! # Design
//!
//! - A [`Rule`] is data. What it does is selected by matching [`RuleKind`]
//!   at drain time; there are no stored callbacks to compare or clone.
//! - Rules run in the order first raised.
//! - A rule runs against live transaction state: it may enqueue operations
//!   and raise further rules, and the processor loops until quiescent.
//! - A rule whose subject died since it was raised is a no-op, not an
//!   error; cascades routinely delete subjects of pending rules.

use indexmap::IndexSet;

use log::{debug, warn};

use armillary_core::{
    arena::ElementId,
    schema::{ElementKind, ReferenceKind},
};

use crate::{
    error::EngineError, operation::DeleteElement, resolver, transaction::TxContext,
};

// ============================================================================
// Rule
// ============================================================================

/// The deferred follow-ups an operation may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Re-run binding resolution under the subject.
    ResolveSubtree,
    /// Delete the subject key element if it has no member references left.
    PruneEmptyKey,
    /// Warn about bindings still unresolved under the subject.
    ReportDangling,
}

impl RuleKind {
    /// Returns the kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveSubtree => "ResolveSubtree",
            Self::PruneEmptyKey => "PruneEmptyKey",
            Self::ReportDangling => "ReportDangling",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raised rule: a kind applied to a subject element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rule {
    kind: RuleKind,
    subject: ElementId,
}

impl Rule {
    /// Creates a rule of `kind` over `subject`.
    pub fn new(kind: RuleKind, subject: ElementId) -> Self {
        Self { kind, subject }
    }

    /// Returns what the rule does.
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Returns the element the rule applies to.
    pub fn subject(&self) -> ElementId {
        self.subject
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// The pending rules of one transaction, deduplicated, in first-raised
/// order.
#[derive(Debug, Clone, Default)]
pub struct RuleScheduler {
    pending: IndexSet<Rule>,
}

impl RuleScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises a rule. Returns whether it was newly raised; raising a rule
    /// already pending changes nothing, including its position.
    pub fn schedule(&mut self, kind: RuleKind, subject: ElementId) -> bool {
        self.pending.insert(Rule::new(kind, subject))
    }

    /// Returns whether `(kind, subject)` is pending.
    pub fn contains(&self, kind: RuleKind, subject: ElementId) -> bool {
        self.pending.contains(&Rule::new(kind, subject))
    }

    /// Returns the number of pending rules.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns whether no rules are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes every pending rule in first-raised order, leaving the
    /// scheduler empty for rules raised while the batch runs.
    pub(crate) fn take_pending(&mut self) -> Vec<Rule> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}

// ============================================================================
// Rule Bodies
// ============================================================================

/// Runs one rule against the live transaction.
pub(crate) fn run(ctx: &mut TxContext<'_>, rule: Rule) -> Result<(), EngineError> {
    debug!(kind:% = rule.kind(), subject:% = rule.subject(); "running rule");
    match rule.kind() {
        RuleKind::ResolveSubtree => resolve_subtree(ctx, rule.subject()),
        RuleKind::PruneEmptyKey => prune_empty_key(ctx, rule.subject()),
        RuleKind::ReportDangling => report_dangling(ctx, rule.subject()),
    }
}

fn resolve_subtree(ctx: &mut TxContext<'_>, subject: ElementId) -> Result<(), EngineError> {
    if !ctx.document().is_alive(subject) {
        return Ok(());
    }
    let outcome = resolver::resolve_subtree(ctx.session_mut(), subject)?;
    ctx.note_resolve_attempts(outcome.attempts());
    Ok(())
}

fn prune_empty_key(ctx: &mut TxContext<'_>, subject: ElementId) -> Result<(), EngineError> {
    let prune = match ctx.document().element(subject) {
        Some(element) => {
            element.kind() == ElementKind::Key
                && element
                    .references_of(ReferenceKind::KeyMember)
                    .next()
                    .is_none()
        }
        None => false,
    };
    if prune {
        debug!(subject:% = subject; "pruning key left without members");
        ctx.enqueue(Box::new(DeleteElement::new(subject)));
    }
    Ok(())
}

fn report_dangling(ctx: &mut TxContext<'_>, subject: ElementId) -> Result<(), EngineError> {
    if !ctx.document().is_alive(subject) {
        return Ok(());
    }
    for dangling in resolver::unresolved_under(ctx.document(), subject) {
        warn!(
            owner:% = dangling.owner(),
            kind:% = dangling.kind(),
            text:? = dangling.text().map(|text| text.as_string());
            "reference does not resolve to any element"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use armillary_core::document::Document;

    #[test]
    fn test_schedule_deduplicates() {
        let document = Document::new("Model");
        let root = document.root();
        let mut scheduler = RuleScheduler::new();

        assert!(scheduler.schedule(RuleKind::ResolveSubtree, root));
        assert!(!scheduler.schedule(RuleKind::ResolveSubtree, root));
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.contains(RuleKind::ResolveSubtree, root));
        assert!(!scheduler.contains(RuleKind::ReportDangling, root));
    }

    #[test]
    fn test_distinct_kinds_are_distinct_rules() {
        let document = Document::new("Model");
        let root = document.root();
        let mut scheduler = RuleScheduler::new();

        scheduler.schedule(RuleKind::ResolveSubtree, root);
        scheduler.schedule(RuleKind::ReportDangling, root);
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_take_pending_preserves_first_raised_order() {
        let document = Document::new("Model");
        let root = document.root();
        let mut scheduler = RuleScheduler::new();

        scheduler.schedule(RuleKind::ReportDangling, root);
        scheduler.schedule(RuleKind::ResolveSubtree, root);
        scheduler.schedule(RuleKind::ReportDangling, root);

        let batch = scheduler.take_pending();
        assert_eq!(
            batch,
            vec![
                Rule::new(RuleKind::ReportDangling, root),
                Rule::new(RuleKind::ResolveSubtree, root),
            ]
        );
        assert!(scheduler.is_empty());

        // The scheduler keeps working for rules raised during the batch.
        assert!(scheduler.schedule(RuleKind::ReportDangling, root));
        assert_eq!(scheduler.len(), 1);
    }
}
