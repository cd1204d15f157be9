//! Cascading element deletion.
//!
//! # Overview
//!
//! Deleting an element takes its whole subtree with it, and every element
//! holding a resolved reference to anything in that subtree reacts
//! according to the reference kind's cascade policy: required relationships
//! pull their owner down too, optional ones lose the binding and are
//! re-resolved later, membership lists drop the entry.
//!
//! The order is fixed. Children go first, bottom-up; then the
//! anti-dependents react while the target is still fully present; the
//! structural removal comes last. Nothing ever observes a half-removed
//! element.

use log::debug;

use armillary_core::{
    arena::ElementId,
    identifier::Symbol,
    schema::{CascadePolicy, ElementKind, ReferenceKind},
};

use crate::{
    error::{EngineError, ValidationError},
    operation::{Operation, OperationId},
    processor,
    report::ChangeRecord,
    resolver,
    rules::RuleKind,
    transaction::TxContext,
};

/// Deletes one element, its subtree, and every anti-dependent whose
/// reference kind requires it.
///
/// A delete aimed at a kind that cannot go alone widens to its delete
/// root first: aiming at an association end deletes the association.
///
/// Deleting an element that is already gone, or already being deleted by
/// an enclosing cascade, is a no-op rather than an error: cascades in the
/// same batch routinely get there first.
#[derive(Debug)]
pub struct DeleteElement {
    id: OperationId,
    label: String,
    target: ElementId,
    captured: Option<Captured>,
}

/// Diagnostics captured while the target was still present.
#[derive(Debug)]
struct Captured {
    kind: ElementKind,
    symbol: Option<Symbol>,
}

impl DeleteElement {
    /// Creates an operation deleting `target` and everything that must go
    /// with it.
    pub fn new(target: ElementId) -> Self {
        Self {
            id: OperationId::fresh(),
            label: "delete element".to_owned(),
            target,
            captured: None,
        }
    }

    /// Walks up from `target` to the element a delete of `target` actually
    /// removes. An association end never goes alone; its association does.
    ///
    /// The walk stops below an ancestor that is already being deleted:
    /// that delete removes the child directly.
    fn delete_root(ctx: &TxContext<'_>, target: ElementId) -> ElementId {
        let mut root = target;
        loop {
            let element = match ctx.document().element(root) {
                Some(element) => element,
                None => return root,
            };
            if !element.kind().delete_escalates_to_parent() {
                return root;
            }
            match element.parent() {
                Some(parent) if !ctx.is_deleting(parent) => root = parent,
                _ => return root,
            }
        }
    }

    /// Applies each anti-dependent's cascade policy against the
    /// still-present target.
    fn apply_policies(&self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        let dependents: Vec<ElementId> =
            ctx.session().index().dependents_of(self.target).collect();
        for owner in dependents {
            if !ctx.document().is_alive(owner) || ctx.is_deleting(owner) {
                continue;
            }
            // Highest slot first, so removal does not shift the slots still
            // to visit.
            let slots: Vec<(usize, ReferenceKind)> = ctx
                .document()
                .element(owner)
                .map(|element| {
                    element
                        .references()
                        .iter()
                        .enumerate()
                        .filter(|(_, reference)| reference.target() == Some(self.target))
                        .map(|(slot, reference)| (slot, reference.kind()))
                        .collect()
                })
                .unwrap_or_default();
            for (slot, kind) in slots.into_iter().rev() {
                match kind.cascade_policy() {
                    CascadePolicy::DeleteOwner => {
                        debug!(
                            owner:% = owner,
                            target:% = self.target;
                            "reference requires its owner deleted"
                        );
                        // The nested delete widens to the owner's delete
                        // root on its own.
                        processor::invoke_single(ctx, Box::new(DeleteElement::new(owner)))?;
                        break;
                    }
                    CascadePolicy::ClearReference => {
                        resolver::unbind_slot(ctx.session_mut(), owner, slot)?;
                        ctx.record_change(ChangeRecord::ReferenceCleared {
                            element: owner,
                            kind,
                        });
                        ctx.schedule_rule(RuleKind::ResolveSubtree, owner);
                    }
                    CascadePolicy::RemoveReference => {
                        resolver::remove_slot(ctx.session_mut(), owner, slot)?;
                        ctx.record_change(ChangeRecord::ReferenceRemoved {
                            element: owner,
                            kind,
                        });
                        self.schedule_prune(ctx, owner, kind);
                    }
                }
            }
        }
        Ok(())
    }

    /// A key whose last member reference was removed gets pruned once the
    /// queue drains.
    fn schedule_prune(&self, ctx: &mut TxContext<'_>, owner: ElementId, kind: ReferenceKind) {
        if kind != ReferenceKind::KeyMember {
            return;
        }
        let emptied = ctx
            .document()
            .element(owner)
            .map(|element| {
                element.kind() == ElementKind::Key
                    && element
                        .references_of(ReferenceKind::KeyMember)
                        .next()
                        .is_none()
            })
            .unwrap_or(false);
        if emptied {
            ctx.schedule_rule(RuleKind::PruneEmptyKey, owner);
        }
    }
}

impl Operation for DeleteElement {
    fn id(&self) -> OperationId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn validate(&self, ctx: &TxContext<'_>) -> Result<(), ValidationError> {
        // A target already gone is a completed delete, not a failure.
        if let Some(element) = ctx.document().element(self.target) {
            if element.parent().is_none() {
                return Err(ValidationError::for_element(
                    self.target,
                    "the model root cannot be deleted",
                ));
            }
        }
        Ok(())
    }

    fn pre_invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        self.target = Self::delete_root(ctx, self.target);
        if let Some(element) = ctx.document().element(self.target) {
            self.captured = Some(Captured {
                kind: element.kind(),
                symbol: ctx.document().symbol_of(self.target),
            });
        }
        Ok(())
    }

    fn invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        if !ctx.document().is_alive(self.target) || ctx.is_deleting(self.target) {
            self.captured = None;
            return Ok(());
        }
        ctx.mark_deleting(self.target);

        // Children first, bottom-up through nested deletes.
        let children: Vec<ElementId> = ctx
            .document()
            .element(self.target)
            .map(|element| element.children().to_vec())
            .unwrap_or_default();
        for child in children {
            processor::invoke_single(ctx, Box::new(DeleteElement::new(child)))?;
        }

        // Anti-dependents react while the target is still fully present.
        self.apply_policies(ctx)?;

        // Structural removal comes last.
        resolver::unbind_outgoing(ctx.session_mut(), self.target)?;
        ctx.session_mut().index_mut().retire(self.target)?;
        ctx.document_mut().remove_element(self.target)?;
        debug!(target:% = self.target; "element removed");
        Ok(())
    }

    fn post_invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        if let Some(captured) = &self.captured {
            ctx.record_change(ChangeRecord::Deleted {
                element: self.target,
                kind: captured.kind,
                symbol: captured.symbol,
            });
        }
        Ok(())
    }
}
