//! Reference slot updates.

use log::debug;

use armillary_core::{
    arena::ElementId,
    element::{Binding, Reference},
    identifier::Symbol,
    schema::ReferenceKind,
};

use crate::{
    error::{EngineError, ValidationError},
    operation::{Operation, OperationId},
    report::ChangeRecord,
    resolver,
    rules::RuleKind,
    transaction::TxContext,
};

/// What to put in a reference slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefValue {
    /// A symbolic name, resolved on the spot if the target exists and by a
    /// later pass otherwise.
    Name(Symbol),
    /// An element to bind directly; the stored name is derived from its
    /// symbol.
    Target(ElementId),
    /// The element an earlier operation in the batch will create. That
    /// operation becomes a prerequisite.
    TargetFromOperation(OperationId),
    /// Clear the slot to explicitly undefined.
    Clear,
}

/// Sets, names, or clears the reference slot of one kind on one element.
///
/// The operation works on the owner's first slot of the given kind,
/// creating the slot when the owner has none yet.
#[derive(Debug)]
pub struct SetReference {
    id: OperationId,
    label: String,
    owner: ElementId,
    kind: ReferenceKind,
    value: RefValue,
    resolved_target: Option<ElementId>,
    prerequisites: Vec<OperationId>,
}

impl SetReference {
    /// Creates an operation putting `value` into the `kind` slot of
    /// `owner`.
    pub fn new(owner: ElementId, kind: ReferenceKind, value: RefValue) -> Self {
        let prerequisites = match value {
            RefValue::TargetFromOperation(producer) => vec![producer],
            _ => Vec::new(),
        };
        Self {
            id: OperationId::fresh(),
            label: format!("set {kind} reference"),
            owner,
            kind,
            value,
            resolved_target: None,
            prerequisites,
        }
    }

    fn effective_target(&self) -> Option<ElementId> {
        match self.value {
            RefValue::Target(target) => Some(target),
            RefValue::TargetFromOperation(_) => self.resolved_target,
            RefValue::Name(_) | RefValue::Clear => None,
        }
    }
}

impl Operation for SetReference {
    fn id(&self) -> OperationId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn prerequisites(&self) -> &[OperationId] {
        &self.prerequisites
    }

    fn resolve_prerequisites(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        if let RefValue::TargetFromOperation(producer) = self.value {
            let target = ctx.require_output(&self.label, producer)?;
            self.resolved_target = Some(target);
        }
        Ok(())
    }

    fn validate(&self, ctx: &TxContext<'_>) -> Result<(), ValidationError> {
        let document = ctx.document();
        let Some(element) = document.element(self.owner) else {
            return Err(ValidationError::for_element(
                self.owner,
                format!("{}: element is no longer in the document", self.label),
            ));
        };
        if element.kind() != self.kind.owner_kind() {
            return Err(ValidationError::for_element(
                self.owner,
                format!(
                    "a {} reference cannot live on a {}",
                    self.kind,
                    element.kind()
                ),
            ));
        }
        if let Some(target) = self.effective_target() {
            let Some(target_element) = document.element(target) else {
                return Err(ValidationError::for_element(
                    target,
                    format!("{}: target is no longer in the document", self.label),
                ));
            };
            if target_element.kind() != self.kind.target_kind() {
                return Err(ValidationError::for_element(
                    target,
                    format!(
                        "a {} reference must point at a {}, not a {}",
                        self.kind,
                        self.kind.target_kind(),
                        target_element.kind()
                    ),
                ));
            }
        }
        Ok(())
    }

    fn invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        let slot = match ctx
            .document()
            .element(self.owner)
            .and_then(|element| element.first_reference_of(self.kind))
        {
            Some(slot) => slot,
            None => ctx
                .document_mut()
                .try_element_mut(self.owner)?
                .push_reference(Reference::new(self.kind, None)),
        };

        match self.value {
            RefValue::Name(text) => {
                resolver::set_reference_text(ctx.session_mut(), self.owner, slot, Some(text))?;
                resolver::resolve_slot(ctx.session_mut(), self.owner, slot)?;
                ctx.record_change(ChangeRecord::ReferenceSet {
                    element: self.owner,
                    kind: self.kind,
                    text: Some(text),
                });
            }
            RefValue::Target(_) | RefValue::TargetFromOperation(_) => {
                let target = self.effective_target().ok_or_else(|| {
                    ValidationError::new(format!("{}: target is not known yet", self.label))
                })?;
                resolver::set_reference_target(ctx.session_mut(), self.owner, slot, target)?;
                let text = ctx.document().symbol_of(target);
                ctx.record_change(ChangeRecord::ReferenceSet {
                    element: self.owner,
                    kind: self.kind,
                    text,
                });
            }
            RefValue::Clear => {
                resolver::clear_slot(ctx.session_mut(), self.owner, slot)?;
                ctx.record_change(ChangeRecord::ReferenceCleared {
                    element: self.owner,
                    kind: self.kind,
                });
            }
        }
        debug!(owner:% = self.owner, kind:% = self.kind; "reference slot updated");
        Ok(())
    }

    fn post_invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        let mut dangling = false;
        if let Some(element) = ctx.document().element(self.owner) {
            if let Some(slot) = element.first_reference_of(self.kind) {
                if let Some(reference) = element.reference(slot) {
                    dangling = matches!(reference.binding(), Binding::Unresolved(Some(_)));
                }
            }
        }
        if dangling {
            ctx.schedule_rule(RuleKind::ReportDangling, self.owner);
        }
        Ok(())
    }
}
