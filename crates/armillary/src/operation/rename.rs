//! Element renaming.

use log::debug;

use armillary_core::{
    arena::ElementId,
    identifier::{Name, Symbol, is_valid_name},
};

use crate::{
    error::{EngineError, ValidationError},
    operation::{Operation, OperationId},
    report::ChangeRecord,
    resolver,
    transaction::TxContext,
};

/// Renames one element.
///
/// A rename moves the qualified paths of the element and its whole
/// subtree, so every binding resolved into that subtree has its stored
/// name re-derived in the same step. The targets did not move; only their
/// paths did.
#[derive(Debug)]
pub struct RenameElement {
    id: OperationId,
    label: String,
    target: ElementId,
    name: Name,
    previous: Option<Name>,
}

impl RenameElement {
    /// Creates an operation renaming `target` to `name`.
    pub fn new(target: ElementId, name: Name) -> Self {
        Self {
            id: OperationId::fresh(),
            label: "rename element".to_owned(),
            target,
            name,
            previous: None,
        }
    }
}

impl Operation for RenameElement {
    fn id(&self) -> OperationId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn validate(&self, ctx: &TxContext<'_>) -> Result<(), ValidationError> {
        let document = ctx.document();
        let Some(element) = document.element(self.target) else {
            return Err(ValidationError::for_element(
                self.target,
                format!("{}: element is no longer in the document", self.label),
            ));
        };
        if !element.kind().is_nameable() {
            return Err(ValidationError::for_element(
                self.target,
                format!("a {} does not carry a name", element.kind()),
            ));
        }
        let text = self.name.as_string();
        if !is_valid_name(&text) {
            return Err(ValidationError::new(format!(
                "`{text}` is not a legal element name"
            )));
        }

        let symbol = match element.parent().and_then(|parent| document.symbol_of(parent)) {
            Some(prefix) => prefix.join(self.name),
            None => Symbol::from_name(self.name),
        };
        let taken = document
            .symbols()
            .lookup(symbol)
            .iter()
            .any(|holder| *holder != self.target);
        if taken {
            return Err(ValidationError::for_element(
                self.target,
                format!("the name `{}` is already in use here", self.name),
            ));
        }
        Ok(())
    }

    fn invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        self.previous = ctx.document_mut().rename_element(self.target, self.name)?;

        // Re-derive the stored name of every binding into the renamed
        // subtree.
        for node in ctx.document().subtree(self.target) {
            let dependents: Vec<ElementId> = ctx.session().index().dependents_of(node).collect();
            for owner in dependents {
                let slots: Vec<usize> = ctx
                    .document()
                    .element(owner)
                    .map(|element| {
                        element
                            .references()
                            .iter()
                            .enumerate()
                            .filter(|(_, reference)| reference.target() == Some(node))
                            .map(|(slot, _)| slot)
                            .collect()
                    })
                    .unwrap_or_default();
                for slot in slots {
                    resolver::set_reference_target(ctx.session_mut(), owner, slot, node)?;
                }
            }
        }

        ctx.record_change(ChangeRecord::Renamed {
            element: self.target,
            from: self.previous,
            to: self.name,
        });
        debug!(id:% = self.target, name:% = self.name; "element renamed");
        Ok(())
    }
}
