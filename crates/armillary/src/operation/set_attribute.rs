//! Attribute updates.

use log::debug;

use armillary_core::{
    arena::ElementId,
    identifier::{Name, is_valid_name},
    value::Value,
};

use crate::{
    error::{EngineError, ValidationError},
    operation::{Operation, OperationId},
    report::ChangeRecord,
    transaction::TxContext,
};

/// Sets or removes one attribute on one element.
#[derive(Debug)]
pub struct SetAttribute {
    id: OperationId,
    label: String,
    target: ElementId,
    attribute: Name,
    value: Option<Value>,
}

impl SetAttribute {
    /// Creates an operation setting `attribute` on `target`, replacing any
    /// previous value.
    pub fn new(target: ElementId, attribute: Name, value: Value) -> Self {
        Self {
            id: OperationId::fresh(),
            label: format!("set attribute {attribute}"),
            target,
            attribute,
            value: Some(value),
        }
    }

    /// Creates an operation removing `attribute` from `target`. Removing
    /// an attribute the element does not have changes nothing.
    pub fn removing(target: ElementId, attribute: Name) -> Self {
        Self {
            id: OperationId::fresh(),
            label: format!("remove attribute {attribute}"),
            target,
            attribute,
            value: None,
        }
    }
}

impl Operation for SetAttribute {
    fn id(&self) -> OperationId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn validate(&self, ctx: &TxContext<'_>) -> Result<(), ValidationError> {
        if !ctx.document().is_alive(self.target) {
            return Err(ValidationError::for_element(
                self.target,
                format!("{}: element is no longer in the document", self.label),
            ));
        }
        let text = self.attribute.as_string();
        if !is_valid_name(&text) {
            return Err(ValidationError::new(format!(
                "`{text}` is not a legal attribute name"
            )));
        }
        Ok(())
    }

    fn invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        let element = ctx.document_mut().try_element_mut(self.target)?;
        match &self.value {
            Some(value) => {
                element.set_attribute(self.attribute, value.clone());
            }
            None => {
                element.remove_attribute(self.attribute);
            }
        }
        ctx.record_change(ChangeRecord::AttributeSet {
            element: self.target,
            attribute: self.attribute,
        });
        debug!(id:% = self.target, attribute:% = self.attribute; "attribute updated");
        Ok(())
    }
}
