//! Element creation.

use log::debug;

use armillary_core::{
    arena::ElementId,
    element::Reference,
    identifier::{Name, Symbol, is_valid_name},
    schema::{ElementKind, ReferenceKind},
    value::Value,
};

use crate::{
    error::{EngineError, ValidationError},
    operation::{Operation, OperationId},
    report::ChangeRecord,
    rules::RuleKind,
    transaction::TxContext,
};

/// Where a new element's parent comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentSource {
    /// An element that already exists.
    Fixed(ElementId),
    /// The element an earlier operation in the same batch will create.
    FromOperation(OperationId),
}

/// How a new element gets its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSpec {
    /// Use this name; taken names fail validation.
    Explicit(Name),
    /// Derive a free name from a stem: `Entity`, `Entity1`, `Entity2`, and
    /// so on.
    Unique(String),
    /// No name, for kinds that do not carry one.
    Unnamed,
}

/// Creates one element, with optional initial attributes and reference
/// slots.
///
/// The created element is this operation's output, so later operations in
/// the batch can parent under it or point references at it by declaring
/// this operation as a prerequisite.
#[derive(Debug)]
pub struct CreateElement {
    id: OperationId,
    label: String,
    kind: ElementKind,
    parent: ParentSource,
    parent_out: Option<ElementId>,
    name: NameSpec,
    attributes: Vec<(Name, Value)>,
    references: Vec<(ReferenceKind, Option<Symbol>)>,
    prerequisites: Vec<OperationId>,
    created: Option<ElementId>,
}

impl CreateElement {
    /// Creates an operation producing one `kind` element under `parent`.
    pub fn new(kind: ElementKind, parent: ElementId, name: NameSpec) -> Self {
        Self::with_parent_source(kind, ParentSource::Fixed(parent), name)
    }

    /// Like [`CreateElement::new`], but parented under the element another
    /// operation will create. That operation becomes a prerequisite.
    pub fn under_output(kind: ElementKind, producer: OperationId, name: NameSpec) -> Self {
        Self::with_parent_source(kind, ParentSource::FromOperation(producer), name)
    }

    fn with_parent_source(kind: ElementKind, parent: ParentSource, name: NameSpec) -> Self {
        let prerequisites = match parent {
            ParentSource::Fixed(_) => Vec::new(),
            ParentSource::FromOperation(producer) => vec![producer],
        };
        Self {
            id: OperationId::fresh(),
            label: format!("create {kind}"),
            kind,
            parent,
            parent_out: None,
            name,
            attributes: Vec::new(),
            references: Vec::new(),
            prerequisites,
            created: None,
        }
    }

    /// Adds an initial attribute.
    pub fn with_attribute(mut self, name: Name, value: Value) -> Self {
        self.attributes.push((name, value));
        self
    }

    /// Adds an initial reference slot, optionally already carrying the name
    /// of its intended target.
    pub fn with_reference(mut self, kind: ReferenceKind, text: Option<Symbol>) -> Self {
        self.references.push((kind, text));
        self
    }

    fn parent_id(&self) -> Option<ElementId> {
        match self.parent {
            ParentSource::Fixed(id) => Some(id),
            ParentSource::FromOperation(_) => self.parent_out,
        }
    }
}

impl Operation for CreateElement {
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
        if let ParentSource::FromOperation(producer) = self.parent {
            let parent = ctx.require_output(&self.label, producer)?;
            self.parent_out = Some(parent);
        }
        Ok(())
    }

    fn validate(&self, ctx: &TxContext<'_>) -> Result<(), ValidationError> {
        let Some(parent) = self.parent_id() else {
            return Err(ValidationError::new(format!(
                "{}: parent is not known yet",
                self.label
            )));
        };
        let document = ctx.document();
        let Some(parent_element) = document.element(parent) else {
            return Err(ValidationError::for_element(
                parent,
                format!("{}: parent is no longer in the document", self.label),
            ));
        };
        if !self.kind.allowed_under(parent_element.kind()) {
            return Err(ValidationError::for_element(
                parent,
                format!(
                    "a {} cannot contain a {}",
                    parent_element.kind(),
                    self.kind
                ),
            ));
        }

        match &self.name {
            NameSpec::Explicit(name) => {
                if !self.kind.is_nameable() {
                    return Err(ValidationError::new(format!(
                        "a {} does not carry a name",
                        self.kind
                    )));
                }
                let text = name.as_string();
                if !is_valid_name(&text) {
                    return Err(ValidationError::new(format!(
                        "`{text}` is not a legal element name"
                    )));
                }
                let symbol = match document.symbol_of(parent) {
                    Some(prefix) => prefix.join(*name),
                    None => Symbol::from_name(*name),
                };
                if !document.symbols().lookup(symbol).is_empty() {
                    return Err(ValidationError::for_element(
                        parent,
                        format!("the name `{name}` is already in use here"),
                    ));
                }
            }
            NameSpec::Unique(stem) => {
                if !self.kind.is_nameable() {
                    return Err(ValidationError::new(format!(
                        "a {} does not carry a name",
                        self.kind
                    )));
                }
                if !is_valid_name(stem) {
                    return Err(ValidationError::new(format!(
                        "`{stem}` is not a legal name stem"
                    )));
                }
            }
            NameSpec::Unnamed => {
                if self.kind.is_nameable() {
                    return Err(ValidationError::new(format!(
                        "a {} requires a name",
                        self.kind
                    )));
                }
            }
        }
        Ok(())
    }

    fn invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        let parent = self.parent_id().ok_or_else(|| {
            ValidationError::new(format!("{}: parent is not known yet", self.label))
        })?;
        let name = match &self.name {
            NameSpec::Explicit(name) => Some(*name),
            NameSpec::Unique(stem) => Some(ctx.document().unique_name(parent, stem)),
            NameSpec::Unnamed => None,
        };

        let created = ctx.document_mut().create_element(parent, self.kind, name)?;
        if let Some(element) = ctx.document_mut().element_mut(created) {
            for (attribute, value) in &self.attributes {
                element.set_attribute(*attribute, value.clone());
            }
            for (kind, text) in &self.references {
                element.push_reference(Reference::new(*kind, *text));
            }
        }

        let symbol = ctx.document().symbol_of(created);
        ctx.record_change(ChangeRecord::Created {
            element: created,
            kind: self.kind,
            symbol,
        });
        debug!(id:% = created, kind:% = self.kind; "element created");
        self.created = Some(created);
        Ok(())
    }

    fn post_invoke(&mut self, ctx: &mut TxContext<'_>) -> Result<(), EngineError> {
        if let Some(created) = self.created {
            ctx.schedule_rule(RuleKind::ResolveSubtree, created);
        }
        Ok(())
    }

    fn output(&self) -> Option<ElementId> {
        self.created
    }
}
