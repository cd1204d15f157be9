//! Document elements: lifecycle state, attributes, and reference slots.
//!
//! # Overview
//!
//! Exported types:
//! - [`ElementState`]: Where an element is in the parse/normalize/resolve
//!   lifecycle
//! - [`Binding`]: The current state of one named cross-reference
//! - [`Reference`]: A reference slot, pairing a [`ReferenceKind`] with its
//!   [`Binding`]
//! - [`Element`]: One node of the document tree
//!
//! Structural fields (name, parent, children) are mutated through
//! [`Document`](crate::document::Document) so the tree, the symbol table, and
//! the element stay coherent; everything else is mutable here.

use indexmap::IndexMap;

use crate::{
    arena::ElementId,
    identifier::{Name, Symbol},
    schema::{ElementKind, ReferenceKind},
    value::Value,
};

/// Lifecycle state of an element.
///
/// States advance as the element's text is parsed, its symbol registered,
/// and its references resolved. A re-resolution pass may move an element
/// between [`ElementState::Normalized`] and [`ElementState::Resolved`] in
/// either direction as targets appear and disappear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// Raw text exists but has not been interpreted yet.
    Unparsed,
    /// Structure is known; the element is not yet in the symbol table.
    Parsed,
    /// Registered in the symbol table (or has nothing to register).
    Normalized,
    /// Every reference slot is settled: bound to a live element or
    /// explicitly undefined.
    Resolved,
    /// Removed from the document. Only seen on detached payloads.
    Deleted,
}

impl ElementState {
    /// Returns the canonical lowercase spelling of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unparsed => "unparsed",
            Self::Parsed => "parsed",
            Self::Normalized => "normalized",
            Self::Resolved => "resolved",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of one named cross-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// A symbolic name (possibly not yet set) with no matched target.
    Unresolved(Option<Symbol>),
    /// The name matched a live element of the expected kind.
    Resolved { text: Symbol, target: ElementId },
    /// Explicitly cleared: the owner declares it references nothing, and
    /// resolution passes leave it alone.
    Undefined,
}

impl Binding {
    /// Returns the symbolic name, if one is set.
    pub fn text(&self) -> Option<Symbol> {
        match self {
            Self::Unresolved(text) => *text,
            Self::Resolved { text, .. } => Some(*text),
            Self::Undefined => None,
        }
    }

    /// Returns the resolved target, if any.
    pub fn target(&self) -> Option<ElementId> {
        match self {
            Self::Resolved { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Reports whether the binding has a resolved target.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Reports whether the binding is settled: resolved or explicitly
    /// undefined. Settled bindings do not hold their element back from the
    /// resolved lifecycle state.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Resolved { .. } | Self::Undefined)
    }
}

/// A reference slot on an element.
///
/// The slot's kind never changes; its binding moves between states as names
/// are set and resolution runs. Binding mutations here touch only the slot:
/// keeping the reverse index in step is the caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    kind: ReferenceKind,
    binding: Binding,
}

impl Reference {
    /// Creates a slot holding an unresolved binding with the given name.
    pub fn new(kind: ReferenceKind, text: Option<Symbol>) -> Self {
        Self {
            kind,
            binding: Binding::Unresolved(text),
        }
    }

    /// Returns the slot's reference kind.
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Returns the current binding.
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// Returns the symbolic name, if one is set.
    pub fn text(&self) -> Option<Symbol> {
        self.binding.text()
    }

    /// Returns the resolved target, if any.
    pub fn target(&self) -> Option<ElementId> {
        self.binding.target()
    }

    /// Reports whether the binding has a resolved target.
    pub fn is_resolved(&self) -> bool {
        self.binding.is_resolved()
    }

    /// Replaces the symbolic name, dropping any resolved target.
    pub fn set_text(&mut self, text: Option<Symbol>) {
        self.binding = Binding::Unresolved(text);
    }

    /// Binds the slot to a target under the given name.
    pub fn bind(&mut self, text: Symbol, target: ElementId) {
        self.binding = Binding::Resolved { text, target };
    }

    /// Drops the resolved target but keeps the name, so a later resolution
    /// pass can try again.
    pub fn unbind(&mut self) {
        self.binding = Binding::Unresolved(self.binding.text());
    }

    /// Marks the slot explicitly undefined, dropping name and target.
    pub fn clear(&mut self) {
        self.binding = Binding::Undefined;
    }
}

/// One node of the document tree.
///
/// An element has a fixed kind, an optional local name, tree links, a state,
/// an attribute map, and an ordered list of reference slots. Attribute order
/// and slot order are insertion order and survive round trips through
/// rollback snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    kind: ElementKind,
    name: Option<Name>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    state: ElementState,
    attributes: IndexMap<Name, Value>,
    references: Vec<Reference>,
}

impl Element {
    pub(crate) fn new(kind: ElementKind, name: Option<Name>, parent: Option<ElementId>) -> Self {
        Self {
            kind,
            name,
            parent,
            children: Vec::new(),
            state: ElementState::Parsed,
            attributes: IndexMap::new(),
            references: Vec::new(),
        }
    }

    /// Returns the element's kind.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Returns the element's local name, if its kind carries one.
    pub fn name(&self) -> Option<Name> {
        self.name
    }

    /// Returns the parent handle. `None` only for the document root.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Returns the child handles in document order.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ElementState {
        self.state
    }

    /// Sets the lifecycle state.
    pub fn set_state(&mut self, state: ElementState) {
        self.state = state;
    }

    /// Returns the attribute map in insertion order.
    pub fn attributes(&self) -> &IndexMap<Name, Value> {
        &self.attributes
    }

    /// Returns the value of one attribute.
    pub fn attribute(&self, name: Name) -> Option<&Value> {
        self.attributes.get(&name)
    }

    /// Sets an attribute, returning the previous value if there was one.
    pub fn set_attribute(&mut self, name: Name, value: Value) -> Option<Value> {
        self.attributes.insert(name, value)
    }

    /// Removes an attribute, returning its value if it was present.
    pub fn remove_attribute(&mut self, name: Name) -> Option<Value> {
        self.attributes.shift_remove(&name)
    }

    /// Returns the reference slots in declaration order.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Returns one reference slot by index.
    pub fn reference(&self, slot: usize) -> Option<&Reference> {
        self.references.get(slot)
    }

    /// Mutable variant of [`Element::reference`].
    pub fn reference_mut(&mut self, slot: usize) -> Option<&mut Reference> {
        self.references.get_mut(slot)
    }

    /// Iterates over the slots of one reference kind with their indices.
    pub fn references_of(
        &self,
        kind: ReferenceKind,
    ) -> impl Iterator<Item = (usize, &Reference)> + '_ {
        self.references
            .iter()
            .enumerate()
            .filter(move |(_, reference)| reference.kind() == kind)
    }

    /// Returns the index of the first slot of the given kind, if any.
    pub fn first_reference_of(&self, kind: ReferenceKind) -> Option<usize> {
        self.references_of(kind).next().map(|(slot, _)| slot)
    }

    /// Appends a reference slot and returns its index.
    pub fn push_reference(&mut self, reference: Reference) -> usize {
        self.references.push(reference);
        self.references.len() - 1
    }

    /// Removes a reference slot, shifting later slots down.
    pub fn remove_reference(&mut self, slot: usize) -> Option<Reference> {
        if slot < self.references.len() {
            Some(self.references.remove(slot))
        } else {
            None
        }
    }

    /// Reports whether every reference slot is settled.
    pub fn references_settled(&self) -> bool {
        self.references
            .iter()
            .all(|reference| reference.binding().is_settled())
    }

    pub(crate) fn set_name(&mut self, name: Option<Name>) {
        self.name = name;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ElementId> {
        &mut self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_transitions() {
        let mut reference = Reference::new(ReferenceKind::SetType, None);
        assert_eq!(reference.binding(), Binding::Unresolved(None));
        assert!(!reference.is_resolved());
        assert!(!reference.binding().is_settled());

        let text = Symbol::new("Model.Customer");
        reference.set_text(Some(text));
        assert_eq!(reference.text(), Some(text));
        assert!(!reference.is_resolved());

        let mut arena = crate::arena::Arena::new();
        let target = arena.insert(Element::new(
            ElementKind::EntityType,
            Some(Name::new("Customer")),
            None,
        ));
        reference.bind(text, target);
        assert!(reference.is_resolved());
        assert_eq!(reference.target(), Some(target));
        assert!(reference.binding().is_settled());

        reference.unbind();
        assert!(!reference.is_resolved());
        assert_eq!(reference.text(), Some(text));

        reference.clear();
        assert_eq!(reference.binding(), Binding::Undefined);
        assert_eq!(reference.text(), None);
        assert!(reference.binding().is_settled());
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut element = Element::new(ElementKind::Property, Some(Name::new("Id")), None);
        element.set_attribute(Name::new("Type"), "Int32".into());
        element.set_attribute(Name::new("Nullable"), false.into());
        element.set_attribute(Name::new("StoreGeneratedPattern"), "Identity".into());

        let names: Vec<String> = element
            .attributes()
            .keys()
            .map(|name| name.as_string())
            .collect();
        assert_eq!(names, vec!["Type", "Nullable", "StoreGeneratedPattern"]);

        let previous = element.set_attribute(Name::new("Nullable"), true.into());
        assert_eq!(previous, Some(Value::Bool(false)));
        assert_eq!(
            element
                .attribute(Name::new("Nullable"))
                .and_then(Value::as_bool),
            Some(true)
        );
    }

    #[test]
    fn test_reference_slots_by_kind() {
        let mut key = Element::new(ElementKind::Key, None, None);
        let first = key.push_reference(Reference::new(
            ReferenceKind::KeyMember,
            Some(Symbol::new("Model.Customer.Id")),
        ));
        let second = key.push_reference(Reference::new(
            ReferenceKind::KeyMember,
            Some(Symbol::new("Model.Customer.Region")),
        ));

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(key.references_of(ReferenceKind::KeyMember).count(), 2);
        assert_eq!(key.first_reference_of(ReferenceKind::KeyMember), Some(0));
        assert_eq!(key.first_reference_of(ReferenceKind::BaseType), None);

        let removed = key.remove_reference(0);
        assert!(removed.is_some());
        assert_eq!(key.references().len(), 1);
        assert_eq!(
            key.reference(0).and_then(Reference::text),
            Some(Symbol::new("Model.Customer.Region"))
        );
        assert!(key.remove_reference(5).is_none());
    }

    #[test]
    fn test_references_settled() {
        let mut shape = Element::new(ElementKind::Shape, Some(Name::new("CustomerShape")), None);
        assert!(shape.references_settled());

        let slot = shape.push_reference(Reference::new(
            ReferenceKind::Depicts,
            Some(Symbol::new("Model.Customer")),
        ));
        assert!(!shape.references_settled());

        if let Some(reference) = shape.reference_mut(slot) {
            reference.clear();
        }
        assert!(shape.references_settled());
    }
}
