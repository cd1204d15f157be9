//! The document: one element tree plus its symbol table.
//!
//! # Overview
//!
//! Exported types:
//! - [`Document`]: The element tree, rooted at a single model element
//! - [`DocumentError`]: Structural failures reported by document mutations
//!
//! # Architecture
//!
//! All structural mutation goes through the document so three things stay
//! coherent at every step: the parent/child links, each element's name, and
//! the symbol table. Callers hold [`ElementId`] handles; a handle to a
//! removed element goes stale rather than dangling, and every accessor
//! treats stale handles as absent.
//!
//! The document knows nothing about reference resolution or reverse
//! indexing; those live a layer up.

use log::trace;
use thiserror::Error;

use crate::{
    arena::{Arena, ElementId},
    element::{Element, ElementState},
    identifier::{Name, Symbol, is_valid_name},
    schema::ElementKind,
    symbols::SymbolTable,
};

/// Structural failures reported by document mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The handle does not address a live element.
    #[error("element {0} is not in the document")]
    NotFound(ElementId),

    /// The schema does not admit this child kind under this parent kind.
    #[error("cannot create a {child} under a {parent}")]
    ChildNotAllowed {
        /// Kind that was being created.
        child: ElementKind,
        /// Kind of the would-be parent.
        parent: ElementKind,
    },

    /// A nameable kind was created without a name.
    #[error("a {0} requires a name")]
    NameRequired(ElementKind),

    /// An unnamed kind was given a name.
    #[error("a {0} does not carry a name")]
    NameNotAllowed(ElementKind),

    /// The name text is empty or contains separator or whitespace characters.
    #[error("`{0}` is not a legal element name")]
    InvalidName(String),

    /// The document root cannot be removed.
    #[error("the document root cannot be removed")]
    RootRemoval,

    /// Removal requires the element's children to have been removed first.
    #[error("element {0} still has children")]
    ChildrenPresent(ElementId),
}

/// One model document: an element tree and the symbol table over it.
///
/// A document always has a root element of kind [`ElementKind::Model`],
/// created with the document and never removed.
///
/// # Examples
///
/// ```
/// use armillary_core::{
///     document::Document,
///     identifier::{Name, Symbol},
///     schema::ElementKind,
/// };
///
/// let mut document = Document::new("Model");
/// let customer = document
///     .create_element(
///         document.root(),
///         ElementKind::EntityType,
///         Some(Name::new("Customer")),
///     )
///     .unwrap();
///
/// assert_eq!(
///     document.symbol_of(customer),
///     Some(Symbol::new("Model.Customer"))
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    arena: Arena,
    root: ElementId,
    symbols: SymbolTable,
}

impl Document {
    /// Creates a document whose root model element has the given name.
    pub fn new(model_name: &str) -> Self {
        debug_assert!(is_valid_name(model_name));
        let mut arena = Arena::new();
        let name = Name::new(model_name);
        let mut root_element = Element::new(ElementKind::Model, Some(name), None);
        root_element.set_state(ElementState::Normalized);
        let root = arena.insert(root_element);

        let mut symbols = SymbolTable::new();
        symbols.register(root, Symbol::from_name(name));

        Self {
            arena,
            root,
            symbols,
        }
    }

    /// Returns the handle of the root model element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Returns the element addressed by `id`, or `None` for stale handles.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.arena.get(id)
    }

    /// Mutable variant of [`Document::element`].
    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.arena.get_mut(id)
    }

    /// Returns the element addressed by `id`, or
    /// [`DocumentError::NotFound`] for stale handles.
    pub fn try_element(&self, id: ElementId) -> Result<&Element, DocumentError> {
        self.arena.get(id).ok_or(DocumentError::NotFound(id))
    }

    /// Mutable variant of [`Document::try_element`].
    pub fn try_element_mut(&mut self, id: ElementId) -> Result<&mut Element, DocumentError> {
        self.arena.get_mut(id).ok_or(DocumentError::NotFound(id))
    }

    /// Reports whether `id` addresses a live element.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.arena.contains(id)
    }

    /// Returns the number of live elements, root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Reports whether the document holds only unreachable slots. Always
    /// false in practice, since the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Iterates over all live elements with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        self.arena.iter()
    }

    /// Returns the document's symbol table.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Returns the qualified symbol `id` is registered under, if any.
    ///
    /// Unnamed elements have no symbol.
    pub fn symbol_of(&self, id: ElementId) -> Option<Symbol> {
        self.symbols.symbol_of(id)
    }

    /// Creates an element under `parent` and returns its handle.
    ///
    /// Named elements are registered in the symbol table immediately; both
    /// named and unnamed elements start in the
    /// [`ElementState::Normalized`] state, since there is no raw text phase
    /// for programmatic creation.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is stale, the schema does not admit `kind` under
    /// the parent's kind, or the name is missing, forbidden, or malformed
    /// for `kind`.
    pub fn create_element(
        &mut self,
        parent: ElementId,
        kind: ElementKind,
        name: Option<Name>,
    ) -> Result<ElementId, DocumentError> {
        let parent_kind = self.try_element(parent)?.kind();
        if !kind.allowed_under(parent_kind) {
            return Err(DocumentError::ChildNotAllowed {
                child: kind,
                parent: parent_kind,
            });
        }
        match name {
            Some(name) => {
                if !kind.is_nameable() {
                    return Err(DocumentError::NameNotAllowed(kind));
                }
                if !is_valid_name(&name.as_string()) {
                    return Err(DocumentError::InvalidName(name.as_string()));
                }
            }
            None => {
                if kind.is_nameable() {
                    return Err(DocumentError::NameRequired(kind));
                }
            }
        }

        let mut element = Element::new(kind, name, Some(parent));
        element.set_state(ElementState::Normalized);
        let id = self.arena.insert(element);
        if let Some(parent_element) = self.arena.get_mut(parent) {
            parent_element.children_mut().push(id);
        }
        if name.is_some() {
            if let Some(symbol) = self.compute_symbol(id) {
                self.symbols.register(id, symbol);
            }
        }

        trace!(id:% = id, kind:% = kind; "created element");
        Ok(id)
    }

    /// Removes the element addressed by `id` and returns its payload, with
    /// its state set to [`ElementState::Deleted`].
    ///
    /// The element must be a leaf at this point: subtree removal is driven
    /// from above, bottom-up, one element at a time.
    ///
    /// # Errors
    ///
    /// Fails if `id` is stale, addresses the root, or still has children.
    pub fn remove_element(&mut self, id: ElementId) -> Result<Element, DocumentError> {
        if id == self.root {
            return Err(DocumentError::RootRemoval);
        }
        let element = self.try_element(id)?;
        if !element.children().is_empty() {
            return Err(DocumentError::ChildrenPresent(id));
        }
        let parent = element.parent();

        if let Some(parent) = parent {
            if let Some(parent_element) = self.arena.get_mut(parent) {
                parent_element.children_mut().retain(|child| *child != id);
            }
        }
        self.symbols.retire(id);

        // contains() held above, so the arena cannot miss here.
        let mut payload = match self.arena.remove(id) {
            Some(payload) => payload,
            None => return Err(DocumentError::NotFound(id)),
        };
        payload.set_state(ElementState::Deleted);

        trace!(id:% = id, kind:% = payload.kind(); "removed element");
        Ok(payload)
    }

    /// Renames the element addressed by `id` and returns its previous name.
    ///
    /// The element's symbol and the symbols of every named descendant are
    /// recomputed, since a rename of a scope changes their qualified paths.
    ///
    /// # Errors
    ///
    /// Fails if `id` is stale, the kind is unnamed, or the name is
    /// malformed.
    pub fn rename_element(
        &mut self,
        id: ElementId,
        name: Name,
    ) -> Result<Option<Name>, DocumentError> {
        if !is_valid_name(&name.as_string()) {
            return Err(DocumentError::InvalidName(name.as_string()));
        }
        let element = self.try_element(id)?;
        if !element.kind().is_nameable() {
            return Err(DocumentError::NameNotAllowed(element.kind()));
        }
        let previous = element.name();

        if let Some(element) = self.arena.get_mut(id) {
            element.set_name(Some(name));
        }
        self.refresh_symbols_under(id);

        trace!(id:% = id, name:% = name; "renamed element");
        Ok(previous)
    }

    /// Returns the handles of `root`'s subtree in depth-first preorder,
    /// `root` first. Empty if `root` is stale.
    pub fn subtree(&self, root: ElementId) -> Vec<ElementId> {
        let mut ordered = Vec::new();
        if !self.is_alive(root) {
            return ordered;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            ordered.push(id);
            if let Some(element) = self.arena.get(id) {
                // Reverse so the leftmost child is visited first.
                for child in element.children().iter().rev() {
                    stack.push(*child);
                }
            }
        }
        ordered
    }

    /// Searches for `text` from the position of `from`, innermost scope
    /// first, then each enclosing scope, then as an absolute path.
    ///
    /// Only live elements of `expected` kind count; a hit of another kind
    /// is treated as a miss and the search keeps going.
    pub fn lookup_scoped(
        &self,
        from: ElementId,
        text: Symbol,
        expected: ElementKind,
    ) -> Option<ElementId> {
        let mut scope = self.element(from).and_then(Element::parent);
        while let Some(id) = scope {
            let element = self.element(id)?;
            if element.kind().is_scope() {
                if let Some(scope_symbol) = self.symbols.symbol_of(id) {
                    let candidate = scope_symbol.concat(text);
                    if let Some(found) = self.first_of_kind(candidate, expected) {
                        return Some(found);
                    }
                }
            }
            scope = element.parent();
        }
        self.first_of_kind(text, expected)
    }

    /// Returns a name not yet used for a child of `parent`: `stem` itself
    /// when free, otherwise `stem1`, `stem2`, and so on.
    pub fn unique_name(&self, parent: ElementId, stem: &str) -> Name {
        let prefix = self.child_symbol_prefix(parent);
        let free = |candidate: &Name| -> bool {
            let symbol = match prefix {
                Some(prefix) => prefix.join(*candidate),
                None => Symbol::from_name(*candidate),
            };
            self.symbols.lookup(symbol).is_empty()
        };

        let bare = Name::new(stem);
        if free(&bare) {
            return bare;
        }
        let mut counter = 1usize;
        loop {
            let candidate = Name::new(&format!("{stem}{counter}"));
            if free(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Recomputes and re-registers the symbols of `root` and every named
    /// element below it.
    pub(crate) fn refresh_symbols_under(&mut self, root: ElementId) {
        let mut refreshed: Vec<(ElementId, Option<Symbol>)> = Vec::new();
        for id in self.subtree(root) {
            let named = self
                .element(id)
                .map(|element| element.name().is_some())
                .unwrap_or(false);
            if named {
                refreshed.push((id, self.compute_symbol(id)));
            }
        }
        for (id, symbol) in refreshed {
            match symbol {
                Some(symbol) => self.symbols.replace(id, symbol),
                None => {
                    self.symbols.retire(id);
                }
            }
        }
    }

    /// Computes the qualified symbol `id` should be registered under, from
    /// the names of its enclosing scopes. `None` for unnamed elements.
    fn compute_symbol(&self, id: ElementId) -> Option<Symbol> {
        let element = self.element(id)?;
        let name = element.name()?;
        match element.parent() {
            Some(parent) => match self.child_symbol_prefix(parent) {
                Some(prefix) => Some(prefix.join(name)),
                None => Some(Symbol::from_name(name)),
            },
            None => Some(Symbol::from_name(name)),
        }
    }

    /// Builds the path prefix that children of `parent` are qualified
    /// under: the names of the scope elements from the root down to and
    /// including `parent`.
    fn child_symbol_prefix(&self, parent: ElementId) -> Option<Symbol> {
        let mut segments: Vec<Name> = Vec::new();
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            let element = self.element(id)?;
            if element.kind().is_scope() {
                if let Some(name) = element.name() {
                    segments.push(name);
                }
            }
            cursor = element.parent();
        }
        segments.reverse();

        let mut segments = segments.into_iter();
        let first = segments.next()?;
        let mut prefix = Symbol::from_name(first);
        for segment in segments {
            prefix = prefix.join(segment);
        }
        Some(prefix)
    }

    fn first_of_kind(&self, symbol: Symbol, expected: ElementKind) -> Option<ElementId> {
        self.symbols
            .lookup(symbol)
            .iter()
            .copied()
            .find(|candidate| {
                self.element(*candidate)
                    .map(|element| element.kind() == expected)
                    .unwrap_or(false)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, ElementId, ElementId) {
        let mut document = Document::new("Model");
        let customer = document
            .create_element(
                document.root(),
                ElementKind::EntityType,
                Some(Name::new("Customer")),
            )
            .unwrap();
        let id = document
            .create_element(customer, ElementKind::Property, Some(Name::new("Id")))
            .unwrap();
        (document, customer, id)
    }

    #[test]
    fn test_new_document_has_root_model() {
        let document = Document::new("Model");
        let root = document.element(document.root()).unwrap();

        assert_eq!(root.kind(), ElementKind::Model);
        assert_eq!(root.name(), Some(Name::new("Model")));
        assert_eq!(root.state(), ElementState::Normalized);
        assert_eq!(document.symbol_of(document.root()), Some(Symbol::new("Model")));
        assert_eq!(document.len(), 1);
    }

    #[test]
    fn test_create_element_registers_symbol() {
        let (document, customer, id) = sample();

        assert_eq!(
            document.symbol_of(customer),
            Some(Symbol::new("Model.Customer"))
        );
        assert_eq!(document.symbol_of(id), Some(Symbol::new("Model.Customer.Id")));
        assert_eq!(
            document.element(customer).unwrap().children(),
            &[id]
        );
        assert_eq!(document.element(id).unwrap().parent(), Some(customer));
    }

    #[test]
    fn test_create_element_validation() {
        let mut document = Document::new("Model");
        let root = document.root();

        // Kind admission.
        let err = document
            .create_element(root, ElementKind::Property, Some(Name::new("Loose")))
            .unwrap_err();
        assert_eq!(
            err,
            DocumentError::ChildNotAllowed {
                child: ElementKind::Property,
                parent: ElementKind::Model,
            }
        );

        // Name presence.
        let err = document
            .create_element(root, ElementKind::EntityType, None)
            .unwrap_err();
        assert_eq!(err, DocumentError::NameRequired(ElementKind::EntityType));

        let customer = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Customer")))
            .unwrap();
        let err = document
            .create_element(customer, ElementKind::Key, Some(Name::new("PK")))
            .unwrap_err();
        assert_eq!(err, DocumentError::NameNotAllowed(ElementKind::Key));

        // Name legality.
        let err = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Bad.Name")))
            .unwrap_err();
        assert_eq!(err, DocumentError::InvalidName("Bad.Name".to_owned()));

        // Stale parent.
        let order = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Order")))
            .unwrap();
        document.remove_element(order).unwrap();
        let err = document
            .create_element(order, ElementKind::Property, Some(Name::new("Total")))
            .unwrap_err();
        assert_eq!(err, DocumentError::NotFound(order));
    }

    #[test]
    fn test_key_is_unnamed_and_symbol_free() {
        let (mut document, customer, _) = sample();
        let key = document
            .create_element(customer, ElementKind::Key, None)
            .unwrap();

        assert_eq!(document.symbol_of(key), None);
        assert_eq!(document.element(key).unwrap().state(), ElementState::Normalized);
    }

    #[test]
    fn test_remove_element() {
        let (mut document, customer, id) = sample();

        let payload = document.remove_element(id).unwrap();
        assert_eq!(payload.state(), ElementState::Deleted);
        assert_eq!(payload.name(), Some(Name::new("Id")));
        assert!(!document.is_alive(id));
        assert_eq!(document.symbol_of(id), None);
        assert_eq!(document.symbols().lookup(Symbol::new("Model.Customer.Id")), &[]);
        assert!(document.element(customer).unwrap().children().is_empty());
    }

    #[test]
    fn test_remove_element_guards() {
        let (mut document, customer, id) = sample();

        assert_eq!(
            document.remove_element(document.root()),
            Err(DocumentError::RootRemoval)
        );
        assert_eq!(
            document.remove_element(customer),
            Err(DocumentError::ChildrenPresent(customer))
        );

        document.remove_element(id).unwrap();
        assert_eq!(document.remove_element(id), Err(DocumentError::NotFound(id)));
    }

    #[test]
    fn test_rename_rewrites_descendant_symbols() {
        let (mut document, customer, id) = sample();

        let previous = document
            .rename_element(customer, Name::new("Client"))
            .unwrap();
        assert_eq!(previous, Some(Name::new("Customer")));
        assert_eq!(
            document.symbol_of(customer),
            Some(Symbol::new("Model.Client"))
        );
        assert_eq!(document.symbol_of(id), Some(Symbol::new("Model.Client.Id")));
        assert_eq!(document.symbols().lookup(Symbol::new("Model.Customer")), &[]);
        assert_eq!(
            document.symbols().lookup(Symbol::new("Model.Customer.Id")),
            &[]
        );
    }

    #[test]
    fn test_subtree_is_preorder() {
        let (mut document, customer, id) = sample();
        let name = document
            .create_element(customer, ElementKind::Property, Some(Name::new("FullName")))
            .unwrap();

        assert_eq!(document.subtree(customer), vec![customer, id, name]);
        assert_eq!(
            document.subtree(document.root()),
            vec![document.root(), customer, id, name]
        );

        document.remove_element(id).unwrap();
        assert_eq!(document.subtree(id), Vec::<ElementId>::new());
    }

    #[test]
    fn test_lookup_scoped_prefers_inner_scope() {
        let mut document = Document::new("Model");
        let root = document.root();
        let customer = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Customer")))
            .unwrap();
        let shadow_outer = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Shadow")))
            .unwrap();
        let shadow_inner = document
            .create_element(customer, ElementKind::Property, Some(Name::new("Shadow")))
            .unwrap();
        let from = document
            .create_element(customer, ElementKind::Property, Some(Name::new("Origin")))
            .unwrap();

        // Innermost scope wins when kinds match.
        let inner = document.lookup_scoped(from, Symbol::new("Shadow"), ElementKind::Property);
        assert_eq!(inner, Some(shadow_inner));

        // A wrong-kind hit in the inner scope is a miss, not an error: the
        // search keeps going outward.
        let outer = document.lookup_scoped(from, Symbol::new("Shadow"), ElementKind::EntityType);
        assert_eq!(outer, Some(shadow_outer));
    }

    #[test]
    fn test_lookup_scoped_absolute_fallback() {
        let (document, _, id) = sample();

        let hit = document.lookup_scoped(id, Symbol::new("Model.Customer"), ElementKind::EntityType);
        assert!(hit.is_some());

        let miss = document.lookup_scoped(id, Symbol::new("Model.Ghost"), ElementKind::EntityType);
        assert_eq!(miss, None);
    }

    #[test]
    fn test_unique_name() {
        let mut document = Document::new("Model");
        let root = document.root();

        assert_eq!(document.unique_name(root, "Entity"), Name::new("Entity"));
        document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Entity")))
            .unwrap();
        assert_eq!(document.unique_name(root, "Entity"), Name::new("Entity1"));
        document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Entity1")))
            .unwrap();
        assert_eq!(document.unique_name(root, "Entity"), Name::new("Entity2"));
    }

    #[test]
    fn test_unique_name_frees_after_removal() {
        let mut document = Document::new("Model");
        let root = document.root();
        let entity = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("Entity")))
            .unwrap();

        assert_eq!(document.unique_name(root, "Entity"), Name::new("Entity1"));
        document.remove_element(entity).unwrap();
        assert_eq!(document.unique_name(root, "Entity"), Name::new("Entity"));
    }
}
