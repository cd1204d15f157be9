//! The document's symbol table: qualified name to element handles.
//!
//! The table is a multi-map. Duplicate registrations are legal and kept in
//! registration order; name-uniqueness enforcement is a validation concern,
//! not a table concern. Lookups never allocate.

use indexmap::IndexMap;

use crate::{arena::ElementId, identifier::Symbol};

/// Bidirectional registry between qualified symbols and live elements.
///
/// One element has at most one symbol; one symbol may have several elements
/// (a duplicate-name document is still a document).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    by_symbol: IndexMap<Symbol, Vec<ElementId>>,
    by_element: IndexMap<ElementId, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` under `symbol`.
    ///
    /// The element must not already be registered; use
    /// [`SymbolTable::replace`] to move an element to a new symbol.
    pub fn register(&mut self, id: ElementId, symbol: Symbol) {
        debug_assert!(!self.by_element.contains_key(&id));
        self.by_element.insert(id, symbol);
        self.by_symbol.entry(symbol).or_default().push(id);
    }

    /// Removes `id` from the table, returning the symbol it was registered
    /// under, or `None` if it was not registered.
    pub fn retire(&mut self, id: ElementId) -> Option<Symbol> {
        let symbol = self.by_element.shift_remove(&id)?;
        if let Some(entries) = self.by_symbol.get_mut(&symbol) {
            entries.retain(|entry| *entry != id);
            if entries.is_empty() {
                self.by_symbol.shift_remove(&symbol);
            }
        }
        Some(symbol)
    }

    /// Moves `id` to a new symbol, registering it fresh if it was absent.
    pub fn replace(&mut self, id: ElementId, symbol: Symbol) {
        self.retire(id);
        self.register(id, symbol);
    }

    /// Returns every element registered under `symbol`, in registration
    /// order. Empty when the symbol is unknown.
    pub fn lookup(&self, symbol: Symbol) -> &[ElementId] {
        self.by_symbol
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the symbol `id` is registered under, if any.
    pub fn symbol_of(&self, id: ElementId) -> Option<Symbol> {
        self.by_element.get(&id).copied()
    }

    /// Returns the number of registered elements.
    pub fn len(&self) -> usize {
        self.by_element.len()
    }

    /// Reports whether no element is registered.
    pub fn is_empty(&self) -> bool {
        self.by_element.is_empty()
    }

    /// Iterates over symbols registered by more than one element.
    pub fn duplicates(&self) -> impl Iterator<Item = (Symbol, &[ElementId])> + '_ {
        self.by_symbol
            .iter()
            .filter(|(_, entries)| entries.len() > 1)
            .map(|(symbol, entries)| (*symbol, entries.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arena::Arena, element::Element, identifier::Name, schema::ElementKind};

    fn ids(count: usize) -> Vec<ElementId> {
        let mut arena = Arena::new();
        (0..count)
            .map(|i| {
                arena.insert(Element::new(
                    ElementKind::EntityType,
                    Some(Name::new(&format!("E{i}"))),
                    None,
                ))
            })
            .collect()
    }

    #[test]
    fn test_register_and_lookup() {
        let handles = ids(2);
        let mut table = SymbolTable::new();
        let customer = Symbol::new("Model.Customer");
        let order = Symbol::new("Model.Order");

        table.register(handles[0], customer);
        table.register(handles[1], order);

        assert_eq!(table.lookup(customer), &[handles[0]]);
        assert_eq!(table.lookup(order), &[handles[1]]);
        assert_eq!(table.lookup(Symbol::new("Model.Missing")), &[]);
        assert_eq!(table.symbol_of(handles[0]), Some(customer));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_symbols_kept_in_order() {
        let handles = ids(3);
        let mut table = SymbolTable::new();
        let shared = Symbol::new("Model.Dup");

        table.register(handles[0], shared);
        table.register(handles[1], shared);
        table.register(handles[2], Symbol::new("Model.Unique"));

        assert_eq!(table.lookup(shared), &[handles[0], handles[1]]);
        let duplicated: Vec<Symbol> = table.duplicates().map(|(symbol, _)| symbol).collect();
        assert_eq!(duplicated, vec![shared]);
    }

    #[test]
    fn test_retire_removes_only_that_element() {
        let handles = ids(2);
        let mut table = SymbolTable::new();
        let shared = Symbol::new("Model.Dup");

        table.register(handles[0], shared);
        table.register(handles[1], shared);

        assert_eq!(table.retire(handles[0]), Some(shared));
        assert_eq!(table.lookup(shared), &[handles[1]]);
        assert_eq!(table.retire(handles[0]), None);

        assert_eq!(table.retire(handles[1]), Some(shared));
        assert_eq!(table.lookup(shared), &[]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_replace_moves_element() {
        let handles = ids(1);
        let mut table = SymbolTable::new();
        let before = Symbol::new("Model.Before");
        let after = Symbol::new("Model.After");

        table.register(handles[0], before);
        table.replace(handles[0], after);

        assert_eq!(table.lookup(before), &[]);
        assert_eq!(table.lookup(after), &[handles[0]]);
        assert_eq!(table.symbol_of(handles[0]), Some(after));
        assert_eq!(table.len(), 1);
    }
}
