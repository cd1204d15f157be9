//! The anti-dependency index: who points at me.
//!
//! # Overview
//!
//! The document stores references forward, owner to target. Cascading
//! deletes and rename propagation need the reverse direction, so the engine
//! maintains [`AntiDependencyIndex`], a map from each target element to the
//! owners holding a resolved reference to it.
//!
//! # Design
//!
//! Edges are counted, not just flagged: one owner may hold several resolved
//! slots to the same target (a key naming the same property twice is bad
//! modeling but must not corrupt the index). Recording increments the
//! count, erasing decrements it, and the owner disappears from the target's
//! entry when its count reaches zero.
//!
//! Only the binding resolver mutates the index, in the same step as the
//! binding transition it mirrors. Everyone else reads.

use indexmap::IndexMap;
use log::trace;

use armillary_core::{arena::ElementId, document::Document, schema::ElementKind};

use crate::error::EngineError;

/// Reverse-reference index over one document.
///
/// For a target element, lists the owners whose resolved bindings point at
/// it, in first-recorded order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AntiDependencyIndex {
    inbound: IndexMap<ElementId, IndexMap<ElementId, u32>>,
}

impl AntiDependencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the owners holding at least one resolved reference to
    /// `target`, in first-recorded order.
    pub fn dependents_of(&self, target: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.inbound
            .get(&target)
            .into_iter()
            .flat_map(|owners| owners.keys().copied())
    }

    /// Like [`AntiDependencyIndex::dependents_of`], keeping only owners of
    /// the given element kind.
    pub fn dependents_of_kind<'a>(
        &'a self,
        target: ElementId,
        kind: ElementKind,
        document: &'a Document,
    ) -> impl Iterator<Item = ElementId> + 'a {
        self.dependents_of(target).filter(move |owner| {
            document.element(*owner).map(|element| element.kind()) == Some(kind)
        })
    }

    /// Reports whether anything points at `target`.
    pub fn has_dependents(&self, target: ElementId) -> bool {
        self.inbound
            .get(&target)
            .map(|owners| !owners.is_empty())
            .unwrap_or(false)
    }

    /// Returns how many resolved slots on `owner` point at `target`.
    pub fn edge_count(&self, owner: ElementId, target: ElementId) -> u32 {
        self.inbound
            .get(&target)
            .and_then(|owners| owners.get(&owner))
            .copied()
            .unwrap_or(0)
    }

    /// Reports whether the index holds no edges at all.
    pub fn is_empty(&self) -> bool {
        self.inbound.values().all(IndexMap::is_empty)
    }

    /// Records one resolved edge from `owner` to `target`.
    pub(crate) fn record(&mut self, owner: ElementId, target: ElementId) {
        let count = self
            .inbound
            .entry(target)
            .or_default()
            .entry(owner)
            .or_insert(0);
        *count += 1;
        trace!(owner:% = owner, target:% = target, count = *count; "recorded reverse edge");
    }

    /// Erases one resolved edge from `owner` to `target`.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::IndexOutOfStep`] if no such edge is
    /// recorded, which means a binding transition bypassed the resolver.
    pub(crate) fn erase(&mut self, owner: ElementId, target: ElementId) -> Result<(), EngineError> {
        let owners = self
            .inbound
            .get_mut(&target)
            .ok_or(EngineError::IndexOutOfStep { owner, target })?;
        let count = owners
            .get_mut(&owner)
            .ok_or(EngineError::IndexOutOfStep { owner, target })?;
        *count -= 1;
        if *count == 0 {
            owners.shift_remove(&owner);
            if owners.is_empty() {
                self.inbound.shift_remove(&target);
            }
        }
        trace!(owner:% = owner, target:% = target; "erased reverse edge");
        Ok(())
    }

    /// Drops the (empty) entry for a deleted element.
    ///
    /// # Errors
    ///
    /// Fails with [`EngineError::IndexOutOfStep`] if edges into `target`
    /// remain, which means a cascade finished without detaching a
    /// dependent.
    pub(crate) fn retire(&mut self, target: ElementId) -> Result<(), EngineError> {
        if let Some(owners) = self.inbound.get(&target) {
            if let Some(owner) = owners.keys().next() {
                return Err(EngineError::IndexOutOfStep {
                    owner: *owner,
                    target,
                });
            }
            self.inbound.shift_remove(&target);
        }
        Ok(())
    }

    /// Recomputes the index from `document` and compares, reporting the
    /// first discrepancy.
    ///
    /// This is the index's ground truth check: every resolved slot in the
    /// document is one edge here, and nothing else is.
    pub fn verify_against(&self, document: &Document) -> Result<(), String> {
        let mut expected: IndexMap<ElementId, IndexMap<ElementId, u32>> = IndexMap::new();
        for (owner, element) in document.iter() {
            for reference in element.references() {
                if let Some(target) = reference.target() {
                    *expected
                        .entry(target)
                        .or_default()
                        .entry(owner)
                        .or_insert(0) += 1;
                }
            }
        }

        for (target, owners) in &expected {
            for (owner, count) in owners {
                let recorded = self.edge_count(*owner, *target);
                if recorded != *count {
                    return Err(format!(
                        "edge {owner} -> {target}: document has {count}, index has {recorded}"
                    ));
                }
            }
        }
        for (target, owners) in &self.inbound {
            for (owner, count) in owners {
                let actual = expected
                    .get(target)
                    .and_then(|owners| owners.get(owner))
                    .copied()
                    .unwrap_or(0);
                if actual != *count {
                    return Err(format!(
                        "edge {owner} -> {target}: index has {count}, document has {actual}"
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armillary_core::{identifier::Name, schema::ElementKind};

    fn three_elements() -> (Document, ElementId, ElementId, ElementId) {
        let mut document = Document::new("Model");
        let root = document.root();
        let a = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("A")))
            .unwrap();
        let b = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("B")))
            .unwrap();
        let c = document
            .create_element(root, ElementKind::EntityType, Some(Name::new("C")))
            .unwrap();
        (document, a, b, c)
    }

    #[test]
    fn test_record_and_iterate_in_first_recorded_order() {
        let (_, a, b, c) = three_elements();
        let mut index = AntiDependencyIndex::new();

        index.record(b, a);
        index.record(c, a);

        let dependents: Vec<ElementId> = index.dependents_of(a).collect();
        assert_eq!(dependents, vec![b, c]);
        assert!(index.has_dependents(a));
        assert!(!index.has_dependents(b));
    }

    #[test]
    fn test_dependents_filtered_by_kind() {
        let (mut document, a, b, _) = three_elements();
        let property = document
            .create_element(b, ElementKind::Property, Some(Name::new("P")))
            .unwrap();
        let mut index = AntiDependencyIndex::new();

        index.record(b, a);
        index.record(property, a);

        let entities: Vec<ElementId> = index
            .dependents_of_kind(a, ElementKind::EntityType, &document)
            .collect();
        assert_eq!(entities, vec![b]);
        let properties: Vec<ElementId> = index
            .dependents_of_kind(a, ElementKind::Property, &document)
            .collect();
        assert_eq!(properties, vec![property]);
    }

    #[test]
    fn test_counted_edges() {
        let (_, a, b, _) = three_elements();
        let mut index = AntiDependencyIndex::new();

        index.record(b, a);
        index.record(b, a);
        assert_eq!(index.edge_count(b, a), 2);

        index.erase(b, a).unwrap();
        // One edge down, the owner is still a dependent.
        assert_eq!(index.edge_count(b, a), 1);
        assert!(index.has_dependents(a));

        index.erase(b, a).unwrap();
        assert_eq!(index.edge_count(b, a), 0);
        assert!(!index.has_dependents(a));
        assert!(index.is_empty());
    }

    #[test]
    fn test_erase_unknown_edge_is_an_error() {
        let (_, a, b, _) = three_elements();
        let mut index = AntiDependencyIndex::new();

        let err = index.erase(b, a).unwrap_err();
        assert_eq!(err, EngineError::IndexOutOfStep { owner: b, target: a });
    }

    #[test]
    fn test_retire_refuses_remaining_dependents() {
        let (_, a, b, _) = three_elements();
        let mut index = AntiDependencyIndex::new();

        index.record(b, a);
        let err = index.retire(a).unwrap_err();
        assert_eq!(err, EngineError::IndexOutOfStep { owner: b, target: a });

        index.erase(b, a).unwrap();
        assert!(index.retire(a).is_ok());
    }

    #[test]
    fn test_verify_against_empty_document() {
        let (document, a, b, _) = three_elements();
        let mut index = AntiDependencyIndex::new();
        assert!(index.verify_against(&document).is_ok());

        // A phantom edge is a discrepancy.
        index.record(b, a);
        assert!(index.verify_against(&document).is_err());
    }
}
