//! Generational storage for document elements.
//!
//! # Overview
//!
//! Exported types:
//! - [`ElementId`]: Stable, copyable handle to an element
//! - [`Arena`]: Slot-based element store with generation checking
//!
//! # Design
//!
//! Elements are stored in slots addressed by index. Each slot carries a
//! generation counter that is bumped when its element is removed, so a handle
//! held across a removal stops matching instead of silently addressing
//! whatever element reuses the slot. Lookups with a stale handle return
//! `None`; they never panic.

use std::fmt;

use crate::element::Element;

/// Stable handle to an element stored in an [`Arena`].
///
/// Handles stay valid until their element is removed. After removal the
/// handle is stale: every arena accessor treats it as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    index: usize,
    generation: u32,
}

impl ElementId {
    fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index, for diagnostics only.
    ///
    /// Two handles may share an index across generations; use the whole
    /// handle for identity.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    generation: u32,
    payload: Option<Element>,
}

/// Slot-based element store with generation-checked handles.
///
/// Removal bumps the slot's generation and recycles the slot for later
/// insertions, so the arena does not grow with element churn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an element and returns its handle.
    pub fn insert(&mut self, element: Element) -> ElementId {
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                debug_assert!(slot.payload.is_none());
                slot.payload = Some(element);
                ElementId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len();
                self.slots.push(Slot {
                    generation: 0,
                    payload: Some(element),
                });
                ElementId::new(index, 0)
            }
        }
    }

    /// Reports whether `id` addresses a live element.
    pub fn contains(&self, id: ElementId) -> bool {
        self.slot(id).is_some()
    }

    /// Returns the element addressed by `id`, or `None` if the handle is
    /// stale or out of range.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.slot(id)
    }

    /// Mutable variant of [`Arena::get`].
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.payload.as_mut()
    }

    /// Removes and returns the element addressed by `id`.
    ///
    /// The handle (and every copy of it) is stale afterwards. Returns `None`
    /// if it already was.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let payload = slot.payload.take()?;
        slot.generation += 1;
        self.free.push(id.index);
        self.live -= 1;
        Some(payload)
    }

    /// Returns the number of live elements.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Reports whether the arena holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterates over all live elements with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.payload
                .as_ref()
                .map(|element| (ElementId::new(index, slot.generation), element))
        })
    }

    fn slot(&self, id: ElementId) -> Option<&Element> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.payload.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{element::Element, identifier::Name, schema::ElementKind};

    fn entity(name: &str) -> Element {
        Element::new(ElementKind::EntityType, Some(Name::new(name)), None)
    }

    #[test]
    fn test_insert_and_get() {
        let mut arena = Arena::new();
        let a = arena.insert(entity("A"));
        let b = arena.insert(entity("B"));

        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a).and_then(|e| e.name()), Some(Name::new("A")));
        assert_eq!(arena.get(b).and_then(|e| e.name()), Some(Name::new("B")));
    }

    #[test]
    fn test_remove_makes_handle_stale() {
        let mut arena = Arena::new();
        let a = arena.insert(entity("A"));

        let removed = arena.remove(a);
        assert!(removed.is_some());
        assert!(!arena.contains(a));
        assert!(arena.get(a).is_none());
        assert!(arena.get_mut(a).is_none());
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut arena = Arena::new();
        let a = arena.insert(entity("A"));
        arena.remove(a);

        let b = arena.insert(entity("B"));
        // Same slot, different generation: the old handle must not see B.
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).and_then(|e| e.name()), Some(Name::new("B")));
    }

    #[test]
    fn test_iter_skips_removed() {
        let mut arena = Arena::new();
        let a = arena.insert(entity("A"));
        let b = arena.insert(entity("B"));
        let c = arena.insert(entity("C"));
        arena.remove(b);

        let ids: Vec<ElementId> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_get_mut() {
        let mut arena = Arena::new();
        let a = arena.insert(entity("A"));

        arena
            .get_mut(a)
            .and_then(|element| element.set_attribute(Name::new("Nullable"), false.into()));
        assert_eq!(
            arena
                .get(a)
                .and_then(|element| element.attribute(Name::new("Nullable")))
                .and_then(|value| value.as_bool()),
            Some(false)
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let mut arena = Arena::new();
        let a = arena.insert(entity("A"));

        let snapshot = arena.clone();
        arena.remove(a);

        assert!(!arena.contains(a));
        assert!(snapshot.contains(a));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_out_of_range_handle() {
        let mut donor = Arena::new();
        donor.insert(entity("A"));
        let far = donor.insert(entity("B"));

        let empty = Arena::new();
        assert!(!empty.contains(far));
        assert!(empty.get(far).is_none());
    }
}
