//! Binding resolution: turning symbolic reference names into element
//! handles, and back.
//!
//! # Overview
//!
//! Every binding transition in the engine goes through this module, because
//! each one has a twin: the reverse-reference index must gain or lose an
//! edge in the same step. Going around the resolver is how the index and
//! the document drift apart.
//!
//! Resolution itself is name lookup with scoping: the owner's enclosing
//! scopes innermost first, then the name taken as an absolute path. A hit
//! of the wrong element kind is a miss.
//!
//! Failure to resolve is not an error. A name that matches nothing leaves
//! the binding unresolved for a later pass; errors here mean stale handles
//! or index corruption.

use log::trace;

use armillary_core::{
    arena::ElementId,
    document::Document,
    element::{Binding, ElementState, Reference},
    identifier::Symbol,
};

use crate::{
    error::{EngineError, ValidationError},
    report::UnresolvedReference,
    session::Session,
};

/// What one [`resolve_subtree`] pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOutcome {
    attempts: usize,
    resolved: usize,
    outstanding: usize,
}

impl ResolveOutcome {
    /// Returns how many unresolved bindings the pass tried to resolve.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Returns how many bindings the pass newly resolved.
    pub fn resolved(&self) -> usize {
        self.resolved
    }

    /// Returns how many bindings remain unresolved in the subtree.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

/// Replaces the symbolic name of one reference slot.
///
/// If the slot was resolved, its reverse edge is erased first; the slot
/// ends up unresolved under the new name, ready for the next resolution
/// pass.
///
/// # Errors
///
/// Fails if `owner` is stale, the slot does not exist, or the index
/// disagrees about the old edge.
pub fn set_reference_text(
    session: &mut Session,
    owner: ElementId,
    slot: usize,
    text: Option<Symbol>,
) -> Result<(), EngineError> {
    let old_target = detach_slot(session, owner, slot)?;
    let reference = slot_mut(session.document_mut(), owner, slot)?;
    reference.set_text(text);
    trace!(owner:% = owner, slot = slot, text:? = text.map(|t| t.as_string()), old_target:? = old_target; "reference text set");
    Ok(())
}

/// Points one reference slot at a known element, deriving the canonical
/// name from the target's symbol, and records the reverse edge.
///
/// # Errors
///
/// Fails if `owner` is stale, the slot does not exist, the target is stale
/// or has no symbol, or the index disagrees about the old edge.
pub fn set_reference_target(
    session: &mut Session,
    owner: ElementId,
    slot: usize,
    target: ElementId,
) -> Result<(), EngineError> {
    session.document().try_element(target)?;
    let text = session.document().symbol_of(target).ok_or_else(|| {
        ValidationError::for_element(target, format!("element {target} has no symbol to reference"))
    })?;

    detach_slot(session, owner, slot)?;
    let reference = slot_mut(session.document_mut(), owner, slot)?;
    reference.bind(text, target);
    session.index_mut().record(owner, target);
    trace!(owner:% = owner, slot = slot, target:% = target, text:% = text; "reference bound to target");
    Ok(())
}

/// Attempts to resolve one reference slot from its symbolic name.
///
/// Returns whether the binding is settled afterwards: already resolved and
/// explicitly undefined bindings report `true` untouched, a nameless
/// unresolved binding reports `false`, and a named one reports whether the
/// lookup hit.
///
/// # Errors
///
/// Fails if `owner` is stale or the slot does not exist.
pub fn resolve_slot(
    session: &mut Session,
    owner: ElementId,
    slot: usize,
) -> Result<bool, EngineError> {
    let (kind, text) = {
        let element = session.document().try_element(owner)?;
        let reference = element
            .reference(slot)
            .ok_or(EngineError::SlotNotFound { owner, slot })?;
        match reference.binding() {
            Binding::Resolved { .. } | Binding::Undefined => return Ok(true),
            Binding::Unresolved(None) => return Ok(false),
            Binding::Unresolved(Some(text)) => (reference.kind(), text),
        }
    };

    match session
        .document()
        .lookup_scoped(owner, text, kind.target_kind())
    {
        Some(target) => {
            let reference = slot_mut(session.document_mut(), owner, slot)?;
            reference.bind(text, target);
            session.index_mut().record(owner, target);
            trace!(owner:% = owner, slot = slot, target:% = target, text:% = text; "reference resolved");
            Ok(true)
        }
        None => {
            trace!(owner:% = owner, slot = slot, text:% = text; "reference did not resolve");
            Ok(false)
        }
    }
}

/// Drops the resolved target of one slot but keeps its name, erasing the
/// reverse edge. A later pass may resolve it again.
///
/// # Errors
///
/// Fails if `owner` is stale, the slot does not exist, or the index
/// disagrees about the edge.
pub fn unbind_slot(session: &mut Session, owner: ElementId, slot: usize) -> Result<(), EngineError> {
    detach_slot(session, owner, slot)?;
    let reference = slot_mut(session.document_mut(), owner, slot)?;
    reference.unbind();
    Ok(())
}

/// Marks one slot explicitly undefined, erasing the reverse edge if it was
/// resolved. Resolution passes will leave the slot alone afterwards.
///
/// # Errors
///
/// Fails if `owner` is stale, the slot does not exist, or the index
/// disagrees about the edge.
pub fn clear_slot(session: &mut Session, owner: ElementId, slot: usize) -> Result<(), EngineError> {
    detach_slot(session, owner, slot)?;
    let reference = slot_mut(session.document_mut(), owner, slot)?;
    reference.clear();
    trace!(owner:% = owner, slot = slot; "reference cleared");
    Ok(())
}

/// Removes one slot from its owner entirely, erasing the reverse edge if
/// it was resolved. Later slots shift down.
///
/// # Errors
///
/// Fails if `owner` is stale, the slot does not exist, or the index
/// disagrees about the edge.
pub fn remove_slot(
    session: &mut Session,
    owner: ElementId,
    slot: usize,
) -> Result<Reference, EngineError> {
    detach_slot(session, owner, slot)?;
    let element = session.document_mut().try_element_mut(owner)?;
    let removed = element
        .remove_reference(slot)
        .ok_or(EngineError::SlotNotFound { owner, slot })?;
    trace!(owner:% = owner, slot = slot, kind:% = removed.kind(); "reference slot removed");
    Ok(removed)
}

/// Unbinds every resolved slot on `owner`, erasing its outgoing reverse
/// edges. Used to detach an element from the index before removing it.
///
/// # Errors
///
/// Fails if `owner` is stale or the index disagrees about an edge.
pub fn unbind_outgoing(session: &mut Session, owner: ElementId) -> Result<(), EngineError> {
    let slots = session.document().try_element(owner)?.references().len();
    for slot in 0..slots {
        let resolved = session
            .document()
            .element(owner)
            .and_then(|element| element.reference(slot))
            .map(Reference::is_resolved)
            .unwrap_or(false);
        if resolved {
            unbind_slot(session, owner, slot)?;
        }
    }
    Ok(())
}

/// Resolves every unresolved named binding under `root` and advances
/// element states: an element whose slots are all settled becomes
/// [`ElementState::Resolved`], any other live element drops back to
/// [`ElementState::Normalized`].
///
/// One pass is enough for any fixed document: resolution of one slot never
/// invalidates another.
///
/// # Errors
///
/// Fails only on stale-handle or index bookkeeping problems; names that
/// match nothing simply stay unresolved.
pub fn resolve_subtree(
    session: &mut Session,
    root: ElementId,
) -> Result<ResolveOutcome, EngineError> {
    let mut outcome = ResolveOutcome::default();
    for id in session.document().subtree(root) {
        let slots = match session.document().element(id) {
            Some(element) => element.references().len(),
            None => continue,
        };
        for slot in 0..slots {
            let unresolved_named = session
                .document()
                .element(id)
                .and_then(|element| element.reference(slot))
                .map(|reference| {
                    matches!(reference.binding(), Binding::Unresolved(Some(_)))
                })
                .unwrap_or(false);
            if unresolved_named {
                outcome.attempts += 1;
                if resolve_slot(session, id, slot)? {
                    outcome.resolved += 1;
                } else {
                    outcome.outstanding += 1;
                }
            } else {
                let settled = session
                    .document()
                    .element(id)
                    .and_then(|element| element.reference(slot))
                    .map(|reference| reference.binding().is_settled())
                    .unwrap_or(true);
                if !settled {
                    outcome.outstanding += 1;
                }
            }
        }

        let settled = session
            .document()
            .element(id)
            .map(|element| element.references_settled())
            .unwrap_or(true);
        if let Some(element) = session.document_mut().element_mut(id) {
            if element.state() != ElementState::Unparsed && element.state() != ElementState::Parsed
            {
                element.set_state(if settled {
                    ElementState::Resolved
                } else {
                    ElementState::Normalized
                });
            }
        }
    }
    Ok(outcome)
}

/// Collects every binding under `root` that is still unresolved, in
/// document order.
pub fn unresolved_under(document: &Document, root: ElementId) -> Vec<UnresolvedReference> {
    let mut collected = Vec::new();
    for id in document.subtree(root) {
        if let Some(element) = document.element(id) {
            for reference in element.references() {
                if let Binding::Unresolved(text) = reference.binding() {
                    collected.push(UnresolvedReference::new(id, reference.kind(), text));
                }
            }
        }
    }
    collected
}

/// Erases the reverse edge of `slot` if it is currently resolved, leaving
/// the binding itself untouched. Returns the old target.
fn detach_slot(
    session: &mut Session,
    owner: ElementId,
    slot: usize,
) -> Result<Option<ElementId>, EngineError> {
    let old_target = {
        let element = session.document().try_element(owner)?;
        let reference = element
            .reference(slot)
            .ok_or(EngineError::SlotNotFound { owner, slot })?;
        reference.target()
    };
    if let Some(target) = old_target {
        session.index_mut().erase(owner, target)?;
    }
    Ok(old_target)
}

fn slot_mut<'a>(
    document: &'a mut Document,
    owner: ElementId,
    slot: usize,
) -> Result<&'a mut Reference, EngineError> {
    document
        .try_element_mut(owner)?
        .reference_mut(slot)
        .ok_or(EngineError::SlotNotFound { owner, slot })
}
