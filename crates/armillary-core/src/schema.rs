//! Static schema for the document model: element kinds, reference kinds, and
//! cascade policies.
//!
//! # Overview
//!
//! Exported types:
//! - [`ElementKind`]: Enum of every element kind the document can hold, with
//!   structural rules (which parents admit it, whether it carries a name,
//!   whether it opens a naming scope)
//! - [`ReferenceKind`]: Enum of every named cross-reference an element can
//!   declare, with its owner kind, target kind, and cascade policy
//! - [`CascadePolicy`]: What happens to a reference owner when the referenced
//!   element is deleted
//!
//! # Design Philosophy
//!
//! All structural and cascade rules live here in one table rather than being
//! scattered across element behaviors. Callers ask the kind, never hard-code
//! the relationship.

use std::{fmt, str::FromStr};

// =============================================================================
// Element kinds
// =============================================================================

/// The kind of a document element.
///
/// Kinds are closed: the engine never stores an element whose structural
/// rules it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Document root. Exactly one per document, created with the document.
    Model,
    /// A named type with properties, keys, and navigation properties.
    EntityType,
    /// A scalar member of an entity type.
    Property,
    /// The key of an entity type; holds references to the key properties.
    /// Unnamed: at most one per entity type.
    Key,
    /// A traversal member of an entity type, routed through an association.
    NavigationProperty,
    /// A named relationship between entity types.
    Association,
    /// One side of an association; its name is the role.
    AssociationEnd,
    /// A named set of instances of one entity type.
    EntitySet,
    /// A named set of instances of one association.
    AssociationSet,
    /// A named drawing surface.
    Diagram,
    /// The depiction of an entity type on a diagram.
    Shape,
}

impl ElementKind {
    /// Reports whether elements of this kind carry a local name.
    ///
    /// Unnamed kinds never appear in the symbol table.
    pub fn is_nameable(&self) -> bool {
        !matches!(self, Self::Key)
    }

    /// Reports whether elements of this kind open a naming scope: named
    /// descendants get this element's name as a path segment.
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            Self::Model | Self::EntityType | Self::Association | Self::Diagram
        )
    }

    /// Reports whether an element of this kind may be created under a parent
    /// of kind `parent`.
    ///
    /// [`ElementKind::Model`] is admitted nowhere: the root exists from
    /// document creation and is never re-parented.
    pub fn allowed_under(&self, parent: ElementKind) -> bool {
        match self {
            Self::Model => false,
            Self::EntityType
            | Self::Association
            | Self::EntitySet
            | Self::AssociationSet
            | Self::Diagram => parent == Self::Model,
            Self::Property | Self::Key | Self::NavigationProperty => parent == Self::EntityType,
            Self::AssociationEnd => parent == Self::Association,
            Self::Shape => parent == Self::Diagram,
        }
    }

    /// Reports whether deleting an element of this kind must instead delete
    /// its parent.
    ///
    /// An association is meaningless with a missing side, so a delete aimed
    /// at one of its ends widens to the whole association.
    pub fn delete_escalates_to_parent(&self) -> bool {
        matches!(self, Self::AssociationEnd)
    }

    /// Returns the canonical lowercase spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::EntityType => "entity-type",
            Self::Property => "property",
            Self::Key => "key",
            Self::NavigationProperty => "navigation-property",
            Self::Association => "association",
            Self::AssociationEnd => "association-end",
            Self::EntitySet => "entity-set",
            Self::AssociationSet => "association-set",
            Self::Diagram => "diagram",
            Self::Shape => "shape",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(Self::Model),
            "entity-type" => Ok(Self::EntityType),
            "property" => Ok(Self::Property),
            "key" => Ok(Self::Key),
            "navigation-property" => Ok(Self::NavigationProperty),
            "association" => Ok(Self::Association),
            "association-end" => Ok(Self::AssociationEnd),
            "entity-set" => Ok(Self::EntitySet),
            "association-set" => Ok(Self::AssociationSet),
            "diagram" => Ok(Self::Diagram),
            "shape" => Ok(Self::Shape),
            _ => Err(format!("unknown element kind `{s}`")),
        }
    }
}

// =============================================================================
// Cascade policies
// =============================================================================

/// What happens to the owner of a resolved reference when the referenced
/// element is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadePolicy {
    /// The owner cannot outlive the target: delete the owner too (widened to
    /// its delete root if the owner's kind escalates).
    DeleteOwner,
    /// The owner survives; the reference slot stays but loses both its
    /// target and its text.
    ClearReference,
    /// The owner survives; the reference slot itself is removed. Used for
    /// member lists where the remaining entries are still meaningful.
    RemoveReference,
}

impl CascadePolicy {
    /// Returns the canonical lowercase spelling of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeleteOwner => "delete-owner",
            Self::ClearReference => "clear-reference",
            Self::RemoveReference => "remove-reference",
        }
    }
}

impl fmt::Display for CascadePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Reference kinds
// =============================================================================

/// The kind of a named cross-reference declared by an element.
///
/// Each kind fixes three things: which element kind may own it, which
/// element kind it must resolve to, and the [`CascadePolicy`] applied to the
/// owner when the target is deleted.
///
/// # Examples
///
/// ```
/// use armillary_core::schema::{CascadePolicy, ElementKind, ReferenceKind};
///
/// let kind = ReferenceKind::SetType;
/// assert_eq!(kind.owner_kind(), ElementKind::EntitySet);
/// assert_eq!(kind.target_kind(), ElementKind::EntityType);
/// assert_eq!(kind.cascade_policy(), CascadePolicy::DeleteOwner);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Key membership: a [`ElementKind::Key`] naming one of its entity's
    /// properties. A key may own several of these.
    KeyMember,
    /// Inheritance: an entity type naming its base entity type.
    BaseType,
    /// An association end naming the entity type on its side.
    EndType,
    /// An entity set naming the entity type it contains.
    SetType,
    /// An association set naming the association it contains.
    SetAssociation,
    /// A navigation property naming the association it traverses.
    ViaAssociation,
    /// A shape naming the entity type it depicts.
    Depicts,
}

impl ReferenceKind {
    /// Returns the element kind that may own references of this kind.
    pub fn owner_kind(&self) -> ElementKind {
        match self {
            Self::KeyMember => ElementKind::Key,
            Self::BaseType => ElementKind::EntityType,
            Self::EndType => ElementKind::AssociationEnd,
            Self::SetType => ElementKind::EntitySet,
            Self::SetAssociation => ElementKind::AssociationSet,
            Self::ViaAssociation => ElementKind::NavigationProperty,
            Self::Depicts => ElementKind::Shape,
        }
    }

    /// Returns the element kind a reference of this kind must resolve to.
    ///
    /// Symbol lookups ignore elements of any other kind, so a name collision
    /// with the wrong kind behaves like a miss.
    pub fn target_kind(&self) -> ElementKind {
        match self {
            Self::KeyMember => ElementKind::Property,
            Self::BaseType | Self::EndType | Self::SetType | Self::Depicts => {
                ElementKind::EntityType
            }
            Self::SetAssociation | Self::ViaAssociation => ElementKind::Association,
        }
    }

    /// Returns the cascade policy applied to the owner when the target of a
    /// resolved reference of this kind is deleted.
    pub fn cascade_policy(&self) -> CascadePolicy {
        match self {
            Self::KeyMember => CascadePolicy::RemoveReference,
            Self::BaseType => CascadePolicy::ClearReference,
            Self::EndType
            | Self::SetType
            | Self::SetAssociation
            | Self::ViaAssociation
            | Self::Depicts => CascadePolicy::DeleteOwner,
        }
    }

    /// Returns the canonical lowercase spelling of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyMember => "key-member",
            Self::BaseType => "base-type",
            Self::EndType => "end-type",
            Self::SetType => "set-type",
            Self::SetAssociation => "set-association",
            Self::ViaAssociation => "via-association",
            Self::Depicts => "depicts",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key-member" => Ok(Self::KeyMember),
            "base-type" => Ok(Self::BaseType),
            "end-type" => Ok(Self::EndType),
            "set-type" => Ok(Self::SetType),
            "set-association" => Ok(Self::SetAssociation),
            "via-association" => Ok(Self::ViaAssociation),
            "depicts" => Ok(Self::Depicts),
            _ => Err(format!("unknown reference kind `{s}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ELEMENT_KINDS: [ElementKind; 11] = [
        ElementKind::Model,
        ElementKind::EntityType,
        ElementKind::Property,
        ElementKind::Key,
        ElementKind::NavigationProperty,
        ElementKind::Association,
        ElementKind::AssociationEnd,
        ElementKind::EntitySet,
        ElementKind::AssociationSet,
        ElementKind::Diagram,
        ElementKind::Shape,
    ];

    const ALL_REFERENCE_KINDS: [ReferenceKind; 7] = [
        ReferenceKind::KeyMember,
        ReferenceKind::BaseType,
        ReferenceKind::EndType,
        ReferenceKind::SetType,
        ReferenceKind::SetAssociation,
        ReferenceKind::ViaAssociation,
        ReferenceKind::Depicts,
    ];

    #[test]
    fn test_model_admitted_nowhere() {
        for parent in ALL_ELEMENT_KINDS {
            assert!(!ElementKind::Model.allowed_under(parent));
        }
    }

    #[test]
    fn test_structural_admission() {
        assert!(ElementKind::EntityType.allowed_under(ElementKind::Model));
        assert!(ElementKind::Property.allowed_under(ElementKind::EntityType));
        assert!(ElementKind::Key.allowed_under(ElementKind::EntityType));
        assert!(ElementKind::NavigationProperty.allowed_under(ElementKind::EntityType));
        assert!(ElementKind::AssociationEnd.allowed_under(ElementKind::Association));
        assert!(ElementKind::Shape.allowed_under(ElementKind::Diagram));

        assert!(!ElementKind::Property.allowed_under(ElementKind::Model));
        assert!(!ElementKind::EntityType.allowed_under(ElementKind::EntityType));
        assert!(!ElementKind::Shape.allowed_under(ElementKind::Model));
        assert!(!ElementKind::AssociationEnd.allowed_under(ElementKind::Model));
    }

    #[test]
    fn test_only_key_is_unnamed() {
        for kind in ALL_ELEMENT_KINDS {
            assert_eq!(kind.is_nameable(), kind != ElementKind::Key);
        }
    }

    #[test]
    fn test_scopes() {
        assert!(ElementKind::Model.is_scope());
        assert!(ElementKind::EntityType.is_scope());
        assert!(ElementKind::Association.is_scope());
        assert!(ElementKind::Diagram.is_scope());
        assert!(!ElementKind::Property.is_scope());
        assert!(!ElementKind::EntitySet.is_scope());
        assert!(!ElementKind::Shape.is_scope());
    }

    #[test]
    fn test_delete_escalation() {
        for kind in ALL_ELEMENT_KINDS {
            assert_eq!(
                kind.delete_escalates_to_parent(),
                kind == ElementKind::AssociationEnd
            );
        }
    }

    #[test]
    fn test_reference_owner_admission_is_structural() {
        // Every reference kind's owner kind is a real kind that can exist
        // somewhere in a document.
        for kind in ALL_REFERENCE_KINDS {
            let owner = kind.owner_kind();
            assert!(
                ALL_ELEMENT_KINDS
                    .iter()
                    .any(|parent| owner.allowed_under(*parent)),
                "owner kind {owner} of {kind} is unconstructible"
            );
        }
    }

    #[test]
    fn test_cascade_policy_table() {
        assert_eq!(
            ReferenceKind::KeyMember.cascade_policy(),
            CascadePolicy::RemoveReference
        );
        assert_eq!(
            ReferenceKind::BaseType.cascade_policy(),
            CascadePolicy::ClearReference
        );
        for kind in [
            ReferenceKind::EndType,
            ReferenceKind::SetType,
            ReferenceKind::SetAssociation,
            ReferenceKind::ViaAssociation,
            ReferenceKind::Depicts,
        ] {
            assert_eq!(kind.cascade_policy(), CascadePolicy::DeleteOwner);
        }
    }

    #[test]
    fn test_round_trip_spellings() {
        for kind in ALL_ELEMENT_KINDS {
            assert_eq!(kind.as_str().parse::<ElementKind>(), Ok(kind));
        }
        for kind in ALL_REFERENCE_KINDS {
            assert_eq!(kind.as_str().parse::<ReferenceKind>(), Ok(kind));
        }
        assert!("nonsense".parse::<ElementKind>().is_err());
        assert!("nonsense".parse::<ReferenceKind>().is_err());
    }
}
