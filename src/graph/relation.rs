//! Typed PROV relations
//!
//! A relation is a directed, typed edge between two elements, restricted
//! to the standard PROV kinds the engine actually emits. Direction follows
//! the PROV vocabulary:
//!
//! - `wasGeneratedBy`: entity -> generating activity
//! - `used`: activity -> consumed entity
//! - `wasDerivedFrom`: entity -> prior entity
//! - `wasInvalidatedBy`: entity -> invalidating activity
//! - `wasAssociatedWith`: activity -> responsible agent
//! - `specializationOf`: entity -> more general entity
//! - `hadMember`: collection entity -> member entity

use super::ElementId;

/// The closed set of PROV relation kinds used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    WasGeneratedBy,
    Used,
    WasDerivedFrom,
    WasInvalidatedBy,
    WasAssociatedWith,
    SpecializationOf,
    HadMember,
}

impl RelationKind {
    /// Returns the PROV vocabulary name.
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::WasGeneratedBy => "wasGeneratedBy",
            RelationKind::Used => "used",
            RelationKind::WasDerivedFrom => "wasDerivedFrom",
            RelationKind::WasInvalidatedBy => "wasInvalidatedBy",
            RelationKind::WasAssociatedWith => "wasAssociatedWith",
            RelationKind::SpecializationOf => "specializationOf",
            RelationKind::HadMember => "hadMember",
        }
    }
}

/// A directed, typed edge between two provenance elements.
///
/// Pure data: no traversal or enforcement logic lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Relation kind
    pub kind: RelationKind,
    /// Source element (subject of the relation)
    pub source: ElementId,
    /// Target element (object of the relation)
    pub target: ElementId,
}

impl Relation {
    /// Creates a relation of the given kind.
    pub fn new(kind: RelationKind, source: ElementId, target: ElementId) -> Self {
        Self {
            kind,
            source,
            target,
        }
    }
}
