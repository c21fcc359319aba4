//! GraphStore - The append-only element arena
//!
//! Elements and relations only ever grow; there is no removal, no update,
//! and no reordering. The arena position of an element is its identity.
//!
//! The store performs no validation of its own. Every consistency rule
//! (liveness, tombstones, version monotonicity) is enforced by the builder
//! before anything is pushed here; by the time a write reaches the store
//! it is infallible.

use chrono::{DateTime, Utc};

use super::{ElementId, ElementKind, ProvenanceElement, Relation, RelationKind};

/// The append-only provenance graph arena.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    elements: Vec<ProvenanceElement>,
    relations: Vec<Relation>,
}

impl GraphStore {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element and returns its id.
    pub fn push_element(&mut self, created_at: DateTime<Utc>, kind: ElementKind) -> ElementId {
        let id = ElementId::new(self.elements.len() as u32);
        self.elements.push(ProvenanceElement::new(id, created_at, kind));
        id
    }

    /// Appends a relation.
    pub fn push_relation(&mut self, kind: RelationKind, source: ElementId, target: ElementId) {
        self.relations.push(Relation::new(kind, source, target));
    }

    /// Returns the element with the given id.
    ///
    /// Ids are only handed out by `push_element`, so a lookup through a
    /// retained id always succeeds.
    pub fn element(&self, id: ElementId) -> &ProvenanceElement {
        &self.elements[id.index()]
    }

    /// Returns all elements in insertion order.
    #[inline]
    pub fn elements(&self) -> &[ProvenanceElement] {
        &self.elements
    }

    /// Returns all relations in insertion order.
    #[inline]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Returns the number of elements.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Returns the number of relations.
    #[inline]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Returns the targets of all relations of `kind` whose source is
    /// `source`, in insertion order.
    pub fn targets(&self, source: ElementId, kind: RelationKind) -> Vec<ElementId> {
        self.relations
            .iter()
            .filter(|r| r.kind == kind && r.source == source)
            .map(|r| r.target)
            .collect()
    }

    /// Returns the first target of a relation of `kind` from `source`,
    /// if any. Used for functional relations such as `wasDerivedFrom`
    /// within one derivation chain.
    pub fn target(&self, source: ElementId, kind: RelationKind) -> Option<ElementId> {
        self.relations
            .iter()
            .find(|r| r.kind == kind && r.source == source)
            .map(|r| r.target)
    }
}
