//! The provenance graph
//!
//! An append-only arena of immutable PROV elements plus typed relations
//! stored as index pairs. The graph encodes its invariants structurally:
//!
//! - Elements are never mutated after creation; "modification" of an
//!   operator or connection always appends a new entity version.
//! - Relations reference elements by stable internal id, never by direct
//!   mutable back-reference, so derivation chains stay acyclic by
//!   construction.
//! - Nothing is ever removed; deletions are recorded as invalidation
//!   relations, preserving the full auditable history.
//!
//! This module provides:
//! - `ElementId` - Stable internal element identity
//! - `ProvenanceElement` - Immutable entity / activity / agent record
//! - `Relation` / `RelationKind` - Typed PROV edges
//! - `GraphStore` - The append-only arena

mod element;
mod relation;
mod store;

pub use element::{
    ActivityPayload, AgentPayload, ElementId, ElementKind, EntityPayload, ProvenanceElement,
};
pub use relation::{Relation, RelationKind};
pub use store::GraphStore;
