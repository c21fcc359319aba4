//! Live reference index
//!
//! The authoritative mapping from an external identifier (operator id,
//! connection id, tuple id) to the currently-live entity version in the
//! graph arena. Every submodel handler consults and maintains this index.
//!
//! Invariants:
//! - At most one live entity per external id at any time.
//! - A tombstone is terminal: a tombstoned id can never regain a live
//!   entry. The tombstone retains the final entity version so that history
//!   queries keep working after deletion.
//!
//! Entries are non-owning back-references into the graph; the graph arena
//! owns all elements.

use std::collections::HashMap;

use crate::graph::ElementId;

/// An external identifier as used by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExternalId {
    Operator(i64),
    Connection(i64),
    Tuple(String),
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalId::Operator(id) => write!(f, "operator {}", id),
            ExternalId::Connection(id) => write!(f, "connection {}", id),
            ExternalId::Tuple(id) => write!(f, "tuple {}", id),
        }
    }
}

/// The state of an external id in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    /// The id resolves to this currently-live entity version.
    Live(ElementId),
    /// The id was deleted; the final entity version is retained for
    /// history queries. Terminal.
    Tombstone(ElementId),
}

/// External id to live entity version mapping.
#[derive(Debug, Clone, Default)]
pub struct LiveIndex {
    entries: HashMap<ExternalId, LiveState>,
}

impl LiveIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of an external id, if it was ever registered.
    pub fn state(&self, id: &ExternalId) -> Option<LiveState> {
        self.entries.get(id).copied()
    }

    /// Returns the live entity version for an id, or `None` if the id was
    /// never created or has been tombstoned.
    pub fn live(&self, id: &ExternalId) -> Option<ElementId> {
        match self.entries.get(id) {
            Some(LiveState::Live(element)) => Some(*element),
            _ => None,
        }
    }

    /// Returns true if the id has been tombstoned.
    pub fn is_tombstoned(&self, id: &ExternalId) -> bool {
        matches!(self.entries.get(id), Some(LiveState::Tombstone(_)))
    }

    /// Registers `element` as the live version for `id`, replacing any
    /// previous live version.
    ///
    /// The builder validates liveness before calling; registering over a
    /// tombstone would violate tombstone terminality and must never
    /// happen, so it is checked structurally here.
    pub fn set_live(&mut self, id: ExternalId, element: ElementId) {
        debug_assert!(
            !self.is_tombstoned(&id),
            "live entry registered over tombstone for {}",
            id
        );
        self.entries.insert(id, LiveState::Live(element));
    }

    /// Tombstones `id`, retaining its final entity version. Terminal.
    pub fn tombstone(&mut self, id: ExternalId, last_element: ElementId) {
        self.entries.insert(id, LiveState::Tombstone(last_element));
    }

    /// Returns all live operators as `(op_id, element)` pairs, sorted by
    /// operator id for deterministic iteration.
    pub fn live_operators(&self) -> Vec<(i64, ElementId)> {
        let mut operators: Vec<(i64, ElementId)> = self
            .entries
            .iter()
            .filter_map(|(id, state)| match (id, state) {
                (ExternalId::Operator(op_id), LiveState::Live(element)) => {
                    Some((*op_id, *element))
                }
                _ => None,
            })
            .collect();
        operators.sort_by_key(|(op_id, _)| *op_id);
        operators
    }

    /// Returns all live connections as `(con_id, element)` pairs, sorted
    /// by connection id for deterministic iteration.
    pub fn live_connections(&self) -> Vec<(i64, ElementId)> {
        let mut connections: Vec<(i64, ElementId)> = self
            .entries
            .iter()
            .filter_map(|(id, state)| match (id, state) {
                (ExternalId::Connection(con_id), LiveState::Live(element)) => {
                    Some((*con_id, *element))
                }
                _ => None,
            })
            .collect();
        connections.sort_by_key(|(con_id, _)| *con_id);
        connections
    }
}
