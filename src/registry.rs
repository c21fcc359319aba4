//! Version registry
//!
//! Folds the structural changes accumulated since the last committed
//! pipeline version into a new versioned snapshot entity. The snapshot is
//! the authoritative descriptor of the live pipeline structure at the
//! moment of the fold:
//!
//! - `hadMember` relations to every operator and connection entity live at
//!   that moment, and nothing else.
//! - `specializationOf` and `wasDerivedFrom` the previous version entity
//!   (the first version has no predecessor).
//! - Version numbers strictly monotonically increase per pipeline and are
//!   never reused.
//!
//! A fold is a synchronization point: the caller holds the pipeline's
//! write handle for its duration, so no structural event can interleave.

use chrono::{DateTime, Utc};

use crate::graph::{
    ActivityPayload, AgentPayload, ElementId, ElementKind, EntityPayload, GraphStore, RelationKind,
};
use crate::index::LiveIndex;

/// Per-pipeline version bookkeeping and snapshot folding.
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    /// Version number the next fold will produce; 1-based
    next_version: u64,
    /// Entity of the most recent pipeline version, if any
    last_version: Option<ElementId>,
    /// Structural events applied since the last fold
    structural_since_fold: u32,
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionRegistry {
    /// Creates a registry with no committed versions.
    pub fn new() -> Self {
        Self {
            next_version: 1,
            last_version: None,
            structural_since_fold: 0,
        }
    }

    /// Notes one structural change since the last fold.
    pub fn note_structural(&mut self) {
        self.structural_since_fold += 1;
    }

    /// Returns the number of structural changes since the last fold.
    pub fn structural_since_fold(&self) -> u32 {
        self.structural_since_fold
    }

    /// Returns the most recent committed version number, if any.
    pub fn current_version(&self) -> Option<u64> {
        self.next_version.checked_sub(1).filter(|v| *v > 0)
    }

    /// Returns the entity of the most recent pipeline version, if any.
    pub fn last_version_element(&self) -> Option<ElementId> {
        self.last_version
    }

    /// Folds the current live structure into a new pipeline version and
    /// returns its number.
    ///
    /// The membership set is read from the live index at this instant;
    /// the writes themselves are infallible, so the fold is atomic.
    pub fn fold(
        &mut self,
        graph: &mut GraphStore,
        index: &LiveIndex,
        pipeline_agent: ElementId,
        at: DateTime<Utc>,
    ) -> u64 {
        let version = self.next_version;

        let activity = graph.push_element(
            at,
            ElementKind::Activity(ActivityPayload::PipelineVersionCreation { version }),
        );
        graph.push_relation(RelationKind::WasAssociatedWith, activity, pipeline_agent);

        let entity = graph.push_element(
            at,
            ElementKind::Entity(EntityPayload::PipelineVersion { version }),
        );
        graph.push_relation(RelationKind::WasGeneratedBy, entity, activity);

        if let Some(previous) = self.last_version {
            graph.push_relation(RelationKind::SpecializationOf, entity, previous);
            graph.push_relation(RelationKind::WasDerivedFrom, entity, previous);
            graph.push_relation(RelationKind::Used, activity, previous);
        }

        for (_, member) in index.live_operators() {
            graph.push_relation(RelationKind::HadMember, entity, member);
        }
        for (_, member) in index.live_connections() {
            graph.push_relation(RelationKind::HadMember, entity, member);
        }

        self.last_version = Some(entity);
        self.next_version += 1;
        self.structural_since_fold = 0;

        version
    }
}
