//! Provenance elements
//!
//! The PROV model distinguishes three element classes:
//! - Entity: an immutable snapshot of something that existed at a point in
//!   time (an operator version, a connection version, a tuple, a pipeline
//!   version).
//! - Activity: an occurrence that generates, uses, or invalidates entities.
//! - Agent: the party responsible for an activity (the pipeline itself, or
//!   an operator instance performing an execution).
//!
//! Every element carries a stable internal id, a UUID, a creation
//! timestamp, and a back-reference to the external identifier it
//! represents. Elements are pure data; all interpretation lives in the
//! builder and export layers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::event::MetricSample;

/// A stable internal element identity: the element's position in the
/// graph arena.
///
/// Ids are assigned densely in insertion order and are never reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ElementId(u32);

impl ElementId {
    /// Creates an ElementId with the given arena position.
    #[inline]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the arena position.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }
}

/// Payload of an entity element.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    /// One immutable version of an operator.
    OperatorVersion {
        op_id: i64,
        name: String,
        /// Opaque configuration; never interpreted by the engine
        config: BTreeMap<String, Value>,
        /// 1-based, strictly increasing per operator id
        version: u32,
    },
    /// One immutable version of a connection.
    ConnectionVersion {
        con_id: i64,
        from_op_id: i64,
        to_op_id: i64,
        from_sock_id: i64,
        to_sock_id: i64,
        /// 1-based, strictly increasing per connection id
        version: u32,
    },
    /// A tuple produced by an operator execution.
    Tuple {
        tuple_id: String,
        /// Opaque tuple payload
        data: Value,
    },
    /// A versioned snapshot of the whole pipeline structure.
    PipelineVersion {
        /// 1-based, strictly increasing per pipeline
        version: u64,
    },
}

impl EntityPayload {
    /// Returns the entity's version number within its derivation chain,
    /// if it has one. Tuples are not versioned.
    pub fn version(&self) -> Option<u64> {
        match self {
            EntityPayload::OperatorVersion { version, .. }
            | EntityPayload::ConnectionVersion { version, .. } => Some(u64::from(*version)),
            EntityPayload::PipelineVersion { version } => Some(*version),
            EntityPayload::Tuple { .. } => None,
        }
    }
}

/// Payload of an activity element.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityPayload {
    OperatorCreation { op_id: i64 },
    OperatorModification { op_id: i64 },
    OperatorDeletion { op_id: i64 },
    ConnectionCreation { con_id: i64 },
    ConnectionDeletion { con_id: i64 },
    OperatorExecution {
        op_id: i64,
        exec_id: String,
        /// Metric samples reported with the execution; opaque metadata
        metrics: Vec<MetricSample>,
    },
    PipelineVersionCreation { version: u64 },
}

/// Payload of an agent element.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentPayload {
    /// The pipeline itself, responsible for structural activities.
    Pipeline { pipeline_id: u64 },
    /// An operator instance, responsible for its executions.
    OperatorInstance { op_id: i64 },
}

/// The three PROV element classes.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Entity(EntityPayload),
    Activity(ActivityPayload),
    Agent(AgentPayload),
}

impl ElementKind {
    /// Returns the PROV class name.
    pub fn class(&self) -> &'static str {
        match self {
            ElementKind::Entity(_) => "entity",
            ElementKind::Activity(_) => "activity",
            ElementKind::Agent(_) => "agent",
        }
    }
}

/// An immutable provenance element.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceElement {
    id: ElementId,
    uuid: Uuid,
    created_at: DateTime<Utc>,
    kind: ElementKind,
}

impl ProvenanceElement {
    /// Creates a new element. Only the graph store constructs elements,
    /// stamping the arena id.
    pub(crate) fn new(id: ElementId, created_at: DateTime<Utc>, kind: ElementKind) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            created_at,
            kind,
        }
    }

    /// Returns the stable internal id.
    #[inline]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Returns the element UUID, used in exports.
    #[inline]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the creation timestamp.
    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the element class and payload.
    #[inline]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Returns the entity payload, if this element is an entity.
    pub fn as_entity(&self) -> Option<&EntityPayload> {
        match &self.kind {
            ElementKind::Entity(payload) => Some(payload),
            _ => None,
        }
    }

    /// Returns the activity payload, if this element is an activity.
    pub fn as_activity(&self) -> Option<&ActivityPayload> {
        match &self.kind {
            ElementKind::Activity(payload) => Some(payload),
            _ => None,
        }
    }

    /// Returns the agent payload, if this element is an agent.
    pub fn as_agent(&self) -> Option<&AgentPayload> {
        match &self.kind {
            ElementKind::Agent(payload) => Some(payload),
            _ => None,
        }
    }
}
