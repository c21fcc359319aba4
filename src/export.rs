//! Export & query interface
//!
//! Read-only projections of the accumulated graph for external consumers:
//! the current live snapshot, committed pipeline versions and their
//! members, per-id derivation chains, and a serializable PROV-compatible
//! element/relation set for visualization or storage backends.
//!
//! Nothing here mutates state; history is append-only and every
//! projection can be recomputed at any time.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::builder::PipelineProvenance;
use crate::graph::{
    ActivityPayload, AgentPayload, ElementId, ElementKind, EntityPayload, ProvenanceElement,
    RelationKind,
};
use crate::index::{ExternalId, LiveState};

/// A live operator as seen in the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorView {
    pub op_id: i64,
    pub name: String,
    pub version: u32,
    pub config: BTreeMap<String, Value>,
}

/// A live connection as seen in the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionView {
    pub con_id: i64,
    pub from_op_id: i64,
    pub to_op_id: i64,
    pub from_sock_id: i64,
    pub to_sock_id: i64,
    pub version: u32,
}

/// The current live structure of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSnapshot {
    pub pipeline_id: u64,
    /// Most recent committed version number, if any has been folded
    pub committed_version: Option<u64>,
    /// Live operators, sorted by operator id
    pub operators: Vec<OperatorView>,
    /// Live connections, sorted by connection id
    pub connections: Vec<ConnectionView>,
}

/// A committed pipeline version and its membership set.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionView {
    pub version: u64,
    /// The version entity
    pub element: ElementId,
    /// Entities that were live at the moment of the fold
    pub members: Vec<ElementId>,
}

/// A serializable PROV-compatible projection of the whole graph.
#[derive(Debug, Clone, Serialize)]
pub struct ProvDocument {
    pub pipeline_id: u64,
    /// RFC3339 export time
    pub generated_at: String,
    pub elements: Vec<ElementRecord>,
    pub relations: Vec<RelationRecord>,
}

/// One element in the exported document. Cross-references use the
/// element UUID.
#[derive(Debug, Clone, Serialize)]
pub struct ElementRecord {
    pub id: String,
    /// PROV class: entity / activity / agent
    pub class: String,
    /// Domain type within the class
    pub prov_type: String,
    /// RFC3339 creation time
    pub created_at: String,
    /// Type-specific attributes
    pub attributes: Value,
}

/// One relation in the exported document.
#[derive(Debug, Clone, Serialize)]
pub struct RelationRecord {
    /// PROV vocabulary name, e.g. `wasGeneratedBy`
    pub relation: String,
    pub source: String,
    pub target: String,
}

impl ProvDocument {
    /// Serializes the document to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl PipelineProvenance {
    /// Returns the current live snapshot of the pipeline.
    pub fn snapshot(&self) -> PipelineSnapshot {
        let graph = self.graph();

        let operators = self
            .index()
            .live_operators()
            .into_iter()
            .filter_map(|(_, element)| match graph.element(element).as_entity() {
                Some(EntityPayload::OperatorVersion {
                    op_id,
                    name,
                    config,
                    version,
                }) => Some(OperatorView {
                    op_id: *op_id,
                    name: name.clone(),
                    version: *version,
                    config: config.clone(),
                }),
                _ => None,
            })
            .collect();

        let connections = self
            .index()
            .live_connections()
            .into_iter()
            .filter_map(|(_, element)| match graph.element(element).as_entity() {
                Some(EntityPayload::ConnectionVersion {
                    con_id,
                    from_op_id,
                    to_op_id,
                    from_sock_id,
                    to_sock_id,
                    version,
                }) => Some(ConnectionView {
                    con_id: *con_id,
                    from_op_id: *from_op_id,
                    to_op_id: *to_op_id,
                    from_sock_id: *from_sock_id,
                    to_sock_id: *to_sock_id,
                    version: *version,
                }),
                _ => None,
            })
            .collect();

        PipelineSnapshot {
            pipeline_id: self.pipeline_id(),
            committed_version: self.registry().current_version(),
            operators,
            connections,
        }
    }

    /// Returns a committed pipeline version and its members, or `None`
    /// if no such version was folded.
    pub fn pipeline_version(&self, version: u64) -> Option<VersionView> {
        let graph = self.graph();
        let element = graph.elements().iter().find_map(|e| match e.as_entity() {
            Some(EntityPayload::PipelineVersion { version: v }) if *v == version => Some(e.id()),
            _ => None,
        })?;

        Some(VersionView {
            version,
            element,
            members: graph.targets(element, RelationKind::HadMember),
        })
    }

    /// Returns the full derivation chain for an external id, newest
    /// version first, ending at version 1. Works for deleted ids too:
    /// history survives the tombstone. Empty if the id was never created.
    pub fn derivation_chain(&self, id: &ExternalId) -> Vec<ElementId> {
        let head = match self.index().state(id) {
            Some(LiveState::Live(element)) | Some(LiveState::Tombstone(element)) => element,
            None => return Vec::new(),
        };

        let mut chain = vec![head];
        let mut current = head;
        while let Some(previous) = self.graph().target(current, RelationKind::WasDerivedFrom) {
            chain.push(previous);
            current = previous;
        }
        chain
    }

    /// Exports the accumulated graph as a PROV-compatible document.
    pub fn export_document(&self) -> ProvDocument {
        let graph = self.graph();

        let elements = graph
            .elements()
            .iter()
            .map(|element| ElementRecord {
                id: element.uuid().to_string(),
                class: element.kind().class().to_string(),
                prov_type: prov_type(element).to_string(),
                created_at: element.created_at().to_rfc3339(),
                attributes: attributes(element),
            })
            .collect();

        let relations = graph
            .relations()
            .iter()
            .map(|relation| RelationRecord {
                relation: relation.kind.as_str().to_string(),
                source: graph.element(relation.source).uuid().to_string(),
                target: graph.element(relation.target).uuid().to_string(),
            })
            .collect();

        ProvDocument {
            pipeline_id: self.pipeline_id(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            elements,
            relations,
        }
    }
}

fn prov_type(element: &ProvenanceElement) -> &'static str {
    match element.kind() {
        ElementKind::Entity(payload) => match payload {
            EntityPayload::OperatorVersion { .. } => "OperatorVersion",
            EntityPayload::ConnectionVersion { .. } => "ConnectionVersion",
            EntityPayload::Tuple { .. } => "Tuple",
            EntityPayload::PipelineVersion { .. } => "PipelineVersion",
        },
        ElementKind::Activity(payload) => match payload {
            ActivityPayload::OperatorCreation { .. } => "OperatorCreation",
            ActivityPayload::OperatorModification { .. } => "OperatorModification",
            ActivityPayload::OperatorDeletion { .. } => "OperatorDeletion",
            ActivityPayload::ConnectionCreation { .. } => "ConnectionCreation",
            ActivityPayload::ConnectionDeletion { .. } => "ConnectionDeletion",
            ActivityPayload::OperatorExecution { .. } => "OperatorExecution",
            ActivityPayload::PipelineVersionCreation { .. } => "PipelineVersionCreation",
        },
        ElementKind::Agent(payload) => match payload {
            AgentPayload::Pipeline { .. } => "Pipeline",
            AgentPayload::OperatorInstance { .. } => "OperatorInstance",
        },
    }
}

fn attributes(element: &ProvenanceElement) -> Value {
    match element.kind() {
        ElementKind::Entity(payload) => match payload {
            EntityPayload::OperatorVersion {
                op_id,
                name,
                config,
                version,
            } => serde_json::json!({
                "opID": op_id,
                "name": name,
                "config": config,
                "version": version,
            }),
            EntityPayload::ConnectionVersion {
                con_id,
                from_op_id,
                to_op_id,
                from_sock_id,
                to_sock_id,
                version,
            } => serde_json::json!({
                "conID": con_id,
                "fromOpID": from_op_id,
                "toOpID": to_op_id,
                "fromSockID": from_sock_id,
                "toSockID": to_sock_id,
                "version": version,
            }),
            EntityPayload::Tuple { tuple_id, data } => serde_json::json!({
                "tupleID": tuple_id,
                "data": data,
            }),
            EntityPayload::PipelineVersion { version } => serde_json::json!({
                "version": version,
            }),
        },
        ElementKind::Activity(payload) => match payload {
            ActivityPayload::OperatorCreation { op_id }
            | ActivityPayload::OperatorModification { op_id }
            | ActivityPayload::OperatorDeletion { op_id } => serde_json::json!({
                "opID": op_id,
            }),
            ActivityPayload::ConnectionCreation { con_id }
            | ActivityPayload::ConnectionDeletion { con_id } => serde_json::json!({
                "conID": con_id,
            }),
            ActivityPayload::OperatorExecution {
                op_id,
                exec_id,
                metrics,
            } => serde_json::json!({
                "opID": op_id,
                "execID": exec_id,
                "metrics": metrics,
            }),
            ActivityPayload::PipelineVersionCreation { version } => serde_json::json!({
                "version": version,
            }),
        },
        ElementKind::Agent(payload) => match payload {
            AgentPayload::Pipeline { pipeline_id } => serde_json::json!({
                "pipelineID": pipeline_id,
            }),
            AgentPayload::OperatorInstance { op_id } => serde_json::json!({
                "opID": op_id,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MetricSample, TupleOutput, UpdateEvent, UpdatePayload};

    fn pipeline_with_structure() -> PipelineProvenance {
        let mut state = PipelineProvenance::new(7);
        state
            .apply(&UpdateEvent::new(
                "ev-1",
                UpdatePayload::OperatorCreation {
                    op_id: 1,
                    op_name: "source".to_string(),
                    op_data: BTreeMap::new(),
                },
            ))
            .unwrap();
        state
            .apply(&UpdateEvent::new(
                "ev-2",
                UpdatePayload::OperatorCreation {
                    op_id: 2,
                    op_name: "sink".to_string(),
                    op_data: BTreeMap::new(),
                },
            ))
            .unwrap();
        state
            .apply(&UpdateEvent::new(
                "ev-3",
                UpdatePayload::ConnectionCreation {
                    con_id: 0,
                    from_op_id: 1,
                    to_op_id: 2,
                    from_sock_id: 0,
                    to_sock_id: 0,
                },
            ))
            .unwrap();
        state
    }

    #[test]
    fn test_snapshot_lists_live_structure() {
        let state = pipeline_with_structure();
        let snapshot = state.snapshot();

        assert_eq!(snapshot.pipeline_id, 7);
        assert_eq!(snapshot.committed_version, None);
        assert_eq!(snapshot.operators.len(), 2);
        assert_eq!(snapshot.operators[0].op_id, 1);
        assert_eq!(snapshot.operators[1].name, "sink");
        assert_eq!(snapshot.connections.len(), 1);
        assert_eq!(snapshot.connections[0].from_op_id, 1);
    }

    #[test]
    fn test_snapshot_excludes_deleted() {
        let mut state = pipeline_with_structure();
        state
            .apply(&UpdateEvent::new(
                "ev-4",
                UpdatePayload::ConnectionDeletion { con_id: 0 },
            ))
            .unwrap();
        state
            .apply(&UpdateEvent::new(
                "ev-5",
                UpdatePayload::OperatorDeletion { op_id: 2 },
            ))
            .unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.operators.len(), 1);
        assert!(snapshot.connections.is_empty());
    }

    #[test]
    fn test_pipeline_version_members() {
        let mut state = pipeline_with_structure();
        let version = state.fold_version();

        let view = state.pipeline_version(version).unwrap();
        assert_eq!(view.version, 1);
        // two operators + one connection
        assert_eq!(view.members.len(), 3);
        assert!(state.pipeline_version(99).is_none());
    }

    #[test]
    fn test_derivation_chain_survives_deletion() {
        let mut state = pipeline_with_structure();
        state
            .apply(&UpdateEvent::new(
                "ev-4",
                UpdatePayload::OperatorModification {
                    op_id: 1,
                    op_data: BTreeMap::from([(
                        "rate".to_string(),
                        serde_json::json!(5),
                    )]),
                },
            ))
            .unwrap();
        state
            .apply(&UpdateEvent::new(
                "ev-5",
                UpdatePayload::OperatorDeletion { op_id: 1 },
            ))
            .unwrap();

        let chain = state.derivation_chain(&ExternalId::Operator(1));
        assert_eq!(chain.len(), 2);

        // Newest first, versions strictly decreasing.
        let versions: Vec<u64> = chain
            .iter()
            .filter_map(|id| state.graph().element(*id).as_entity())
            .filter_map(|e| e.version())
            .collect();
        assert_eq!(versions, vec![2, 1]);

        assert!(state
            .derivation_chain(&ExternalId::Operator(42))
            .is_empty());
    }

    #[test]
    fn test_export_carries_execution_metrics() {
        let mut state = pipeline_with_structure();
        state
            .apply(&UpdateEvent::new(
                "ev-4",
                UpdatePayload::OperatorExecution {
                    op_id: 1,
                    exec_id: Some("x-1".to_string()),
                    inputs: vec![],
                    outputs: vec![],
                    metrics: vec![MetricSample {
                        name: "tuples_per_second".to_string(),
                        value: 120.5,
                    }],
                },
            ))
            .unwrap();

        let document = state.export_document();
        let execution = document
            .elements
            .iter()
            .find(|e| e.prov_type == "OperatorExecution")
            .unwrap();
        assert_eq!(execution.attributes["execID"], "x-1");
        assert_eq!(
            execution.attributes["metrics"][0]["name"],
            "tuples_per_second"
        );
        assert_eq!(execution.attributes["metrics"][0]["value"], 120.5);
    }

    #[test]
    fn test_export_document_is_serializable() {
        let mut state = pipeline_with_structure();
        state
            .apply(&UpdateEvent::new(
                "ev-4",
                UpdatePayload::OperatorExecution {
                    op_id: 1,
                    exec_id: Some("x-1".to_string()),
                    inputs: vec![],
                    outputs: vec![TupleOutput {
                        tuple_id: "t-1".to_string(),
                        data: serde_json::json!(1),
                    }],
                    metrics: vec![],
                },
            ))
            .unwrap();

        let document = state.export_document();
        assert_eq!(document.pipeline_id, 7);
        assert_eq!(document.elements.len(), state.graph().element_count());
        assert_eq!(document.relations.len(), state.graph().relation_count());

        let json = document.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["elements"].as_array().unwrap().len() > 0);

        // Every relation endpoint resolves to an exported element id.
        let ids: std::collections::HashSet<&str> = document
            .elements
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        for relation in &document.relations {
            assert!(ids.contains(relation.source.as_str()));
            assert!(ids.contains(relation.target.as_str()));
        }
    }
}
