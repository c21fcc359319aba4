//! Version Registry Invariant Tests
//!
//! Tests for pipeline version folding:
//! - Strictly monotonic version numbers
//! - Membership completeness (live entities at the fold, nothing else)
//! - Version-to-version linkage
//! - Automatic folding thresholds

use std::collections::BTreeMap;

use provgraph::graph::{EntityPayload, RelationKind};
use provgraph::{EngineConfig, PipelineProvenance, UpdateEvent, UpdatePayload};

fn op_create(unique_id: &str, op_id: i64) -> UpdateEvent {
    UpdateEvent::new(
        unique_id,
        UpdatePayload::OperatorCreation {
            op_id,
            op_name: format!("op-{}", op_id),
            op_data: BTreeMap::new(),
        },
    )
}

// =============================================================================
// Monotonicity Tests
// =============================================================================

/// Version numbers start at 1 and increase without gaps or reuse.
#[test]
fn test_versions_are_strictly_monotonic() {
    let mut state = PipelineProvenance::new(0);
    state.apply(&op_create("ev-1", 1)).unwrap();

    assert_eq!(state.fold_version(), 1);
    assert_eq!(state.fold_version(), 2);
    state.apply(&op_create("ev-2", 2)).unwrap();
    assert_eq!(state.fold_version(), 3);

    for v in 1..=3 {
        assert!(state.pipeline_version(v).is_some());
    }
    assert!(state.pipeline_version(4).is_none());
}

/// The wire-format fold event behaves like an explicit fold.
#[test]
fn test_version_creation_event_folds() {
    let mut state = PipelineProvenance::new(0);
    state.apply(&op_create("ev-1", 1)).unwrap();
    state
        .apply(&UpdateEvent::new(
            "ev-2",
            UpdatePayload::PipelineVersionCreation,
        ))
        .unwrap();

    assert_eq!(state.snapshot().committed_version, Some(1));

    // The fold event itself is deduplicated like any other event.
    state
        .apply(&UpdateEvent::new(
            "ev-2",
            UpdatePayload::PipelineVersionCreation,
        ))
        .unwrap();
    assert_eq!(state.snapshot().committed_version, Some(1));
}

// =============================================================================
// Membership Tests
// =============================================================================

/// A version owns exactly the entities live at the moment of the fold.
#[test]
fn test_membership_reflects_fold_instant() {
    let mut state = PipelineProvenance::new(0);
    state.apply(&op_create("ev-1", 1)).unwrap();
    state.apply(&op_create("ev-2", 2)).unwrap();
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

    let v1 = state.fold_version();
    assert_eq!(state.pipeline_version(v1).unwrap().members.len(), 3);

    // Delete the connection and one operator; the old version's membership
    // is frozen, the new one reflects the change.
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
    let v2 = state.fold_version();

    assert_eq!(state.pipeline_version(v1).unwrap().members.len(), 3);
    assert_eq!(state.pipeline_version(v2).unwrap().members.len(), 1);
}

/// Membership points at the live version of a modified operator.
#[test]
fn test_membership_tracks_latest_entity_version() {
    let mut state = PipelineProvenance::new(0);
    state.apply(&op_create("ev-1", 1)).unwrap();
    state
        .apply(&UpdateEvent::new(
            "ev-2",
            UpdatePayload::OperatorModification {
                op_id: 1,
                op_data: BTreeMap::from([("rate".to_string(), serde_json::json!(2))]),
            },
        ))
        .unwrap();

    let v = state.fold_version();
    let members = state.pipeline_version(v).unwrap().members;
    assert_eq!(members.len(), 1);

    match state.graph().element(members[0]).as_entity() {
        Some(EntityPayload::OperatorVersion { version, .. }) => assert_eq!(*version, 2),
        other => panic!("wrong member payload: {:?}", other),
    }
}

/// Executions do not disturb version membership.
#[test]
fn test_executions_do_not_join_membership() {
    let mut state = PipelineProvenance::new(0);
    state.apply(&op_create("ev-1", 1)).unwrap();
    state
        .apply(&UpdateEvent::new(
            "ev-2",
            UpdatePayload::OperatorExecution {
                op_id: 1,
                exec_id: None,
                inputs: vec![],
                outputs: vec![provgraph::event::TupleOutput {
                    tuple_id: "t-1".to_string(),
                    data: serde_json::Value::Null,
                }],
                metrics: vec![],
            },
        ))
        .unwrap();

    let v = state.fold_version();
    let members = state.pipeline_version(v).unwrap().members;
    // Only the operator; tuples never belong to the structural snapshot.
    assert_eq!(members.len(), 1);
}

// =============================================================================
// Linkage Tests
// =============================================================================

/// Consecutive versions are linked by specializationOf and wasDerivedFrom.
#[test]
fn test_versions_link_to_their_predecessor() {
    let mut state = PipelineProvenance::new(0);
    state.apply(&op_create("ev-1", 1)).unwrap();

    let v1 = state.fold_version();
    let v2 = state.fold_version();
    let first = state.pipeline_version(v1).unwrap().element;
    let second = state.pipeline_version(v2).unwrap().element;

    let graph = state.graph();
    assert_eq!(graph.target(first, RelationKind::SpecializationOf), None);
    assert_eq!(
        graph.target(second, RelationKind::SpecializationOf),
        Some(first)
    );
    assert_eq!(
        graph.target(second, RelationKind::WasDerivedFrom),
        Some(first)
    );
}

// =============================================================================
// Auto-fold Tests
// =============================================================================

/// Structural events trigger a fold at the configured threshold; executions
/// and duplicates never count.
#[test]
fn test_auto_fold_counts_structural_events_only() {
    let mut state = PipelineProvenance::with_config(
        0,
        EngineConfig {
            auto_fold_after: Some(3),
            logging: false,
        },
    );

    state.apply(&op_create("ev-1", 1)).unwrap();
    state.apply(&op_create("ev-2", 2)).unwrap();
    state
        .apply(&UpdateEvent::new(
            "ev-3",
            UpdatePayload::OperatorExecution {
                op_id: 1,
                exec_id: None,
                inputs: vec![],
                outputs: vec![],
                metrics: vec![],
            },
        ))
        .unwrap();
    state.apply(&op_create("ev-2", 2)).unwrap(); // duplicate
    assert_eq!(state.snapshot().committed_version, None);

    state.apply(&op_create("ev-4", 3)).unwrap();
    assert_eq!(state.snapshot().committed_version, Some(1));
}
