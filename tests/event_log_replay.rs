//! Event Log Replay Tests
//!
//! End-to-end ingestion of JSONL event logs through the engine:
//! - Strict sequential replay
//! - Halt-on-error with everything before the bad line retained
//! - Re-replaying a log is a no-op

use std::io::Write;

use provgraph::engine::{ProvenanceEngine, ReplayStats};
use provgraph::index::ExternalId;

fn write_log(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp log");
    file.write_all(contents.as_bytes()).expect("write temp log");
    file
}

const SAMPLE_LOG: &str = concat!(
    r#"{"uniqueID":"ev-1","updateType":"OPERATOR_CREATION","opID":1,"opName":"source","opData":{"rate":10}}"#,
    "\n",
    r#"{"uniqueID":"ev-2","updateType":"OPERATOR_CREATION","opID":2,"opName":"sink","opData":{}}"#,
    "\n",
    r#"{"uniqueID":"ev-3","updateType":"CONNECTION_CREATION","conID":0,"fromOpID":1,"toOpID":2,"fromSockID":0,"toSockID":0}"#,
    "\n",
    r#"{"uniqueID":"ev-4","updateType":"OPERATOR_EXECUTION","opID":1,"execID":"x-1","outputs":[{"tupleID":"t-1","data":{"v":1}}]}"#,
    "\n",
    r#"{"uniqueID":"ev-5","updateType":"OPERATOR_EXECUTION","opID":2,"execID":"x-2","inputs":["t-1"]}"#,
    "\n",
    r#"{"uniqueID":"ev-6","updateType":"PIPELINE_VERSION_CREATION"}"#,
    "\n",
);

// =============================================================================
// Ingestion Tests
// =============================================================================

/// A full log replays into the expected live structure.
#[test]
fn test_log_replays_into_structure() {
    let log = write_log(SAMPLE_LOG);
    let engine = ProvenanceEngine::new();

    let stats = engine.replay(1, log.path()).unwrap();
    assert_eq!(
        stats,
        ReplayStats {
            applied: 6,
            duplicates: 0
        }
    );

    engine
        .with_pipeline(1, |state| {
            let snapshot = state.snapshot();
            assert_eq!(snapshot.operators.len(), 2);
            assert_eq!(snapshot.connections.len(), 1);
            assert_eq!(snapshot.committed_version, Some(1));
            assert_eq!(
                state
                    .derivation_chain(&ExternalId::Tuple("t-1".to_string()))
                    .len(),
                1
            );
        })
        .unwrap();
}

/// Replaying the same log twice applies nothing the second time.
#[test]
fn test_second_replay_is_noop() {
    let log = write_log(SAMPLE_LOG);
    let engine = ProvenanceEngine::new();

    engine.replay(1, log.path()).unwrap();
    let elements = engine
        .with_pipeline(1, |state| state.graph().element_count())
        .unwrap();

    let stats = engine.replay(1, log.path()).unwrap();
    assert_eq!(
        stats,
        ReplayStats {
            applied: 0,
            duplicates: 6
        }
    );
    assert_eq!(
        engine
            .with_pipeline(1, |state| state.graph().element_count())
            .unwrap(),
        elements
    );
}

// =============================================================================
// Failure Tests
// =============================================================================

/// A malformed line halts replay; everything before it stays applied.
#[test]
fn test_malformed_line_halts_replay() {
    let log = write_log(concat!(
        r#"{"uniqueID":"ev-1","updateType":"OPERATOR_CREATION","opID":1,"opName":"a","opData":{}}"#,
        "\n",
        "not json\n",
        r#"{"uniqueID":"ev-3","updateType":"OPERATOR_CREATION","opID":2,"opName":"b","opData":{}}"#,
        "\n",
    ));
    let engine = ProvenanceEngine::new();

    let err = engine.replay(1, log.path()).unwrap_err();
    assert_eq!(err.code(), "MALFORMED_EVENT");
    assert!(format!("{}", err).contains(":2:"));

    // ev-1 applied, ev-3 never reached.
    let ops = engine
        .with_pipeline(1, |state| state.snapshot().operators.len())
        .unwrap();
    assert_eq!(ops, 1);
}

/// A semantically invalid event halts replay with its error.
#[test]
fn test_rejected_event_halts_replay() {
    let log = write_log(concat!(
        r#"{"uniqueID":"ev-1","updateType":"OPERATOR_CREATION","opID":1,"opName":"a","opData":{}}"#,
        "\n",
        r#"{"uniqueID":"ev-2","updateType":"OPERATOR_DELETION","opID":99}"#,
        "\n",
    ));
    let engine = ProvenanceEngine::new();

    let err = engine.replay(1, log.path()).unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_REFERENCE");
    assert_eq!(err.unique_id(), Some("ev-2"));
}

/// A missing log file is an error, not an empty replay.
#[test]
fn test_missing_log_is_an_error() {
    let engine = ProvenanceEngine::new();
    let err = engine
        .replay(1, "/nonexistent/events.jsonl")
        .unwrap_err();
    assert_eq!(err.code(), "MALFORMED_EVENT");
}
