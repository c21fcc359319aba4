//! Update event records and their wire format
//!
//! Wire format: one JSON object per line.
//!
//! ```json
//! { "uniqueID": "ev-42", "updateType": "OPERATOR_CREATION",
//!   "opID": 1, "opName": "filter", "opData": {"threshold": 0.5} }
//! ```
//!
//! The `updateType` tag selects the payload variant; kind-specific fields
//! are required unless noted. A missing required field or an unknown
//! `updateType` is a `MalformedEvent` error, never a silent default.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ApplyError, ApplyResult};

/// A named metric sample attached to an operator execution.
///
/// Metrics are opaque to the engine; they are recorded as attributes of
/// the execution activity and never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Metric name
    pub name: String,
    /// Metric value
    pub value: f64,
}

/// A tuple produced by an operator execution.
///
/// The producing event names its tuples so that downstream executions can
/// reference them as inputs; the engine never substitutes generated ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TupleOutput {
    /// Externally visible tuple identifier
    #[serde(rename = "tupleID")]
    pub tuple_id: String,
    /// Opaque tuple payload
    #[serde(default)]
    pub data: Value,
}

/// Kind-specific payload of an update event.
///
/// This is a closed set: the engine dispatches by exhaustive match and an
/// unknown `updateType` fails at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "updateType")]
pub enum UpdatePayload {
    /// Fold the accumulated structural changes into a new pipeline version.
    #[serde(rename = "PIPELINE_VERSION_CREATION")]
    PipelineVersionCreation,

    /// A new operator was added to the pipeline.
    #[serde(rename = "OPERATOR_CREATION")]
    OperatorCreation {
        #[serde(rename = "opID")]
        op_id: i64,
        #[serde(rename = "opName")]
        op_name: String,
        /// Opaque operator configuration
        #[serde(rename = "opData", default)]
        op_data: BTreeMap<String, Value>,
    },

    /// An existing operator's configuration changed.
    /// `opData` carries only the changed fields; the engine merges them
    /// over the previous version's configuration.
    #[serde(rename = "OPERATOR_MODIFICATION")]
    OperatorModification {
        #[serde(rename = "opID")]
        op_id: i64,
        #[serde(rename = "opData")]
        op_data: BTreeMap<String, Value>,
    },

    /// An operator was removed from the pipeline.
    #[serde(rename = "OPERATOR_DELETION")]
    OperatorDeletion {
        #[serde(rename = "opID")]
        op_id: i64,
    },

    /// A connection between two live operators was created.
    #[serde(rename = "CONNECTION_CREATION")]
    ConnectionCreation {
        #[serde(rename = "conID")]
        con_id: i64,
        #[serde(rename = "fromOpID")]
        from_op_id: i64,
        #[serde(rename = "toOpID")]
        to_op_id: i64,
        #[serde(rename = "fromSockID")]
        from_sock_id: i64,
        #[serde(rename = "toSockID")]
        to_sock_id: i64,
    },

    /// A connection was removed from the pipeline.
    #[serde(rename = "CONNECTION_DELETION")]
    ConnectionDeletion {
        #[serde(rename = "conID")]
        con_id: i64,
    },

    /// An operator executed: it consumed upstream tuples and produced
    /// output tuples. Executions never mutate structural entities.
    #[serde(rename = "OPERATOR_EXECUTION")]
    OperatorExecution {
        #[serde(rename = "opID")]
        op_id: i64,
        /// Execution identifier; generated when absent
        #[serde(rename = "execID", default)]
        exec_id: Option<String>,
        /// Tuple ids consumed by this execution
        #[serde(default)]
        inputs: Vec<String>,
        /// Tuples produced by this execution
        #[serde(default)]
        outputs: Vec<TupleOutput>,
        /// Metric samples reported for this execution
        #[serde(default)]
        metrics: Vec<MetricSample>,
    },
}

impl UpdatePayload {
    /// Returns the wire-format `updateType` tag for this payload.
    pub fn update_type(&self) -> &'static str {
        match self {
            UpdatePayload::PipelineVersionCreation => "PIPELINE_VERSION_CREATION",
            UpdatePayload::OperatorCreation { .. } => "OPERATOR_CREATION",
            UpdatePayload::OperatorModification { .. } => "OPERATOR_MODIFICATION",
            UpdatePayload::OperatorDeletion { .. } => "OPERATOR_DELETION",
            UpdatePayload::ConnectionCreation { .. } => "CONNECTION_CREATION",
            UpdatePayload::ConnectionDeletion { .. } => "CONNECTION_DELETION",
            UpdatePayload::OperatorExecution { .. } => "OPERATOR_EXECUTION",
        }
    }

    /// Returns true for events that change the pipeline structure and
    /// therefore count toward the next version fold.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            UpdatePayload::PipelineVersionCreation | UpdatePayload::OperatorExecution { .. }
        )
    }
}

/// An immutable update event as delivered by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// Globally unique event identifier
    #[serde(rename = "uniqueID")]
    pub unique_id: String,
    /// Event time as epoch seconds; the engine clock is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Kind-specific payload
    #[serde(flatten)]
    pub payload: UpdatePayload,
}

impl UpdateEvent {
    /// Create an event with the given id and payload and no timestamp.
    pub fn new(unique_id: impl Into<String>, payload: UpdatePayload) -> Self {
        Self {
            unique_id: unique_id.into(),
            timestamp: None,
            payload,
        }
    }

    /// Parse a single event from one line of the event log.
    pub fn from_json_line(line: &str) -> ApplyResult<Self> {
        let event: UpdateEvent = serde_json::from_str(line)
            .map_err(|e| ApplyError::malformed(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    /// Serialize the event to its wire format.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Returns the wire-format `updateType` tag.
    pub fn update_type(&self) -> &'static str {
        self.payload.update_type()
    }

    /// Validate kind-independent requirements.
    ///
    /// Structural requirements (field presence, tag validity) are already
    /// enforced by the wire format; this catches values serde accepts but
    /// the engine cannot work with.
    pub fn validate(&self) -> ApplyResult<()> {
        if self.unique_id.is_empty() {
            return Err(ApplyError::malformed("uniqueID must not be empty"));
        }
        if let Some(t) = self.timestamp {
            if !t.is_finite() {
                return Err(ApplyError::malformed_event(
                    &self.unique_id,
                    "timestamp must be a finite number",
                ));
            }
        }
        if let UpdatePayload::OperatorExecution {
            inputs, outputs, ..
        } = &self.payload
        {
            if inputs.iter().any(|t| t.is_empty()) {
                return Err(ApplyError::malformed_event(
                    &self.unique_id,
                    "execution input tuple ids must not be empty",
                ));
            }
            if outputs.iter().any(|t| t.tuple_id.is_empty()) {
                return Err(ApplyError::malformed_event(
                    &self.unique_id,
                    "execution output tuple ids must not be empty",
                ));
            }
        }
        Ok(())
    }

    /// The event time: the carried timestamp when present, otherwise the
    /// engine clock.
    pub fn event_time(&self) -> DateTime<Utc> {
        self.timestamp
            .and_then(|t| {
                let secs = t.trunc() as i64;
                let nanos = ((t - t.trunc()) * 1_000_000_000.0) as u32;
                DateTime::from_timestamp(secs, nanos)
            })
            .unwrap_or_else(Utc::now)
    }
}
