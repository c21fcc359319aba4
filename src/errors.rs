//! Engine error taxonomy
//!
//! Every error is local to the single event being applied: it aborts only
//! that event's effect and leaves the graph exactly as before the call.
//! No error is fatal to the engine itself; the caller decides whether to
//! halt the stream or skip and continue.
//!
//! Errors carry the offending `uniqueID` and `updateType` so they can be
//! correlated with the source runtime's log.

use thiserror::Error;

/// Result type for event application.
pub type ApplyResult<T> = Result<T, ApplyError>;

/// Outcome of a successful `apply` call.
///
/// A duplicate event is not an error: re-delivering an already-applied
/// `uniqueID` is an idempotent no-op, reported here so callers can log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event was applied and the graph was mutated.
    Applied,
    /// The event's `uniqueID` was already in the ledger; nothing changed.
    DuplicateIgnored,
}

impl ApplyOutcome {
    /// Returns true if the event mutated the graph.
    pub fn is_applied(self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

/// Errors raised while applying a single update event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// A creation event names an external id that is already occupied,
    /// either by a live entity or by the history of a deleted one.
    /// Deletions are terminal: a tombstoned id is never reusable.
    #[error("conflict: {reference} is already occupied (event {unique_id}, {update_type})")]
    Conflict {
        /// `uniqueID` of the offending event
        unique_id: String,
        /// `updateType` of the offending event
        update_type: String,
        /// Human-readable description of the occupied reference
        reference: String,
    },

    /// An event references an external id that was never created or has
    /// been deleted.
    #[error("unknown reference: {reference} is not live (event {unique_id}, {update_type})")]
    UnknownReference {
        /// `uniqueID` of the offending event
        unique_id: String,
        /// `updateType` of the offending event
        update_type: String,
        /// Human-readable description of the unresolved reference
        reference: String,
    },

    /// The event record itself is invalid: missing required field, unknown
    /// `updateType`, or an unparseable log line.
    #[error("malformed event{}: {detail}", fmt_unique_id(.unique_id))]
    MalformedEvent {
        /// `uniqueID` of the offending event, when it could be extracted
        unique_id: Option<String>,
        /// What was wrong with the record
        detail: String,
    },
}

fn fmt_unique_id(unique_id: &Option<String>) -> String {
    match unique_id {
        Some(id) => format!(" ({})", id),
        None => String::new(),
    }
}

impl ApplyError {
    /// Create a conflict error for the given event and reference.
    pub fn conflict(
        unique_id: impl Into<String>,
        update_type: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            unique_id: unique_id.into(),
            update_type: update_type.into(),
            reference: reference.into(),
        }
    }

    /// Create an unknown-reference error for the given event and reference.
    pub fn unknown_reference(
        unique_id: impl Into<String>,
        update_type: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self::UnknownReference {
            unique_id: unique_id.into(),
            update_type: update_type.into(),
            reference: reference.into(),
        }
    }

    /// Create a malformed-event error with no extractable `uniqueID`.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedEvent {
            unique_id: None,
            detail: detail.into(),
        }
    }

    /// Create a malformed-event error for a known `uniqueID`.
    pub fn malformed_event(unique_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedEvent {
            unique_id: Some(unique_id.into()),
            detail: detail.into(),
        }
    }

    /// Returns the offending event's `uniqueID`, if known.
    pub fn unique_id(&self) -> Option<&str> {
        match self {
            ApplyError::Conflict { unique_id, .. }
            | ApplyError::UnknownReference { unique_id, .. } => Some(unique_id),
            ApplyError::MalformedEvent { unique_id, .. } => unique_id.as_deref(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ApplyError::Conflict { .. } => "CONFLICT",
            ApplyError::UnknownReference { .. } => "UNKNOWN_REFERENCE",
            ApplyError::MalformedEvent { .. } => "MALFORMED_EVENT",
        }
    }
}
