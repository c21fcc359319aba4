//! Observable engine events
//!
//! Events are explicit and typed; the set is closed.

use std::fmt;

/// Observable events in the construction engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Event application
    /// An update event was applied and the graph mutated
    EventApplied,
    /// An already-seen `uniqueID` was ignored (idempotent no-op)
    DuplicateIgnored,
    /// An update event was rejected; the graph is unchanged
    EventRejected,

    // Version registry
    /// Live structure folded into a new pipeline version
    VersionFolded,

    // Log replay
    /// Event log replay started
    ReplayStart,
    /// Event log replay complete
    ReplayComplete,
}

impl Event {
    /// Returns the canonical event name used in log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EventApplied => "EVENT_APPLIED",
            Event::DuplicateIgnored => "DUPLICATE_IGNORED",
            Event::EventRejected => "EVENT_REJECTED",
            Event::VersionFolded => "VERSION_FOLDED",
            Event::ReplayStart => "REPLAY_START",
            Event::ReplayComplete => "REPLAY_COMPLETE",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_stable() {
        assert_eq!(Event::EventApplied.as_str(), "EVENT_APPLIED");
        assert_eq!(Event::DuplicateIgnored.as_str(), "DUPLICATE_IGNORED");
        assert_eq!(Event::VersionFolded.as_str(), "VERSION_FOLDED");
    }
}
