//! Identity & deduplication ledger
//!
//! Tracks which event `uniqueID`s have been applied. Re-delivering a seen
//! id is a no-op that must not mutate any other component, which makes the
//! whole pipeline idempotent under log replay: replaying an identical
//! event sequence any number of times produces a graph isomorphic to a
//! single application.
//!
//! Ids are recorded only after an event fully applies. A rejected event
//! leaves no ledger entry, so a corrected retry under the same id can
//! succeed.

use std::collections::HashSet;

/// The set of already-applied event ids.
#[derive(Debug, Clone, Default)]
pub struct IdentityLedger {
    seen: HashSet<String>,
}

impl IdentityLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the id was already applied.
    pub fn is_seen(&self, unique_id: &str) -> bool {
        self.seen.contains(unique_id)
    }

    /// Records an id as applied.
    pub fn record(&mut self, unique_id: impl Into<String>) {
        self.seen.insert(unique_id.into());
    }

    /// Returns the number of applied events.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if no event has been applied.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_seen() {
        let mut ledger = IdentityLedger::new();
        assert!(!ledger.is_seen("ev-1"));
        ledger.record("ev-1");
        assert!(ledger.is_seen("ev-1"));
        assert!(!ledger.is_seen("ev-2"));
    }

    #[test]
    fn test_recording_twice_is_harmless() {
        let mut ledger = IdentityLedger::new();
        ledger.record("ev-1");
        ledger.record("ev-1");
        assert_eq!(ledger.len(), 1);
    }
}
