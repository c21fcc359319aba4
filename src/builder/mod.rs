//! Provenance graph builder
//!
//! The seven submodel handlers that translate an update event into PROV
//! elements and relations, using the live reference index to resolve
//! prior state and the identity ledger to guard against replays.
//!
//! Application discipline:
//! - Events for one pipeline apply strictly sequentially through a single
//!   `PipelineProvenance` state handle; there are no ambient globals.
//! - An event either fully applies or is rejected atomically. Every
//!   precondition is checked before the first write; the writes themselves
//!   are infallible, so partial application is never observable.
//! - A rejected event leaves the graph, the index, and the ledger exactly
//!   as before the call.

mod state;

pub use state::{EngineConfig, PipelineProvenance};
