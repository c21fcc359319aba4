//! provgraph - A strict, deterministic provenance graph construction engine
//! for data-flow pipelines
//!
//! Consumes an ordered stream of pipeline update events (operator and
//! connection lifecycle, tuple-level executions, version snapshots) and
//! incrementally builds a W3C PROV-style graph of entities, activities,
//! agents, and relations.

pub mod builder;
pub mod engine;
pub mod errors;
pub mod event;
pub mod export;
pub mod graph;
pub mod index;
pub mod ledger;
pub mod observability;
pub mod registry;

pub use builder::{EngineConfig, PipelineProvenance};
pub use engine::ProvenanceEngine;
pub use errors::{ApplyError, ApplyOutcome, ApplyResult};
pub use event::{UpdateEvent, UpdatePayload};
