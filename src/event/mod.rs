//! Update event model
//!
//! The engine consumes discrete update events emitted by the stream
//! processing runtime, one JSON object per line, order-significant.
//! Seven event kinds exist and the set is closed:
//!
//! - `PIPELINE_VERSION_CREATION`
//! - `OPERATOR_CREATION` / `OPERATOR_MODIFICATION` / `OPERATOR_DELETION`
//! - `CONNECTION_CREATION` / `CONNECTION_DELETION`
//! - `OPERATOR_EXECUTION`
//!
//! Each event carries a globally unique `uniqueID`. An event is consumed
//! exactly once; replays of the same id are idempotent no-ops.

mod reader;
mod record;

pub use reader::EventLogReader;
pub use record::{MetricSample, TupleOutput, UpdateEvent, UpdatePayload};
