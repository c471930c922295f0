//! Game-session memory for Skillpath.
//!
//! Sessions live only in process memory. They hold the per-hand evaluation
//! log used for hand review and the coaching cadence counters.

pub mod memory;

pub use memory::{Cadence, SessionMemory, SessionSummary};
