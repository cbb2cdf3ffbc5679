//! State module for tracking run progress
//!
//! # Components
//!
//! - `FetchOutcome`: the terminal result of one identifier (success, not found, failure, missing target)
//! - `OutcomeRecord`: an outcome bundled with its identifier and passthrough metadata
//! - `RunState`: per-run counts used for reporting

mod outcome;
mod run_state;

// Re-export main types
pub use outcome::{FetchOutcome, OutcomeKind, OutcomeRecord, StockState};
pub use run_state::RunState;
