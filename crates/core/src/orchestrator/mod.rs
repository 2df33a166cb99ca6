//! Search orchestrator - runs one search response through the store and artwork cache.
//!
//! Order per search: provider search, parse every payload, upsert all of them,
//! reconcile artwork for the resulting batch, then query the store for the
//! term. No reconcile ever sees a half-applied response.

mod runner;
mod types;

pub use runner::SearchOrchestrator;
pub use types::{OrchestratorError, SearchOutcome};
