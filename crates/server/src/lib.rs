//! HTTP service for the appetiser track catalog.
//!
//! The binary in `main.rs` wires the core components together; the router,
//! state and metrics live here so integration tests can build the service
//! in-process.

pub mod api;
pub mod metrics;
pub mod state;
