//! rsm-daemon library target.
//!
//! Exposes the scheduler, the wiring from configuration, and the status
//! router/state for integration tests. The binary `main.rs` depends on this
//! library target.

pub mod api_types;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod wiring;
