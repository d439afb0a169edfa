//! HTTP and WebSocket front-end for the batch coordinator.
//!
//! The binary in `main.rs` wires the real packager into [`state::AppState`];
//! integration tests build the same router around mocks.

pub mod api;
pub mod logging;
pub mod metrics;
pub mod state;
