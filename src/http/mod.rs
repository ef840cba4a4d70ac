//! HTTP bindings for the presentation shell.
//!
//! The shell only reads session snapshots and dispatches intent-equivalent
//! actions (manual select, type-in time, cancel); it never mutates session
//! state directly.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
