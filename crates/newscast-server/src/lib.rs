//! HTTP surface
//!
//! REST API over the pipeline: run triggering, run history, progress,
//! podcast feed and episode delivery, dashboard config, and health.

pub mod auth;
pub mod http;
pub mod state;

pub use http::create_router;
pub use state::AppState;
