//! HTTP API for DocSift: upload, records, analyze, export, stats.

pub mod api;

pub use api::{AppState, build_router};
