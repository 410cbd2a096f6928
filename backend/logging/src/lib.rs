//! Structured logging bootstrap for DocSift.

pub mod logger;

pub use logger::init_logging;
