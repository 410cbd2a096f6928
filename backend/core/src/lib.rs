pub mod error;
pub mod record;

pub use error::{DocsiftError, RejectReason};
pub use record::{Enrichment, NewRecord, Record};
