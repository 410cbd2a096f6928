pub mod export;
pub mod query;
pub mod sqlite_store;
pub mod store;

pub use export::{export_csv, export_json};
pub use query::QueryService;
pub use sqlite_store::SqliteRecordStore;
pub use store::{RecordPage, RecordQuery, RecordStore, StoreStats};
