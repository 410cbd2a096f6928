use std::collections::BTreeMap;

use async_trait::async_trait;
use docsift_core::{DocsiftError, Enrichment, NewRecord, Record};

/// Listing parameters. `search` and `document_type` compose.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    /// Case-insensitive substring matched against raw text and filename.
    pub search: Option<String>,
    /// Exact document type; `None` (or `"all"`) disables the filter.
    pub document_type: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            search: None,
            document_type: None,
            limit: 100,
            offset: 0,
        }
    }
}

/// One page of results plus the full match count (ignoring limit/offset).
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_records: u64,
    pub average_confidence: f64,
    pub by_document_type: BTreeMap<String, u64>,
}

/// Durable record repository.
///
/// Id allocation is monotonic and never reused; concurrent inserts must not
/// collide. Query/export consumers are read-only: the only mutations are the
/// insert at the OCR stage, the single enrichment patch, and explicit delete.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a freshly OCR'd record. `uploaded_at` is set here;
    /// `document_type` starts as `"unknown"`.
    async fn insert(&self, new: NewRecord) -> Result<Record, DocsiftError>;

    /// Attach classification/entities/analysis to an existing record.
    async fn apply_enrichment(&self, id: i64, enrichment: Enrichment) -> Result<(), DocsiftError>;

    async fn get(&self, id: i64) -> Result<Record, DocsiftError>;

    /// Newest-first listing with optional search/filter.
    async fn list(&self, query: RecordQuery) -> Result<RecordPage, DocsiftError>;

    async fn delete(&self, id: i64) -> Result<(), DocsiftError>;

    async fn stats(&self) -> Result<StoreStats, DocsiftError>;

    /// The complete newest-first record set, for export.
    async fn all(&self) -> Result<Vec<Record>, DocsiftError>;
}
