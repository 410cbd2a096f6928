//! Read-only query facade over the record store.
//!
//! Normalizes caller-supplied listing parameters (blank search, the `"all"`
//! filter sentinel, unbounded limits) before they reach the repository, and
//! exposes the stats aggregate. Never mutates the store.

use std::sync::Arc;

use docsift_core::DocsiftError;

use crate::store::{RecordPage, RecordQuery, RecordStore, StoreStats};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 500;

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn RecordStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn search(
        &self,
        search: Option<String>,
        document_type: Option<String>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<RecordPage, DocsiftError> {
        let query = RecordQuery {
            search: search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            document_type: document_type
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty() && t != "all"),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0),
        };
        self.store.list(query).await
    }

    pub async fn stats(&self) -> Result<StoreStats, DocsiftError> {
        self.store.stats().await
    }
}
