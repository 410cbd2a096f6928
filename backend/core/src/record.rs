//! The persisted unit of work: one processed upload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fully materialized record as stored in the repository.
///
/// Lifecycle: inserted once after the OCR stage (with `document_type`
/// defaulting to `"unknown"`), enriched at most once by the analysis stage,
/// deleted only explicitly. Readers never observe a partially initialized
/// record: `raw_text` and `confidence_score` are always populated, degraded
/// values included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    /// Original upload name; informational, not unique.
    pub filename: String,
    /// Repository-owned content reference. Set at insert, never mutated.
    pub stored_path: String,
    pub uploaded_at: DateTime<Utc>,
    /// OCR output. Empty string when extraction produced nothing, never null.
    pub raw_text: String,
    /// Normalized to [0.0, 1.0]; 0.0 on extraction failure.
    pub confidence_score: f64,
    /// Short classification tag; `"unknown"` when unclassified.
    pub document_type: String,
    /// Entity category -> ordered extracted values. Empty categories are
    /// dropped rather than stored as empty lists.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entities: BTreeMap<String, Vec<String>>,
    /// Opaque enrichment payload (summary, insights). Absent when the
    /// analysis stage failed or was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
}

/// Insert payload: the fields known once OCR has finished (or failed).
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub filename: String,
    pub stored_path: String,
    pub raw_text: String,
    pub confidence_score: f64,
}

/// The single post-insert patch applied by the analysis stage.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub document_type: String,
    pub entities: BTreeMap<String, Vec<String>>,
    pub analysis: Option<serde_json::Value>,
}
