//! Full-set export: a structured JSON document or a flat CSV table.
//!
//! Both are total functions over the current store contents; JSON round-trips
//! every record field losslessly, CSV flattens the nested fields to delimited
//! strings for spreadsheet use.

use std::collections::BTreeMap;

use docsift_core::DocsiftError;

use crate::store::RecordStore;

pub async fn export_json(store: &dyn RecordStore) -> Result<String, DocsiftError> {
    let records = store.all().await?;
    serde_json::to_string_pretty(&records).map_err(|e| DocsiftError::Storage(e.to_string()))
}

pub async fn export_csv(store: &dyn RecordStore) -> Result<String, DocsiftError> {
    let records = store.all().await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "filename",
            "storedPath",
            "uploadedAt",
            "rawText",
            "confidenceScore",
            "documentType",
            "entities",
            "analysis",
        ])
        .map_err(csv_err)?;

    for record in &records {
        writer
            .write_record([
                record.id.to_string(),
                record.filename.clone(),
                record.stored_path.clone(),
                record.uploaded_at.to_rfc3339(),
                record.raw_text.clone(),
                record.confidence_score.to_string(),
                record.document_type.clone(),
                flatten_entities(&record.entities),
                record
                    .analysis
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DocsiftError::Storage(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DocsiftError::Storage(e.to_string()))
}

/// `category: v1 | v2; category2: v3`
fn flatten_entities(entities: &BTreeMap<String, Vec<String>>) -> String {
    entities
        .iter()
        .map(|(category, values)| format!("{category}: {}", values.join(" | ")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn csv_err(e: csv::Error) -> DocsiftError {
    DocsiftError::Storage(e.to_string())
}
