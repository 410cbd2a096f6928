/// SQLite-backed durable record store.
///
/// Uses `rusqlite` with the connection behind a `tokio::sync::Mutex`; the
/// mutex serializes writers, and `AUTOINCREMENT` gives monotonic, never-reused
/// id allocation even across deletes. Entity and analysis payloads are stored
/// as JSON text columns, NULL when absent.
use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use tokio::sync::Mutex;
use tracing::{debug, info};

use docsift_core::{DocsiftError, Enrichment, NewRecord, Record};

use crate::store::{RecordPage, RecordQuery, RecordStore, StoreStats};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    filename         TEXT NOT NULL,
    stored_path      TEXT NOT NULL,
    uploaded_at      TEXT NOT NULL,
    raw_text         TEXT NOT NULL DEFAULT '',
    confidence_score REAL NOT NULL DEFAULT 0,
    document_type    TEXT NOT NULL DEFAULT 'unknown',
    entities         TEXT,
    analysis         TEXT
);
CREATE INDEX IF NOT EXISTS idx_records_uploaded ON records(uploaded_at);
CREATE INDEX IF NOT EXISTS idx_records_type ON records(document_type);";

const COLUMNS: &str =
    "id, filename, stored_path, uploaded_at, raw_text, confidence_score, document_type, entities, analysis";

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocsiftError> {
        let conn = Connection::open(path.as_ref()).map_err(storage_err)?;
        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;\n{SCHEMA}"))
            .map_err(storage_err)?;
        info!("record store opened at {:?}", path.as_ref());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self, DocsiftError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, new: NewRecord) -> Result<Record, DocsiftError> {
        let conn = self.conn.lock().await;
        let uploaded_at = Utc::now();
        conn.execute(
            "INSERT INTO records (filename, stored_path, uploaded_at, raw_text, confidence_score)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new.filename,
                new.stored_path,
                uploaded_at.to_rfc3339(),
                new.raw_text,
                new.confidence_score,
            ],
        )
        .map_err(storage_err)?;

        let id = conn.last_insert_rowid();
        debug!(id, filename = %new.filename, "Inserted record");

        Ok(Record {
            id,
            filename: new.filename,
            stored_path: new.stored_path,
            uploaded_at,
            raw_text: new.raw_text,
            confidence_score: new.confidence_score,
            document_type: "unknown".to_string(),
            entities: BTreeMap::new(),
            analysis: None,
        })
    }

    async fn apply_enrichment(&self, id: i64, enrichment: Enrichment) -> Result<(), DocsiftError> {
        let entities_json = if enrichment.entities.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&enrichment.entities).map_err(json_err)?)
        };
        let analysis_json = match &enrichment.analysis {
            Some(v) => Some(serde_json::to_string(v).map_err(json_err)?),
            None => None,
        };

        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                "UPDATE records SET document_type = ?1, entities = ?2, analysis = ?3 WHERE id = ?4",
                params![enrichment.document_type, entities_json, analysis_json, id],
            )
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(DocsiftError::NotFound(id));
        }
        debug!(id, document_type = %enrichment.document_type, "Applied enrichment");
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Record, DocsiftError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM records WHERE id = ?1"),
            params![id],
            row_to_record,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DocsiftError::NotFound(id),
            other => storage_err(other),
        })
    }

    async fn list(&self, query: RecordQuery) -> Result<RecordPage, DocsiftError> {
        let mut where_sql = String::from("1=1");
        let mut args: Vec<SqlValue> = Vec::new();

        if let Some(q) = query.search.as_deref().filter(|s| !s.is_empty()) {
            where_sql.push_str(" AND (LOWER(raw_text) LIKE ? OR LOWER(filename) LIKE ?)");
            let pattern = format!("%{}%", q.to_lowercase());
            args.push(SqlValue::Text(pattern.clone()));
            args.push(SqlValue::Text(pattern));
        }
        if let Some(t) = query
            .document_type
            .as_deref()
            .filter(|t| !t.is_empty() && *t != "all")
        {
            where_sql.push_str(" AND document_type = ?");
            args.push(SqlValue::Text(t.to_string()));
        }

        let conn = self.conn.lock().await;

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM records WHERE {where_sql}"),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .map_err(storage_err)?;

        let sql = format!(
            "SELECT {COLUMNS} FROM records WHERE {where_sql}
             ORDER BY uploaded_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        args.push(SqlValue::Integer(query.limit as i64));
        args.push(SqlValue::Integer(query.offset as i64));

        let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
        let records = stmt
            .query_map(params_from_iter(args.iter()), row_to_record)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        Ok(RecordPage {
            records,
            total: total as u64,
        })
    }

    async fn delete(&self, id: i64) -> Result<(), DocsiftError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute("DELETE FROM records WHERE id = ?1", params![id])
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(DocsiftError::NotFound(id));
        }
        debug!(id, "Deleted record");
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, DocsiftError> {
        let conn = self.conn.lock().await;

        let total_records: i64 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(storage_err)?;
        let average_confidence: f64 = conn
            .query_row(
                "SELECT COALESCE(AVG(confidence_score), 0.0) FROM records",
                [],
                |row| row.get(0),
            )
            .map_err(storage_err)?;

        let mut stmt = conn
            .prepare("SELECT document_type, COUNT(*) FROM records GROUP BY document_type")
            .map_err(storage_err)?;
        let by_document_type = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .map_err(storage_err)?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .map_err(storage_err)?;

        Ok(StoreStats {
            total_records: total_records as u64,
            average_confidence,
            by_document_type,
        })
    }

    async fn all(&self) -> Result<Vec<Record>, DocsiftError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM records ORDER BY uploaded_at DESC, id DESC"
            ))
            .map_err(storage_err)?;
        stmt.query_map([], row_to_record)
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)
    }
}

// ---------------------------------------------------------------------------
// Row deserialization helpers
// ---------------------------------------------------------------------------

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let uploaded_raw: String = row.get(3)?;
    let entities_json: Option<String> = row.get(7)?;
    let analysis_json: Option<String> = row.get(8)?;

    let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;
    let entities: BTreeMap<String, Vec<String>> = match entities_json {
        Some(s) => serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?,
        None => BTreeMap::new(),
    };
    let analysis: Option<serde_json::Value> = match analysis_json {
        Some(s) => Some(
            serde_json::from_str(&s)
                .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?,
        ),
        None => None,
    };

    Ok(Record {
        id: row.get(0)?,
        filename: row.get(1)?,
        stored_path: row.get(2)?,
        uploaded_at,
        raw_text: row.get(4)?,
        confidence_score: row.get(5)?,
        document_type: row.get(6)?,
        entities,
        analysis,
    })
}

fn storage_err(e: rusqlite::Error) -> DocsiftError {
    DocsiftError::Storage(e.to_string())
}

fn json_err(e: serde_json::Error) -> DocsiftError {
    DocsiftError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_record(filename: &str, raw_text: &str, confidence: f64) -> NewRecord {
        NewRecord {
            filename: filename.to_string(),
            stored_path: format!("uploads/{filename}"),
            raw_text: raw_text.to_string(),
            confidence_score: confidence,
        }
    }

    #[tokio::test]
    async fn insert_then_get_roundtrip() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let inserted = store
            .insert(new_record("scan.png", "hello world", 0.9))
            .await
            .unwrap();

        let fetched = store.get(inserted.id).await.unwrap();
        assert_eq!(fetched, inserted);
        assert_eq!(fetched.document_type, "unknown");
        assert!(fetched.entities.is_empty());
        assert!(fetched.analysis.is_none());
    }

    #[tokio::test]
    async fn enrichment_is_visible_on_subsequent_get() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let record = store
            .insert(new_record("inv.png", "Invoice #102 Total $45", 0.95))
            .await
            .unwrap();

        let mut entities = BTreeMap::new();
        entities.insert("amounts".to_string(), vec!["$45".to_string()]);
        store
            .apply_enrichment(
                record.id,
                Enrichment {
                    document_type: "invoice".to_string(),
                    entities: entities.clone(),
                    analysis: Some(serde_json::json!({"summary": "an invoice"})),
                },
            )
            .await
            .unwrap();

        let fetched = store.get(record.id).await.unwrap();
        assert_eq!(fetched.document_type, "invoice");
        assert_eq!(fetched.entities, entities);
        assert_eq!(fetched.analysis.unwrap()["summary"], "an invoice");
        // Immutable fields survive enrichment untouched.
        assert_eq!(fetched.raw_text, "Invoice #102 Total $45");
        assert_eq!(fetched.uploaded_at, record.uploaded_at);
    }

    #[tokio::test]
    async fn enriching_a_missing_id_reports_not_found() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let err = store
            .apply_enrichment(999, Enrichment::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DocsiftError::NotFound(999)));
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paginates() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        for i in 0..3 {
            store
                .insert(new_record(&format!("f{i}.png"), "text", 0.5))
                .await
                .unwrap();
        }

        let page = store
            .list(RecordQuery {
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].filename, "f2.png");
        assert_eq!(page.records[1].filename, "f1.png");

        let rest = store
            .list(RecordQuery {
                limit: 2,
                offset: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rest.records.len(), 1);
        assert_eq!(rest.records[0].filename, "f0.png");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_text_and_filename() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store
            .insert(new_record("receipt.png", "Invoice #102 Total $45", 0.9))
            .await
            .unwrap();
        store
            .insert(new_record("Quarterly-Report.png", "nothing here", 0.9))
            .await
            .unwrap();

        let by_text = store
            .list(RecordQuery {
                search: Some("total".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_text.total, 1);
        assert_eq!(by_text.records[0].filename, "receipt.png");

        let by_name = store
            .list(RecordQuery {
                search: Some("QUARTERLY".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.total, 1);
        assert_eq!(by_name.records[0].filename, "Quarterly-Report.png");
    }

    #[tokio::test]
    async fn filter_is_exact_and_all_disables_it() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let a = store.insert(new_record("a.png", "x", 0.5)).await.unwrap();
        store.insert(new_record("b.png", "y", 0.5)).await.unwrap();
        store
            .apply_enrichment(
                a.id,
                Enrichment {
                    document_type: "invoice".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let invoices = store
            .list(RecordQuery {
                document_type: Some("invoice".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(invoices.total, 1);
        assert_eq!(invoices.records[0].id, a.id);

        let everything = store
            .list(RecordQuery {
                document_type: Some("all".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(everything.total, 2);
    }

    #[tokio::test]
    async fn search_and_filter_compose() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let a = store
            .insert(new_record("a.png", "total due 45", 0.5))
            .await
            .unwrap();
        let b = store
            .insert(new_record("b.png", "total due 99", 0.5))
            .await
            .unwrap();
        for (id, ty) in [(a.id, "invoice"), (b.id, "receipt")] {
            store
                .apply_enrichment(
                    id,
                    Enrichment {
                        document_type: ty.to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let narrowed = store
            .list(RecordQuery {
                search: Some("total".to_string()),
                document_type: Some("receipt".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(narrowed.total, 1);
        assert_eq!(narrowed.records[0].id, b.id);
    }

    #[tokio::test]
    async fn delete_then_get_reports_not_found() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let record = store.insert(new_record("f.png", "x", 0.5)).await.unwrap();

        store.delete(record.id).await.unwrap();
        assert!(matches!(
            store.get(record.id).await.unwrap_err(),
            DocsiftError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn deleting_an_unknown_id_reports_not_found_without_side_effects() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.insert(new_record("f.png", "x", 0.5)).await.unwrap();

        assert!(matches!(
            store.delete(42).await.unwrap_err(),
            DocsiftError::NotFound(42)
        ));
        assert_eq!(store.stats().await.unwrap().total_records, 1);
    }

    #[tokio::test]
    async fn stats_agree_with_unfiltered_list() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.insert(new_record("a.png", "x", 0.8)).await.unwrap();
        store.insert(new_record("b.png", "y", 0.4)).await.unwrap();

        let stats = store.stats().await.unwrap();
        let page = store.list(RecordQuery::default()).await.unwrap();
        assert_eq!(stats.total_records, page.total);
        assert!((stats.average_confidence - 0.6).abs() < 1e-9);
        assert_eq!(stats.by_document_type["unknown"], 2);
    }

    #[tokio::test]
    async fn concurrent_inserts_never_collide_on_id() {
        let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert(NewRecord {
                        filename: format!("f{i}.png"),
                        stored_path: format!("uploads/f{i}.png"),
                        raw_text: String::new(),
                        confidence_score: 0.0,
                    })
                    .await
                    .unwrap()
                    .id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }

    #[tokio::test]
    async fn deleted_ids_are_never_reused() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let first = store.insert(new_record("a.png", "x", 0.5)).await.unwrap();
        store.delete(first.id).await.unwrap();

        let second = store.insert(new_record("b.png", "y", 0.5)).await.unwrap();
        assert!(second.id > first.id);
    }
}
