//! The ingestion orchestrator: validate -> store bytes -> OCR -> persist ->
//! enrich, with bounded concurrent fan-out over batches.
//!
//! Partial failure is the expected case, not an exception path: an OCR or
//! analysis failure degrades the record (empty text / missing enrichment)
//! instead of failing the upload, and one file in a batch never blocks or
//! rolls back another. Only validation (nothing persisted yet) and storage
//! failures surface as errors.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

use docsift_core::{DocsiftError, Enrichment, NewRecord, Record, RejectReason};
use docsift_storage::RecordStore;
use docsift_understanding::{DocumentAnalyzer, Extraction, TextExtractor, classify_keywords};

use crate::upload_store::UploadStore;
use crate::validate::{Upload, UploadPolicy, validate};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_file_bytes: usize,
    /// Cap on concurrent per-file runs within a batch, sized to avoid
    /// flooding the OCR/analysis backends.
    pub max_concurrent_jobs: usize,
    pub ocr_timeout: Duration,
    pub analysis_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_concurrent_jobs: 4,
            ocr_timeout: Duration::from_secs(60),
            analysis_timeout: Duration::from_secs(45),
        }
    }
}

/// Per-file result of a batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Succeeded { record: Record },
    Rejected { reason: RejectReason },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub filename: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// In submission order, regardless of completion order.
    pub results: Vec<BatchItem>,
}

/// Composes the validator, the two capability adapters, and the repository
/// for one file, and fans that out over batches with per-item isolation.
/// All collaborators are injected; there is no process-global state.
#[derive(Clone)]
pub struct IngestPipeline {
    extractor: Arc<dyn TextExtractor>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    store: Arc<dyn RecordStore>,
    uploads: UploadStore,
    policy: UploadPolicy,
    config: PipelineConfig,
    jobs: Arc<Semaphore>,
}

impl IngestPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        store: Arc<dyn RecordStore>,
        uploads: UploadStore,
        config: PipelineConfig,
    ) -> Self {
        let jobs = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        let policy = UploadPolicy {
            max_bytes: config.max_file_bytes,
        };
        Self {
            extractor,
            analyzer,
            store,
            uploads,
            policy,
            config,
            jobs,
        }
    }

    /// Run the full pipeline for one file.
    ///
    /// Rejection is the only path with zero persisted side effects. After the
    /// OCR stage the record exists regardless of extraction quality; an
    /// analysis failure leaves it with defaults rather than reverting it.
    pub async fn ingest(&self, upload: Upload) -> Result<Record, DocsiftError> {
        let mime = validate(&upload, &self.policy).map_err(DocsiftError::Rejected)?;

        let stored_path = self
            .uploads
            .save(&upload.filename, &upload.bytes)
            .await
            .map_err(|e| DocsiftError::Storage(e.to_string()))?;

        let extraction = match timeout(
            self.config.ocr_timeout,
            self.extractor.extract(&upload.bytes, mime),
        )
        .await
        {
            Ok(Ok(extraction)) => extraction,
            Ok(Err(e)) => {
                warn!(filename = %upload.filename, error = %e,
                      "OCR failed; recording empty extraction");
                Extraction::empty()
            }
            Err(_) => {
                warn!(filename = %upload.filename, "OCR timed out; recording empty extraction");
                Extraction::empty()
            }
        };

        // The "exists" point: from here on the upload is durable.
        let record = self
            .store
            .insert(NewRecord {
                filename: upload.filename,
                stored_path: stored_path.to_string_lossy().into_owned(),
                raw_text: extraction.text,
                confidence_score: extraction.confidence.clamp(0.0, 1.0),
            })
            .await?;

        if record.raw_text.trim().is_empty() {
            // Nothing to analyze; the record stays at its defaults.
            return Ok(record);
        }

        let hint = classify_keywords(&record.raw_text);
        match timeout(
            self.config.analysis_timeout,
            self.analyzer.analyze(&record.raw_text, Some(hint)),
        )
        .await
        {
            Ok(Ok(structured)) => {
                let enrichment = Enrichment {
                    document_type: structured.document_type,
                    entities: structured.entities,
                    analysis: Some(structured.analysis),
                };
                if let Err(e) = self.store.apply_enrichment(record.id, enrichment).await {
                    // The base record is already durable; treat a lost
                    // enrichment write as degradation, not failure.
                    error!(id = record.id, error = %e, "Failed to persist enrichment");
                }
            }
            Ok(Err(e)) => {
                warn!(id = record.id, error = %e,
                      "Analysis failed; record keeps OCR fields only");
            }
            Err(_) => {
                warn!(id = record.id, "Analysis timed out; record keeps OCR fields only");
            }
        }

        self.store.get(record.id).await
    }

    /// Run `ingest` for every file concurrently (bounded by the job
    /// semaphore) and report per-file outcomes in submission order.
    pub async fn ingest_batch(&self, uploads: Vec<Upload>) -> BatchReport {
        let total = uploads.len();
        let filenames: Vec<String> = uploads.iter().map(|u| u.filename.clone()).collect();

        let mut set = JoinSet::new();
        for (index, upload) in uploads.into_iter().enumerate() {
            let pipeline = self.clone();
            set.spawn(async move {
                let _permit = match pipeline.jobs.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            index,
                            FileOutcome::Failed {
                                error: "concurrency limiter closed".to_string(),
                            },
                        );
                    }
                };
                let outcome = match pipeline.ingest(upload).await {
                    Ok(record) => FileOutcome::Succeeded { record },
                    Err(DocsiftError::Rejected(reason)) => FileOutcome::Rejected { reason },
                    Err(e) => FileOutcome::Failed {
                        error: e.to_string(),
                    },
                };
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<FileOutcome>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(error = %e, "Ingest task panicked"),
            }
        }

        let results: Vec<BatchItem> = slots
            .into_iter()
            .zip(filenames)
            .map(|(outcome, filename)| BatchItem {
                filename,
                outcome: outcome.unwrap_or_else(|| FileOutcome::Failed {
                    error: "ingest task aborted".to_string(),
                }),
            })
            .collect();
        let succeeded = results
            .iter()
            .filter(|item| matches!(item.outcome, FileOutcome::Succeeded { .. }))
            .count();

        info!(total, succeeded, "Batch ingest complete");
        BatchReport {
            total,
            succeeded,
            results,
        }
    }
}
