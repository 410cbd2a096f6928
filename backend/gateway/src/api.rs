use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use docsift_core::DocsiftError;
use docsift_ingest::{IngestPipeline, Upload};
use docsift_storage::{QueryService, RecordStore, export_csv, export_json};
use docsift_understanding::{DocumentAnalyzer, classify_keywords};

/// Shared application state for API handlers.
pub struct AppState {
    pub pipeline: IngestPipeline,
    pub query: QueryService,
    pub store: Arc<dyn RecordStore>,
    pub analyzer: Arc<dyn DocumentAnalyzer>,
    pub max_file_bytes: usize,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Batch uploads carry several files per request; leave headroom above the
    // per-file cap for the multipart framing.
    let body_limit = state.max_file_bytes * 8 + 1024 * 1024;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/batch-upload", post(batch_upload))
        .route("/api/records", get(list_records))
        .route("/api/records/:id", get(get_record).delete(delete_record))
        .route("/api/analyze", post(analyze))
        .route("/api/export", get(export))
        .route("/api/stats", get(stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

fn error_response(err: DocsiftError) -> Response {
    match err {
        DocsiftError::Rejected(reason) => {
            fail(StatusCode::BAD_REQUEST, format!("upload rejected: {reason}"))
        }
        DocsiftError::NotFound(id) => {
            fail(StatusCode::NOT_FOUND, format!("record {id} not found"))
        }
        other => {
            error!(error = %other, "Request failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "service": "docsift",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Pull every file part out of a multipart payload.
async fn collect_uploads(mut multipart: Multipart) -> Result<Vec<Upload>, Response> {
    let mut uploads = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                // Parts without a filename are form values, not files.
                let Some(filename) = field.file_name().map(|s| s.to_string()) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(bytes) => uploads.push(Upload {
                        filename,
                        bytes: bytes.to_vec(),
                    }),
                    Err(e) => {
                        return Err(fail(
                            StatusCode::BAD_REQUEST,
                            format!("malformed multipart field: {e}"),
                        ));
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return Err(fail(
                    StatusCode::BAD_REQUEST,
                    format!("malformed multipart payload: {e}"),
                ));
            }
        }
    }
    Ok(uploads)
}

/// POST /api/upload — single file.
async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let uploads = match collect_uploads(multipart).await {
        Ok(uploads) => uploads,
        Err(resp) => return resp,
    };
    let Some(upload) = uploads.into_iter().next() else {
        return fail(StatusCode::BAD_REQUEST, "no file provided");
    };

    match state.pipeline.ingest(upload).await {
        Ok(record) => Json(json!({ "success": true, "record": record })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/batch-upload — many files, per-file outcomes.
async fn batch_upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let uploads = match collect_uploads(multipart).await {
        Ok(uploads) => uploads,
        Err(resp) => return resp,
    };
    if uploads.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "no files provided");
    }

    let report = state.pipeline.ingest_batch(uploads).await;
    Json(json!({
        "success": true,
        "total": report.total,
        "succeeded": report.succeeded,
        "results": report.results,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct ListParams {
    search: Option<String>,
    #[serde(rename = "type")]
    document_type: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

/// GET /api/records — paginated listing with optional search/filter.
async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Response {
    match state
        .query
        .search(
            params.search,
            params.document_type,
            params.limit,
            params.offset,
        )
        .await
    {
        Ok(page) => Json(json!({
            "success": true,
            "records": page.records,
            "count": page.records.len(),
            "total": page.total,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/records/:id — full record including entities and analysis.
async fn get_record(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.get(id).await {
        Ok(record) => Json(json!({ "success": true, "record": record })).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/records/:id
async fn delete_record(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.delete(id).await {
        Ok(()) => Json(json!({ "success": true, "message": "record deleted" })).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    text: String,
    document_type: Option<String>,
}

/// POST /api/analyze — run the structuring adapter on raw text.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "no text provided");
    }
    let hint = req
        .document_type
        .unwrap_or_else(|| classify_keywords(&req.text).to_string());

    match state.analyzer.analyze(&req.text, Some(&hint)).await {
        Ok(structured) => Json(json!({
            "success": true,
            "documentType": structured.document_type,
            "entities": structured.entities,
            "analysis": structured.analysis,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Ad-hoc analysis failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ExportParams {
    format: Option<String>,
}

/// GET /api/export?format=json|csv — full record set as a download.
async fn export(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> Response {
    let format = params.format.unwrap_or_else(|| "json".to_string());
    let result = match format.as_str() {
        "json" => export_json(state.store.as_ref())
            .await
            .map(|body| ("application/json", "records.json", body)),
        "csv" => export_csv(state.store.as_ref())
            .await
            .map(|body| ("text/csv", "records.csv", body)),
        _ => {
            return fail(
                StatusCode::BAD_REQUEST,
                "invalid format; expected json or csv",
            );
        }
    };

    match result {
        Ok((content_type, filename, body)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/stats
async fn stats(State(state): State<Arc<AppState>>) -> Response {
    match state.query.stats().await {
        Ok(stats) => Json(json!({ "success": true, "stats": stats })).into_response(),
        Err(e) => error_response(e),
    }
}
