use thiserror::Error;

/// Why an upload was refused before any processing happened.
///
/// Rejections are pre-pipeline: nothing is persisted for a rejected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The uploaded payload had zero bytes.
    Empty,
    /// The payload exceeded the configured size cap.
    TooLarge,
    /// The file extension is not in the raster-image allow-list.
    UnsupportedType,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::Empty => "empty",
            RejectReason::TooLarge => "too_large",
            RejectReason::UnsupportedType => "unsupported_type",
        };
        f.write_str(s)
    }
}

/// Top-level error type for the DocSift runtime.
#[derive(Debug, Error)]
pub enum DocsiftError {
    #[error("upload rejected: {0}")]
    Rejected(RejectReason),

    #[error("OCR provider error: {0}")]
    Extraction(String),

    #[error("analysis provider error: {0}")]
    Analysis(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("record not found: {0}")]
    NotFound(i64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
