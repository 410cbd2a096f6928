pub mod mime_detect;
pub mod pipeline;
pub mod upload_store;
pub mod validate;

pub use pipeline::{BatchItem, BatchReport, FileOutcome, IngestPipeline, PipelineConfig};
pub use upload_store::UploadStore;
pub use validate::{Upload, UploadPolicy, validate};
