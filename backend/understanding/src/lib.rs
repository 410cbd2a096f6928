pub mod analyze;
pub mod classify;
pub mod entity;
pub mod ocr;

pub use analyze::{DocumentAnalyzer, GeminiAnalyzer, GeminiConfig, Structured};
pub use classify::classify_keywords;
pub use entity::fallback_entities;
pub use ocr::{Extraction, TextExtractor, VisionConfig, VisionOcrClient};
