use serde::Deserialize;

/// DocSift runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    /// Directory for stored upload bytes
    pub upload_dir: String,
    /// Directory for rolling NDJSON logs
    pub log_dir: String,
    /// Log level
    pub log_level: String,
    /// API key shared by the Vision and Gemini backends
    pub google_api_key: Option<String>,
    /// Vision API base URL (overridable for stubs)
    pub vision_base_url: String,
    /// Gemini API base URL (overridable for stubs)
    pub gemini_base_url: String,
    /// Gemini model id
    pub gemini_model: String,
    /// Per-file upload cap in megabytes
    pub max_file_mb: usize,
    /// Concurrent per-file pipeline runs within a batch
    pub max_concurrent_jobs: usize,
    pub ocr_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            db_path: "docsift.db".to_string(),
            upload_dir: "uploads".to_string(),
            log_dir: "logs".to_string(),
            log_level: "info".to_string(),
            google_api_key: None,
            vision_base_url: "https://vision.googleapis.com".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            max_file_mb: 10,
            max_concurrent_jobs: 4,
            ocr_timeout_secs: 60,
            analysis_timeout_secs: 45,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: std::env::var("DOCSIFT_BIND").unwrap_or(defaults.bind_address),
            port: parse_env("DOCSIFT_PORT").unwrap_or(defaults.port),
            db_path: std::env::var("DOCSIFT_DB").unwrap_or(defaults.db_path),
            upload_dir: std::env::var("DOCSIFT_UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            log_dir: std::env::var("DOCSIFT_LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
            vision_base_url: std::env::var("DOCSIFT_VISION_URL").unwrap_or(defaults.vision_base_url),
            gemini_base_url: std::env::var("DOCSIFT_GEMINI_URL").unwrap_or(defaults.gemini_base_url),
            gemini_model: std::env::var("DOCSIFT_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            max_file_mb: parse_env("DOCSIFT_MAX_FILE_MB").unwrap_or(defaults.max_file_mb),
            max_concurrent_jobs: parse_env("DOCSIFT_MAX_CONCURRENT")
                .unwrap_or(defaults.max_concurrent_jobs),
            ocr_timeout_secs: parse_env("DOCSIFT_OCR_TIMEOUT_SECS")
                .unwrap_or(defaults.ocr_timeout_secs),
            analysis_timeout_secs: parse_env("DOCSIFT_ANALYSIS_TIMEOUT_SECS")
                .unwrap_or(defaults.analysis_timeout_secs),
        }
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_mb * 1024 * 1024
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
