mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use docsift_gateway::{build_router, AppState};
use docsift_ingest::{IngestPipeline, PipelineConfig, UploadStore};
use docsift_storage::{QueryService, RecordStore, SqliteRecordStore};
use docsift_understanding::{
    DocumentAnalyzer, GeminiAnalyzer, GeminiConfig, TextExtractor, VisionConfig, VisionOcrClient,
};

use config::Config;

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "DocSift — image OCR ingestion and enrichment service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the DocSift HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show current server status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/health", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("docsift server is not running on port {}", config.port);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    logging::init_logging(&config.log_dir, &config.log_level);

    let Some(api_key) = config.google_api_key.clone() else {
        bail!("GOOGLE_API_KEY is not set; the OCR and analysis backends require it");
    };

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(&config.db_path)?);
    let uploads = UploadStore::init(&config.upload_dir).await?;

    let extractor: Arc<dyn TextExtractor> = Arc::new(VisionOcrClient::new(VisionConfig {
        base_url: config.vision_base_url.clone(),
        api_key: api_key.clone(),
        timeout: Duration::from_secs(config.ocr_timeout_secs),
    })?);
    let analyzer: Arc<dyn DocumentAnalyzer> = Arc::new(GeminiAnalyzer::new(GeminiConfig {
        base_url: config.gemini_base_url.clone(),
        model: config.gemini_model.clone(),
        api_key,
        timeout: Duration::from_secs(config.analysis_timeout_secs),
    })?);

    let pipeline = IngestPipeline::new(
        extractor,
        analyzer.clone(),
        store.clone(),
        uploads,
        PipelineConfig {
            max_file_bytes: config.max_file_bytes(),
            max_concurrent_jobs: config.max_concurrent_jobs,
            ocr_timeout: Duration::from_secs(config.ocr_timeout_secs),
            analysis_timeout: Duration::from_secs(config.analysis_timeout_secs),
        },
    );

    let state = Arc::new(AppState {
        pipeline,
        query: QueryService::new(store.clone()),
        store,
        analyzer,
        max_file_bytes: config.max_file_bytes(),
    });

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.bind_address, config.port);
    info!(addr = %addr, db = %config.db_path, uploads = %config.upload_dir, "DocSift server starting");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
