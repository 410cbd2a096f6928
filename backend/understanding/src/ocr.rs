/// Text extraction boundary — reads dense text out of uploaded images.
///
/// The pipeline treats every implementation as fallible and slow; callers
/// absorb errors into the degraded (empty text, zero confidence) path rather
/// than failing the upload.
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// What an extractor hands back: the full text plus a scalar quality signal.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    /// In [0.0, 1.0].
    pub confidence: f64,
}

impl Extraction {
    /// The degraded result recorded when extraction fails or times out.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, image: &[u8], mime_type: &str) -> Result<Extraction>;
}

/// Configuration for [`VisionOcrClient`].
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Base URL for the Vision API (overridable so tests can point at a stub).
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl VisionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://vision.googleapis.com".to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Confidence reported when the vendor returns text but omits page scores.
const DEFAULT_CONFIDENCE: f64 = 0.85;

/// Google Cloud Vision `images:annotate` client (DOCUMENT_TEXT_DETECTION).
pub struct VisionOcrClient {
    client: Client,
    config: VisionConfig,
}

impl VisionOcrClient {
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    message: String,
}

#[async_trait]
impl TextExtractor for VisionOcrClient {
    async fn extract(&self, image: &[u8], _mime_type: &str) -> Result<Extraction> {
        let b64 = STANDARD.encode(image);
        let url = format!(
            "{}/v1/images:annotate?key={}",
            self.config.base_url, self.config.api_key
        );
        let body = serde_json::json!({
            "requests": [{
                "image": { "content": b64 },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }]
            }]
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            bail!("Vision API error: {}", resp.text().await.unwrap_or_default());
        }

        let annotate: AnnotateResponse = resp.json().await?;
        let Some(first) = annotate.responses.into_iter().next() else {
            return Ok(Extraction::empty());
        };
        if let Some(err) = first.error {
            bail!("Vision API error: {}", err.message);
        }

        // No annotation means a readable-but-textless image, not a failure.
        let Some(annotation) = first.full_text_annotation else {
            return Ok(Extraction::empty());
        };

        let confidence = page_confidence(&annotation.pages);
        debug!(
            chars = annotation.text.len(),
            confidence, "Vision OCR extraction complete"
        );

        Ok(Extraction {
            text: annotation.text,
            confidence,
        })
    }
}

/// Mean of the per-page confidences the vendor reports, defaulting when it
/// reports none, clamped to [0, 1].
fn page_confidence(pages: &[Page]) -> f64 {
    let scores: Vec<f64> = pages.iter().filter_map(|p| p.confidence).collect();
    if scores.is_empty() {
        return DEFAULT_CONFIDENCE;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_page_confidences() {
        let pages = vec![
            Page {
                confidence: Some(0.8),
            },
            Page {
                confidence: Some(0.6),
            },
        ];
        let c = page_confidence(&pages);
        assert!((c - 0.7).abs() < 1e-9);
    }

    #[test]
    fn defaults_when_vendor_omits_scores() {
        let pages = vec![Page { confidence: None }];
        assert_eq!(page_confidence(&pages), DEFAULT_CONFIDENCE);
        assert_eq!(page_confidence(&[]), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let pages = vec![Page {
            confidence: Some(1.7),
        }];
        assert_eq!(page_confidence(&pages), 1.0);
    }

    #[test]
    fn parses_annotate_response_shape() {
        let raw = r#"{
            "responses": [{
                "fullTextAnnotation": {
                    "text": "Invoice #102 Total $45",
                    "pages": [{ "confidence": 0.93 }]
                }
            }]
        }"#;
        let parsed: AnnotateResponse = serde_json::from_str(raw).unwrap();
        let annotation = parsed.responses[0].full_text_annotation.as_ref().unwrap();
        assert_eq!(annotation.text, "Invoice #102 Total $45");
        assert_eq!(annotation.pages[0].confidence, Some(0.93));
    }
}
