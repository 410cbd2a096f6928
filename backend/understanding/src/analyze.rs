/// Document structuring boundary — turns extracted text into a classification,
/// an entity map, and a free-form analysis payload using a generative model.
///
/// Model replies are prose-with-JSON; the parser lifts the JSON object out and
/// normalizes it so downstream consumers never branch on the reply shape.
use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use crate::entity::fallback_entities;

/// Normalized analyzer output.
#[derive(Debug, Clone)]
pub struct Structured {
    pub document_type: String,
    /// Category -> values; empty categories are never present.
    pub entities: BTreeMap<String, Vec<String>>,
    /// Opaque payload (summary, insights) persisted as-is.
    pub analysis: Value,
}

#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str, type_hint: Option<&str>) -> Result<Structured>;
}

/// Configuration for [`GeminiAnalyzer`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(45),
        }
    }
}

/// Replies shorter than this carry no structure worth a model round trip.
const MIN_ANALYZABLE_CHARS: usize = 10;

pub struct GeminiAnalyzer {
    client: Client,
    config: GeminiConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DocumentAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, text: &str, type_hint: Option<&str>) -> Result<Structured> {
        if text.trim().len() < MIN_ANALYZABLE_CHARS {
            bail!("text too short for analysis");
        }

        let prompt = build_prompt(text, type_hint);
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            bail!("Gemini error: {}", resp.text().await.unwrap_or_default());
        }

        let reply: Value = resp.json().await?;
        let answer = reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();
        if answer.trim().is_empty() {
            bail!("Gemini returned an empty candidate");
        }

        debug!(chars = answer.len(), "Gemini analysis reply received");
        Ok(parse_structured(&answer, text, type_hint))
    }
}

fn build_prompt(text: &str, type_hint: Option<&str>) -> String {
    let doc_type = type_hint.unwrap_or("document");
    let guidance = match doc_type {
        "receipt" => {
            "Focus on: store name, date and time, items purchased, subtotal, tax and total \
             amounts, payment method, receipt number."
        }
        "form" => {
            "Focus on: form title, every field name and value, dates, and any signatures."
        }
        _ => {
            "Focus on: main topic, key points, important dates, named people and \
             organizations, and any action items or deadlines."
        }
    };

    format!(
        "Analyze the following {doc_type} and extract structured information. {guidance}\n\n\
         Document text:\n{text}\n\n\
         Respond with a single JSON object using exactly these keys:\n\
         {{\"documentType\": \"receipt|invoice|form|letter|contract|note|document\", \
         \"entities\": {{\"names\": [], \"dates\": [], \"amounts\": [], \"addresses\": [], \
         \"phone_numbers\": [], \"emails\": [], \"other\": []}}, \
         \"summary\": \"2-3 sentence summary\", \"insights\": []}}"
    )
}

static JSON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Normalize a model reply into a [`Structured`] result.
///
/// JSON is lifted out of surrounding prose/code fences; when no JSON object
/// can be parsed the raw reply becomes the summary and the regex extractor
/// supplies the entities.
fn parse_structured(reply: &str, source_text: &str, type_hint: Option<&str>) -> Structured {
    let parsed: Option<Value> = JSON_RE
        .find(reply)
        .and_then(|m| serde_json::from_str(m.as_str()).ok());

    let Some(obj) = parsed else {
        return Structured {
            document_type: type_hint.unwrap_or("unknown").to_string(),
            entities: fallback_entities(source_text),
            analysis: json!({ "summary": reply.trim(), "structured": false }),
        };
    };

    let document_type = obj
        .get("documentType")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| type_hint.unwrap_or("unknown").to_string());

    let mut entities = entity_map(obj.get("entities"));
    if entities.is_empty() {
        entities = fallback_entities(source_text);
    }

    let mut analysis = serde_json::Map::new();
    if let Some(summary) = obj.get("summary").and_then(|v| v.as_str()) {
        if !summary.trim().is_empty() {
            analysis.insert("summary".to_string(), Value::String(summary.trim().to_string()));
        }
    }
    match obj.get("insights") {
        Some(insights) if !insights.is_null() => {
            analysis.insert("insights".to_string(), insights.clone());
        }
        _ => {}
    }
    if analysis.is_empty() {
        analysis.insert("summary".to_string(), Value::String(reply.trim().to_string()));
        analysis.insert("structured".to_string(), Value::Bool(false));
    }

    Structured {
        document_type,
        entities,
        analysis: Value::Object(analysis),
    }
}

/// Coerce the model's entity object into category -> non-empty string lists.
fn entity_map(value: Option<&Value>) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    let Some(Value::Object(map)) = value else {
        return out;
    };
    for (category, v) in map {
        let values: Vec<String> = match v {
            Value::Array(items) => items.iter().filter_map(stringify).collect(),
            other => stringify(other).into_iter().collect(),
        };
        if !values.is_empty() {
            out.insert(category.clone(), values);
        }
    }
    out
}

fn stringify(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
