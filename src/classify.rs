//! Delegated entity/intent classifier.
//!
//! The classifier is an external language model reached over an
//! OpenAI-compatible chat-completions endpoint. Its output is untrusted:
//! the router re-normalizes and re-filters everything it returns.

use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::settings::Classifier as ClassifierSettings;

#[derive(Debug, Error)]
pub(crate) enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classifier returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("classifier returned no choices")]
    EmptyResponse,
    #[error("classifier response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RawEntities {
    pub(crate) zots: Vec<String>,
    pub(crate) bairros: Vec<String>,
    pub(crate) parametros: Vec<String>,
}

/// The classifier's JSON answer, taken verbatim before post-processing.
/// Every field is optional; the model omits what it does not fill in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct RawAnalysis {
    pub(crate) intent: String,
    pub(crate) strategy: String,
    pub(crate) entities: RawEntities,
    pub(crate) required_datasets: Vec<String>,
    pub(crate) confidence: f64,
    pub(crate) is_construction_query: bool,
    pub(crate) needs_risk_data: bool,
    #[serde(rename = "queryType")]
    pub(crate) query_kind: String,
    pub(crate) needs_clarification: bool,
    pub(crate) clarification_message: Option<String>,
}

/// The mock boundary around the language model.
#[async_trait]
pub(crate) trait Classify: Send + Sync {
    async fn classify(
        &self,
        query: &str,
        instructions: &str,
    ) -> Result<RawAnalysis, ClassifyError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// The model sometimes wraps its JSON in a markdown code fence.
fn extract_json(content: &str) -> &str {
    FENCED_JSON
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map_or(content, |m| m.as_str())
}

/// Classifier backed by an OpenAI-compatible `/v1/chat/completions` endpoint.
pub(crate) struct ChatClassifier {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl ChatClassifier {
    pub(crate) fn new(settings: &ClassifierSettings) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl Classify for ChatClassifier {
    async fn classify(
        &self,
        query: &str,
        instructions: &str,
    ) -> Result<RawAnalysis, ClassifyError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": instructions },
                { "role": "user", "content": format!("Analise esta consulta: \"{query}\"") },
            ],
            "temperature": 0.1,
            "max_tokens": 500,
        });

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ClassifyError::Status(response.status()));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or(ClassifyError::EmptyResponse)?;
        debug!(content, "classifier raw response");

        Ok(serde_json::from_str(extract_json(content))?)
    }
}
