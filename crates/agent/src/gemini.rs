//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use otai_core::config::LlmConfig;
use otai_core::errors::ExchangeError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmClient};

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    endpoint: String,
    max_retries: u32,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, ExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| ExchangeError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.trim().to_string(),
            endpoint: config.endpoint.trim().trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.endpoint, self.model)
    }

    /// Confirms the key is accepted and the model exists.
    pub async fn check_model(&self) -> Result<(), ExchangeError> {
        let response = self
            .http
            .get(self.model_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::from_status(status.as_u16(), &body));
        }

        Ok(())
    }

    async fn generate_once(&self, request: &CompletionRequest) -> Result<String, ExchangeError> {
        let url = format!("{}:generateContent", self.model_url());
        debug!(
            event_name = "llm.gemini.request",
            model = %self.model,
            prompt_chars = request.prompt.len(),
            "sending generateContent request"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&build_request_body(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::from_status(status.as_u16(), &body));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(map_transport_error)?;
        extract_text(payload)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ExchangeError> {
        let mut attempt = 0u32;
        loop {
            match self.generate_once(request).await {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "llm.gemini.retry",
                        attempt,
                        max_retries = self.max_retries,
                        error_class = error.error_class(),
                        "retrying generateContent request"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn build_request_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": request.prompt }]
        }]
    });

    if let Some(system) = &request.system_instruction {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }

    body
}

fn map_transport_error(error: reqwest::Error) -> ExchangeError {
    if error.is_timeout() {
        ExchangeError::Timeout
    } else if error.is_decode() {
        ExchangeError::InvalidResponse(error.to_string())
    } else {
        ExchangeError::Transport(error.to_string())
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ExchangeError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        if let Some(reason) = response.prompt_feedback.and_then(|feedback| feedback.block_reason) {
            warn!(event_name = "llm.gemini.blocked", block_reason = %reason, "prompt was blocked");
        }
        return Err(ExchangeError::EmptyCompletion);
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason {
            debug!(event_name = "llm.gemini.empty", finish_reason = %reason, "candidate had no text");
        }
        return Err(ExchangeError::EmptyCompletion);
    }

    Ok(text)
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}
