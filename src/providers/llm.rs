use crate::config::{Config, LlmProviderKind};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

const LLM_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned no text")]
    EmptyResponse,
}

/// Text-in, text-out completion. Callers own prompt construction and output parsing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

pub fn build_llm_client(config: &Config, http: Client) -> Option<Arc<dyn LlmClient>> {
    let Some(api_key) = config.llm_api_key() else {
        tracing::warn!(
            provider = ?config.llm_provider,
            "LLM API key not set; question generation disabled"
        );
        return None;
    };
    let api_key = api_key.to_string();
    let client: Arc<dyn LlmClient> = match config.llm_provider {
        LlmProviderKind::Gemini => {
            Arc::new(GeminiClient::new(api_key, config.llm_model.clone(), http))
        }
        LlmProviderKind::OpenAi => {
            Arc::new(OpenAiClient::new(api_key, config.llm_model.clone(), http))
        }
    };
    Some(client)
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>, client: Client) -> Self {
        Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| "gemini-1.5-flash".to_string()),
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let payload = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ]
        });

        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .timeout(LLM_TIMEOUT)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let body: JsonValue = res.json().await?;
        gemini_text(&body).ok_or(LlmError::EmptyResponse)
    }
}

fn gemini_text(body: &JsonValue) -> Option<String> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: Option<String>, client: Client) -> Self {
        Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| "gpt-4o".to_string()),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.7
        });

        let res = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(LLM_TIMEOUT)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let body: JsonValue = res.json().await?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_gemini_candidate_parts() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [ { "text": "[{\"content\":" }, { "text": " \"Q\"}]" } ] } }
            ]
        });
        assert_eq!(gemini_text(&body).as_deref(), Some("[{\"content\": \"Q\"}]"));
    }

    #[test]
    fn gemini_without_candidates_is_empty() {
        assert_eq!(gemini_text(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })), None);
        assert_eq!(
            gemini_text(&json!({
                "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
            })),
            None
        );
    }
}
