use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed model parameters, set once at startup and never per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string(),
            temperature: 0.1,
            max_tokens: 500,
        }
    }
}

/// Text-generation service: one prompt in, one completion out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat-completions endpoint (Together AI by default).
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    settings: GenerationSettings,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String, settings: GenerationSettings) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
            http: reqwest::Client::new(),
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.settings.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens
        })
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.settings.model, prompt_chars = prompt.len(), "calling LLM");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| AssistantError::Generation(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Generation(format!(
                "LLM API returned {}: {}",
                status,
                body.trim()
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Generation(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AssistantError::Generation("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}
