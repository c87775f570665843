//! LLM-backed scraping service (translation and structured extraction).
//!
//! Thin client over the OpenAI chat completions API. Structured extraction
//! uses the `json_schema` response format so the model is constrained to
//! the caller's schema. Migrations are the only consumers; the execution
//! engine never calls this itself.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::kernel::traits::BaseScrapingService;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone)]
pub struct OpenAiScrapingService {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiScrapingService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    /// Set a custom base URL (for proxies or compatible providers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn chat(&self, body: JsonValue) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                anyhow!("OpenAI request failed: {e}")
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            bail!("OpenAI API error ({status}): {error_text}");
        }

        let chat_response: ChatResponseRaw = response.json().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response from OpenAI"))
    }
}

#[async_trait]
impl BaseScrapingService for OpenAiScrapingService {
    async fn generate_text(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt.to_string(),
        });

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(t) = temperature {
            body["temperature"] = json!(t);
        }

        debug!(model = %self.model, "OpenAI text generation");
        self.chat(body).await
    }

    async fn extract_structured_data(
        &self,
        text: &str,
        schema: JsonValue,
        instructions: &str,
    ) -> Result<JsonValue> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": instructions },
                { "role": "user", "content": text },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "extraction",
                    "strict": true,
                    "schema": schema,
                },
            },
        });

        debug!(model = %self.model, "OpenAI structured extraction");
        let content = self.chat(body).await?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse structured response: {e}"))
    }
}

/// Placeholder used when no LLM credentials are configured. Migrations that
/// don't translate or extract run normally; those that do fail with a clear
/// message instead of a missing-credential surprise at request time.
pub struct NullScrapingService;

#[async_trait]
impl BaseScrapingService for NullScrapingService {
    async fn generate_text(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
        _temperature: Option<f32>,
    ) -> Result<String> {
        bail!("scraping service is not configured (set OPENAI_API_KEY)")
    }

    async fn extract_structured_data(
        &self,
        _text: &str,
        _schema: JsonValue,
        _instructions: &str,
    ) -> Result<JsonValue> {
        bail!("scraping service is not configured (set OPENAI_API_KEY)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let service = OpenAiScrapingService::new("sk-test", "gpt-4o-mini")
            .with_base_url("https://custom.api.com");

        assert_eq!(service.api_key, "sk-test");
        assert_eq!(service.base_url, "https://custom.api.com");
    }
}
