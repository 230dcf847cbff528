use crate::ai_provider::{AIError, AIProvider, CompletionRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, timeout_secs: u64) -> Result<Self, AIError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
            api_key,
            model: "claude-3-5-haiku-latest".to_string(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl AIProvider for ClaudeProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AIError> {
        // The messages API has no JSON mode; the system prompt carries the contract.
        let claude_request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: request.user,
            }],
        };

        let url = format!("{}/messages", self.base_url);
        debug!("Sending messages request to {} with model {}", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&claude_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AIError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| AIError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text: String = claude_response
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(AIError::InvalidResponse("No content in response".to_string()));
        }
        Ok(text)
    }

    fn get_provider_name(&self) -> &str {
        "claude"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_provider_creation() {
        let provider = ClaudeProvider::new("test_key".to_string(), 30).unwrap();
        assert_eq!(provider.api_key, "test_key");
        assert_eq!(provider.model, "claude-3-5-haiku-latest");
        assert_eq!(provider.base_url, ANTHROPIC_BASE_URL);
    }

    #[test]
    fn test_claude_provider_with_model() {
        let provider = ClaudeProvider::new("test_key".to_string(), 30)
            .unwrap()
            .with_model("claude-3-opus-20240229".to_string());
        assert_eq!(provider.model, "claude-3-opus-20240229");
    }
}
