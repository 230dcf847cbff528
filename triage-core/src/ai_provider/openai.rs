use crate::ai_provider::{AIError, AIProvider, CompletionRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    response_type: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

/// Chat-completions client. Also serves OpenAI-compatible gateways via
/// [`OpenAIProvider::with_base_url`].
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    name: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String, timeout_secs: u64) -> Result<Self, AIError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
            api_key,
            model: "gpt-4".to_string(),
            base_url: super::OPENAI_BASE_URL.to_string(),
            name: "openai".to_string(),
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

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    fn build_request(&self, request: CompletionRequest) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: request.system,
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then(|| OpenAIResponseFormat {
                response_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AIError> {
        let openai_request = self.build_request(request);
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending completion request to {} with model {}", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
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

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AIError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AIError::InvalidResponse("Empty response from provider".to_string()))
    }

    fn get_provider_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json_mode: bool) -> CompletionRequest {
        CompletionRequest {
            system: "sys".to_string(),
            user: "usr".to_string(),
            max_tokens: 1500,
            temperature: 0.3,
            json_mode,
        }
    }

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test_key".to_string(), 30).unwrap();
        assert_eq!(provider.api_key, "test_key");
        assert_eq!(provider.model, "gpt-4");
        assert_eq!(provider.get_provider_name(), "openai");
    }

    #[test]
    fn test_openai_provider_with_model_and_base_url() {
        let provider = OpenAIProvider::new("test_key".to_string(), 30)
            .unwrap()
            .with_model("gpt-4o-mini".to_string())
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.model, "gpt-4o-mini");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_body_requests_json_object() {
        let provider = OpenAIProvider::new("k".to_string(), 30).unwrap();
        let body = serde_json::to_value(provider.build_request(request(true))).unwrap();

        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["max_tokens"], 1500);

        let body = serde_json::to_value(provider.build_request(request(false))).unwrap();
        assert!(body.get("response_format").is_none());
    }
}
