use crate::config::LlmSettings;
use crate::error::{LlmFailureKind, TriageError};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error, info};

pub mod claude;
pub mod openai;
pub mod prompts;

pub use claude::ClaudeProvider;
pub use openai::OpenAIProvider;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Error, Debug)]
pub enum AIError {
    #[error("API request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),
}

impl AIError {
    /// Classify the failure for the caller.
    ///
    /// 429 is a rate limit unless the body says the quota is exhausted;
    /// 402 is billing; 401/403 are credential problems.
    pub fn failure_kind(&self) -> LlmFailureKind {
        match self {
            AIError::HttpStatus { status, body } => {
                let body = body.to_lowercase();
                let quota = body.contains("quota") || body.contains("billing");
                match *status {
                    429 if quota => LlmFailureKind::QuotaExceeded,
                    429 => LlmFailureKind::RateLimited,
                    402 => LlmFailureKind::QuotaExceeded,
                    401 | 403 => LlmFailureKind::Unauthenticated,
                    _ => LlmFailureKind::Generic,
                }
            }
            AIError::RequestError(e) if e.status() == Some(StatusCode::TOO_MANY_REQUESTS) => {
                LlmFailureKind::RateLimited
            }
            _ => LlmFailureKind::Generic,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AIError::HttpStatus { status, .. } => Some(*status),
            AIError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<AIError> for TriageError {
    fn from(err: AIError) -> Self {
        let kind = err.failure_kind();
        let status = match kind {
            LlmFailureKind::Generic => err.status(),
            _ => kind.default_status(),
        };
        TriageError::LlmAnalysis {
            kind,
            status,
            message: err.to_string(),
        }
    }
}

/// One chat-style request: a system instruction and a user prompt.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider for a JSON object reply when it supports it.
    pub json_mode: bool,
}

#[async_trait::async_trait]
pub trait AIProvider: Send + Sync {
    /// Single attempt; no retry.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AIError>;
    fn get_provider_name(&self) -> &str;
}

pub fn create_provider(settings: &LlmSettings, api_key: &str) -> Result<Box<dyn AIProvider>, AIError> {
    info!("Creating AI provider: {} with model: {}", settings.provider, settings.model);
    match settings.provider.to_lowercase().as_str() {
        "openai" => {
            debug!("Initializing OpenAI provider");
            let base_url = settings.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            let provider = OpenAIProvider::new(api_key.to_string(), settings.timeout)?
                .with_model(settings.model.clone())
                .with_base_url(base_url);
            Ok(Box::new(provider))
        }
        "openrouter" => {
            debug!("Initializing OpenRouter provider (OpenAI-compatible)");
            let base_url = settings.base_url.as_deref().unwrap_or(OPENROUTER_BASE_URL);
            let provider = OpenAIProvider::new(api_key.to_string(), settings.timeout)?
                .with_model(settings.model.clone())
                .with_base_url(base_url)
                .with_name("openrouter");
            Ok(Box::new(provider))
        }
        "claude" | "anthropic" => {
            debug!("Initializing Claude/Anthropic provider");
            let mut provider = ClaudeProvider::new(api_key.to_string(), settings.timeout)?
                .with_model(settings.model.clone());
            if let Some(base_url) = settings.base_url.as_deref() {
                provider = provider.with_base_url(base_url);
            }
            Ok(Box::new(provider))
        }
        _ => {
            error!("Unsupported AI provider: {}", settings.provider);
            Err(AIError::UnsupportedProvider(settings.provider.clone()))
        }
    }
}
