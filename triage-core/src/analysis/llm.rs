use crate::ai_provider::prompts::SystemPromptGenerator;
use crate::ai_provider::{AIProvider, CompletionRequest};
use crate::error::{LlmFailureKind, Result, TriageError};
use crate::parser::ParsedLogs;
use crate::report::{now_timestamp, GeneratedBy, IncidentReport, Severity};
use serde::Deserialize;
use tracing::{debug, info, warn};

const RESPONSE_PREVIEW_CHARS: usize = 200;

/// Shape the model must return. Generation time and provenance are always
/// assigned by us; a model-supplied `timestamp` is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmReportPayload {
    title: String,
    summary: String,
    severity: Severity,
    root_cause: String,
    stack_frame_responsible: String,
    impact: String,
    fix_plan: String,
    prevention_plan: String,
    affected_components: Vec<String>,
}

impl LlmReportPayload {
    fn validate(&self) -> std::result::Result<(), String> {
        let fields = [
            ("title", &self.title),
            ("summary", &self.summary),
            ("rootCause", &self.root_cause),
            ("stackFrameResponsible", &self.stack_frame_responsible),
            ("impact", &self.impact),
            ("fixPlan", &self.fix_plan),
            ("preventionPlan", &self.prevention_plan),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(format!("field `{}` is empty", name)),
            None => Ok(()),
        }
    }

    fn into_report(self) -> IncidentReport {
        IncidentReport {
            title: self.title,
            summary: self.summary,
            severity: self.severity,
            root_cause: self.root_cause,
            stack_frame_responsible: self.stack_frame_responsible,
            impact: self.impact,
            fix_plan: self.fix_plan,
            prevention_plan: self.prevention_plan,
            affected_components: self.affected_components,
            timestamp: now_timestamp(),
            generated_by: GeneratedBy::Llm,
        }
    }
}

/// LLM report strategy. Holds no provider when no credential is configured
/// or the strategy is switched off.
pub struct LlmAnalyzer {
    provider: Option<Box<dyn AIProvider>>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmAnalyzer {
    pub fn new(provider: Box<dyn AIProvider>) -> Self {
        Self {
            provider: Some(provider),
            max_tokens: 1500,
            temperature: 0.3,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            provider: None,
            max_tokens: 1500,
            temperature: 0.3,
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Single attempt. Any failure is returned to the caller, which is
    /// expected to fall back.
    pub async fn analyze_with_llm(&self, parsed: &ParsedLogs) -> Result<IncidentReport> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            TriageError::LlmUnavailable("no API key configured for the LLM provider".to_string())
        })?;

        info!(
            provider = provider.get_provider_name(),
            errors = parsed.summary.error_count,
            warnings = parsed.summary.warning_count,
            "Analyzing logs with LLM"
        );

        let request = CompletionRequest {
            system: SystemPromptGenerator::system_prompt().to_string(),
            user: SystemPromptGenerator::create_analysis_prompt(parsed),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            json_mode: true,
        };
        debug!(prompt_chars = request.user.len(), "Built analysis prompt");

        let response = provider.complete(request).await.map_err(|e| {
            warn!(provider = provider.get_provider_name(), "LLM request failed: {}", e);
            TriageError::from(e)
        })?;

        let report = parse_llm_report(&response)?;
        info!(title = %report.title, severity = %report.severity, "LLM analysis completed");
        Ok(report)
    }
}

/// Strictly decode a model reply into an [`IncidentReport`].
///
/// Tolerates Markdown fences or prose around the JSON object; nothing else
/// is repaired.
pub fn parse_llm_report(response: &str) -> Result<IncidentReport> {
    let json = extract_json_object(response).ok_or_else(|| {
        TriageError::llm(
            LlmFailureKind::Generic,
            format!("response contains no JSON object: {}", preview(response)),
        )
    })?;

    let payload: LlmReportPayload = serde_json::from_str(json).map_err(|e| {
        TriageError::llm(
            LlmFailureKind::Generic,
            format!("failed to parse LLM response as incident report: {} ({})", e, preview(response)),
        )
    })?;

    payload.validate().map_err(|reason| {
        TriageError::llm(LlmFailureKind::Generic, format!("invalid incident report: {}", reason))
    })?;

    Ok(payload.into_report())
}

fn extract_json_object(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end).then(|| &unfenced[start..=end])
}

fn preview(text: &str) -> String {
    text.chars().take(RESPONSE_PREVIEW_CHARS).collect()
}
