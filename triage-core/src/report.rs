use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Badge used in the Markdown report.
    pub fn badge(&self) -> &'static str {
        match self {
            Severity::Low => "🟢 LOW",
            Severity::Medium => "🟡 MEDIUM",
            Severity::High => "🟠 HIGH",
            Severity::Critical => "🔴 CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedBy {
    Llm,
    Fallback,
}

impl GeneratedBy {
    pub fn is_fallback(&self) -> bool {
        matches!(self, GeneratedBy::Fallback)
    }

    pub fn description(&self) -> &'static str {
        match self {
            GeneratedBy::Llm => "AI-generated (LLM analysis)",
            GeneratedBy::Fallback => "Heuristic (fallback analysis, no LLM)",
        }
    }
}

impl fmt::Display for GeneratedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedBy::Llm => f.write_str("llm"),
            GeneratedBy::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub title: String,
    pub summary: String,
    pub severity: Severity,
    pub root_cause: String,
    pub stack_frame_responsible: String,
    pub impact: String,
    pub fix_plan: String,
    pub prevention_plan: String,
    pub affected_components: Vec<String>,
    /// ISO-8601 generation time.
    pub timestamp: String,
    pub generated_by: GeneratedBy,
}

/// Current time in the report timestamp format, e.g. `2024-01-01T00:00:00.000Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
