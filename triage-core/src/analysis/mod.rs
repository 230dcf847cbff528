//! Report generation: LLM first, deterministic fallback on any LLM failure.

pub mod fallback;
pub mod llm;

pub use fallback::{build_fallback_report, determine_severity};
pub use llm::{parse_llm_report, LlmAnalyzer};

use crate::error::TriageError;
use crate::parser::ParsedLogs;
use crate::report::IncidentReport;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Why the fallback strategy produced the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FallbackReason {
    /// The LLM strategy is switched off.
    MockMode,
    /// The LLM strategy failed with this error code and message.
    LlmFailed {
        code: String,
        status: Option<u16>,
        message: String,
    },
}

impl From<&TriageError> for FallbackReason {
    fn from(err: &TriageError) -> Self {
        FallbackReason::LlmFailed {
            code: err.kind().code().to_string(),
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::MockMode => f.write_str("MOCK_MODE: LLM analysis skipped"),
            FallbackReason::LlmFailed { code, message, .. } => write!(f, "{}: {}", code, message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub report: IncidentReport,
    pub fallback_reason: Option<FallbackReason>,
}

impl GeneratedReport {
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

pub struct ReportGenerator {
    analyzer: LlmAnalyzer,
    llm_enabled: bool,
}

impl ReportGenerator {
    pub fn new(analyzer: LlmAnalyzer, llm_enabled: bool) -> Self {
        Self {
            analyzer,
            llm_enabled,
        }
    }

    /// Fallback only; the LLM is never called.
    pub fn fallback_only() -> Self {
        Self::new(LlmAnalyzer::unavailable(), false)
    }

    /// True when runs will attempt the LLM before falling back.
    pub fn llm_available(&self) -> bool {
        self.llm_enabled && self.analyzer.is_available()
    }

    /// Always yields a report once parsing has succeeded.
    pub async fn generate(&self, parsed: &ParsedLogs) -> GeneratedReport {
        if !self.llm_enabled {
            info!("LLM analysis disabled (mock mode), building fallback report");
            return Self::fallback(parsed, FallbackReason::MockMode);
        }

        match self.analyzer.analyze_with_llm(parsed).await {
            Ok(report) => GeneratedReport {
                report,
                fallback_reason: None,
            },
            Err(err) => {
                warn!(
                    code = err.kind().code(),
                    status = ?err.status_code(),
                    "LLM analysis failed, building fallback report: {}",
                    err
                );
                Self::fallback(parsed, FallbackReason::from(&err))
            }
        }
    }

    fn fallback(parsed: &ParsedLogs, reason: FallbackReason) -> GeneratedReport {
        let report = build_fallback_report(parsed);
        info!(title = %report.title, severity = %report.severity, "Fallback report generated");
        GeneratedReport {
            report,
            fallback_reason: Some(reason),
        }
    }
}
