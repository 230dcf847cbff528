// Triage Library - log sanitization, parsing and incident report generation
//
// This library holds the whole pipeline so the CLI (and any other trigger
// source) only has to deliver raw logs and pick a configuration.

pub mod ai_provider;
pub mod analysis;
pub mod config;
pub mod error;
pub mod intake;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod sanitizer;

pub use ai_provider::{create_provider, AIError, AIProvider, ClaudeProvider, CompletionRequest, OpenAIProvider};
pub use analysis::{build_fallback_report, determine_severity, FallbackReason, GeneratedReport, LlmAnalyzer, ReportGenerator};
pub use config::{Config, LlmSettings, ReportSettings};
pub use error::{ErrorKind, LlmFailureKind, Result, TriageError};
pub use intake::LogPayload;
pub use output::{render_markdown, save_report, ReportDestination, ReportWriter};
pub use parser::{parse, LogEntry, LogLevel, LogSummary, ParsedLogs, RepeatedPattern, StackFrame};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineStage};
pub use report::{GeneratedBy, IncidentReport, Severity};
pub use sanitizer::{sanitize, sanitize_bytes, SanitizeResult};
