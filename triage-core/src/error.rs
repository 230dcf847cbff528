//! Pipeline error taxonomy.
//!
//! Every stage surfaces failures through [`TriageError`]. Callers branch on
//! [`TriageError::kind`] rather than on message text: LLM failures are
//! recoverable (the fallback report takes over), everything else ends the run.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a text-generation call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmFailureKind {
    RateLimited,
    QuotaExceeded,
    Unauthenticated,
    Generic,
}

impl LlmFailureKind {
    /// Conventional status code for the failure, when there is one.
    pub fn default_status(&self) -> Option<u16> {
        match self {
            LlmFailureKind::RateLimited => Some(429),
            LlmFailureKind::QuotaExceeded => Some(402),
            LlmFailureKind::Unauthenticated => Some(401),
            LlmFailureKind::Generic => None,
        }
    }
}

impl fmt::Display for LlmFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmFailureKind::RateLimited => "rate_limited",
            LlmFailureKind::QuotaExceeded => "quota_exceeded",
            LlmFailureKind::Unauthenticated => "unauthenticated",
            LlmFailureKind::Generic => "generic",
        };
        f.write_str(s)
    }
}

/// Discriminant of [`TriageError`], cheap to copy into logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Sanitization,
    Parse,
    LlmUnavailable,
    LlmAnalysis,
    FileWrite,
    Render,
    Config,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Sanitization => "LOG_SANITIZATION_ERROR",
            ErrorKind::Parse => "LOG_PARSE_ERROR",
            ErrorKind::LlmUnavailable => "LLM_UNAVAILABLE",
            ErrorKind::LlmAnalysis => "LLM_ANALYSIS_ERROR",
            ErrorKind::FileWrite => "FILE_WRITE_ERROR",
            ErrorKind::Render => "REPORT_RENDER_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("invalid log payload: {0}")]
    Validation(String),

    #[error("failed to sanitize logs: {0}")]
    Sanitization(String),

    #[error("failed to parse logs: {0}")]
    Parse(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM analysis failed ({kind}): {message}")]
    LlmAnalysis {
        kind: LlmFailureKind,
        status: Option<u16>,
        message: String,
    },

    #[error("failed to write report to {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render report: {0}")]
    Render(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TriageError {
    pub fn llm(kind: LlmFailureKind, message: impl Into<String>) -> Self {
        TriageError::LlmAnalysis {
            kind,
            status: kind.default_status(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TriageError::Validation(_) => ErrorKind::Validation,
            TriageError::Sanitization(_) => ErrorKind::Sanitization,
            TriageError::Parse(_) => ErrorKind::Parse,
            TriageError::LlmUnavailable(_) => ErrorKind::LlmUnavailable,
            TriageError::LlmAnalysis { .. } => ErrorKind::LlmAnalysis,
            TriageError::FileWrite { .. } => ErrorKind::FileWrite,
            TriageError::Render(_) => ErrorKind::Render,
            TriageError::Config(_) => ErrorKind::Config,
        }
    }

    /// Numeric subcode for LLM failures (HTTP-like).
    pub fn status_code(&self) -> Option<u16> {
        match self {
            TriageError::LlmAnalysis { status, .. } => *status,
            _ => None,
        }
    }

    pub fn llm_failure(&self) -> Option<LlmFailureKind> {
        match self {
            TriageError::LlmAnalysis { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True when the fallback report may stand in for the failed stage.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LlmUnavailable | ErrorKind::LlmAnalysis
        )
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
