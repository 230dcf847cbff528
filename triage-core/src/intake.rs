use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};

/// Upper bound on accepted payloads, in characters.
pub const MAX_PAYLOAD_CHARS: usize = 100_000;

/// Inbound request body: `{"logs": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPayload {
    pub logs: String,
}

impl LogPayload {
    pub fn new(logs: impl Into<String>) -> Self {
        Self { logs: logs.into() }
    }

    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| TriageError::Validation(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        check_bounds(self.logs.chars().count())
    }
}

/// Intake bounds on a log body of `chars` characters.
pub fn check_bounds(chars: usize) -> Result<()> {
    if chars == 0 {
        return Err(TriageError::Validation("logs must not be empty".to_string()));
    }
    if chars > MAX_PAYLOAD_CHARS {
        return Err(TriageError::Validation(format!(
            "logs exceed {} characters ({} received)",
            MAX_PAYLOAD_CHARS, chars
        )));
    }
    Ok(())
}
