use crate::error::{Result, TriageError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Size ceiling for sanitized logs, in characters.
pub const MAX_LOG_SIZE: usize = 20_000;

pub const TRUNCATION_MARKER: &str = "[... TRUNCATED - Logs exceeded 20KB limit ...]";

// CSI / VT100 sequences introduced by ESC or the single-byte C1 CSI.
static ANSI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x1b\x{9b}][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]")
        .expect("Failed to compile ANSI regex")
});

// Everything below 0x20 except tab and newline, plus DEL and the C1 range.
static CONTROL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x08\x0B-\x1F\x7F-\x{9F}]").expect("Failed to compile control regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeResult {
    pub sanitized_logs: String,
    /// Length of the raw input, in characters.
    pub original_length: usize,
    pub was_truncated: bool,
    pub ansi_codes_removed: usize,
}

/// Strip terminal noise from raw logs and bound their size.
///
/// Steps, in order: ANSI escape removal, CRLF to LF, control character
/// removal, right-trim of every line, boundary-aware truncation to
/// [`MAX_LOG_SIZE`], trim of the whole text.
pub fn sanitize(raw_logs: &str) -> Result<SanitizeResult> {
    if raw_logs.is_empty() {
        return Err(TriageError::Sanitization(
            "invalid log input: expected non-empty string".to_string(),
        ));
    }

    let original_length = raw_logs.chars().count();
    let ansi_codes_removed = ANSI_REGEX.find_iter(raw_logs).count();

    let without_ansi = ANSI_REGEX.replace_all(raw_logs, "");
    let normalized = without_ansi.replace("\r\n", "\n");
    let without_control = CONTROL_REGEX.replace_all(&normalized, "");

    let trimmed = without_control
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    let was_truncated = trimmed.chars().count() > MAX_LOG_SIZE;
    let bounded = if was_truncated {
        truncate_at_line_boundary(&trimmed)
    } else {
        trimmed
    };

    let sanitized_logs = bounded.trim().to_string();

    debug!(
        original_length,
        sanitized_length = sanitized_logs.len(),
        was_truncated,
        ansi_codes_removed,
        "Sanitized log input"
    );

    Ok(SanitizeResult {
        sanitized_logs,
        original_length,
        was_truncated,
        ansi_codes_removed,
    })
}

/// Byte entry point: rejects input that is not UTF-8 text.
pub fn sanitize_bytes(raw: &[u8]) -> Result<SanitizeResult> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        TriageError::Sanitization(format!("invalid log input: not UTF-8 text ({})", e))
    })?;
    sanitize(text)
}

/// Number of ANSI escape sequences left in `text`.
pub fn count_ansi_codes(text: &str) -> usize {
    ANSI_REGEX.find_iter(text).count()
}

fn truncate_at_line_boundary(text: &str) -> String {
    let cut = text
        .char_indices()
        .nth(MAX_LOG_SIZE)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let mut head = &text[..cut];

    // Only back off to a newline when it keeps at least 80% of the budget.
    if let Some(newline) = head.rfind('\n') {
        if head[..newline].chars().count() > MAX_LOG_SIZE * 4 / 5 {
            head = &head[..newline];
        }
    }

    format!("{}\n\n{}", head, TRUNCATION_MARKER)
}
