use crate::error::{Result, TriageError};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

const MAX_REPEATED_PATTERNS: usize = 5;
const MAX_PATTERN_LENGTH: usize = 100;

// Compile regexes once at startup for performance
static ERROR_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{4}-\d{2}-\d{2}[T\s]\d{2}:\d{2}:\d{2}(?:[.,]\d{3})?(?:Z|[+-]\d{2}:?\d{2})?\s*)?\[?ERROR\]?[\s:\]]*(.+)$",
    )
    .expect("Failed to compile error line regex")
});

static WARN_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{4}-\d{2}-\d{2}[T\s]\d{2}:\d{2}:\d{2}(?:[.,]\d{3})?(?:Z|[+-]\d{2}:?\d{2})?\s*)?\[?WARN(?:ING)?\]?[\s:\]]*(.+)$",
    )
    .expect("Failed to compile warn line regex")
});

// at fn (file:line:col) | at file:line:col
static STACK_FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+(?:(.+?)\s+\()?([^()]+?):(\d+)(?::(\d+))?\)?$")
        .expect("Failed to compile stack frame regex")
});

static FILE_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/[\w.-]+)+\.[a-zA-Z]{1,4}(?::\d+(?::\d+)?)?")
        .expect("Failed to compile file path regex")
});

static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T\s]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("Failed to compile timestamp regex")
});

static UUID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}")
        .expect("Failed to compile UUID regex")
});

static HEX_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-f0-9]{24,}\b").expect("Failed to compile hex id regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Leading timestamp of the line, empty when the line has none.
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub full_line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub method: String,
    pub file: String,
    pub line: u32,
    pub column: Option<u32>,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} ({}:{}", self.method, self.file, self.line)?;
        if let Some(column) = self.column {
            write!(f, ":{}", column)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedPattern {
    pub pattern: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_lines: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub has_stack_trace: bool,
}

/// Structured view of one sanitized log blob. Built once by [`parse`] and
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLogs {
    pub errors: Vec<LogEntry>,
    pub warnings: Vec<LogEntry>,
    pub stack_frames: Vec<StackFrame>,
    /// Distinct paths in first-seen order, `:line:col` suffix stripped.
    pub file_paths: Vec<String>,
    pub repeated_patterns: Vec<RepeatedPattern>,
    pub raw_logs: String,
    pub summary: LogSummary,
}

impl ParsedLogs {
    pub fn primary_error(&self) -> Option<&LogEntry> {
        self.errors.first()
    }

    /// First frame of the trace, usually the culprit.
    pub fn primary_stack_frame(&self) -> Option<&StackFrame> {
        self.stack_frames.first()
    }
}

pub fn parse(sanitized_logs: &str) -> Result<ParsedLogs> {
    if sanitized_logs.trim().is_empty() {
        return Err(TriageError::Parse(
            "invalid log input: expected non-empty string".to_string(),
        ));
    }

    let lines: Vec<&str> = sanitized_logs.split('\n').collect();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut stack_frames = Vec::new();
    let mut file_paths = Vec::new();
    let mut seen_paths = HashSet::new();
    let mut pattern_tally = PatternTally::default();

    for line in &lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let error_entry = match_level_line(&ERROR_LINE_REGEX, trimmed, LogLevel::Error);
        let warn_entry = match_level_line(&WARN_LINE_REGEX, trimmed, LogLevel::Warn);

        if let Some(frame) = parse_stack_frame(trimmed) {
            stack_frames.push(frame);
        }

        for path in extract_file_paths(trimmed) {
            if seen_paths.insert(path.clone()) {
                file_paths.push(path);
            }
        }

        // One tally per line, error message preferred.
        if let Some(entry) = error_entry.as_ref().or(warn_entry.as_ref()) {
            pattern_tally.record(normalize_pattern(&entry.message));
        }

        if let Some(entry) = error_entry {
            errors.push(entry);
        }
        if let Some(entry) = warn_entry {
            warnings.push(entry);
        }
    }

    let summary = LogSummary {
        total_lines: lines.len(),
        error_count: errors.len(),
        warning_count: warnings.len(),
        has_stack_trace: !stack_frames.is_empty(),
    };

    debug!(
        total_lines = summary.total_lines,
        errors = summary.error_count,
        warnings = summary.warning_count,
        stack_frames = stack_frames.len(),
        file_paths = file_paths.len(),
        "Parsed sanitized logs"
    );

    Ok(ParsedLogs {
        errors,
        warnings,
        stack_frames,
        file_paths,
        repeated_patterns: pattern_tally.top(MAX_REPEATED_PATTERNS),
        raw_logs: sanitized_logs.to_string(),
        summary,
    })
}

fn match_level_line(regex: &Regex, line: &str, level: LogLevel) -> Option<LogEntry> {
    let caps = regex.captures(line)?;
    let timestamp = caps
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    let message = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|m| !m.is_empty())
        .unwrap_or(line)
        .to_string();

    Some(LogEntry {
        timestamp,
        level,
        message,
        full_line: line.to_string(),
    })
}

/// Parse one `at fn (file:line[:col])` line. Lines whose numbers do not fit
/// produce no frame at all.
pub fn parse_stack_frame(line: &str) -> Option<StackFrame> {
    let caps = STACK_FRAME_REGEX.captures(line)?;
    let method = caps
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|m| !m.is_empty())
        .unwrap_or("<anonymous>")
        .to_string();
    let file = caps.get(2)?.as_str().trim().to_string();
    let line_number = parse_number(&caps, 3)?;
    let column = match caps.get(4) {
        Some(m) => Some(m.as_str().parse::<u32>().ok()?),
        None => None,
    };

    Some(StackFrame {
        method,
        file,
        line: line_number,
        column,
    })
}

fn parse_number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

/// Unix-style paths with an extension, position suffix removed.
pub fn extract_file_paths(line: &str) -> Vec<String> {
    FILE_PATH_REGEX
        .find_iter(line)
        .filter_map(|m| m.as_str().split(':').next())
        .map(str::to_string)
        .collect()
}

/// Collapse volatile tokens so recurring messages compare equal.
pub fn normalize_pattern(message: &str) -> String {
    let normalized = TIMESTAMP_REGEX.replace_all(message.trim(), "<timestamp>");
    let normalized = UUID_REGEX.replace_all(&normalized, "<uuid>");
    let normalized = HEX_ID_REGEX.replace_all(&normalized, "<id>");
    normalized.chars().take(MAX_PATTERN_LENGTH).collect()
}

#[derive(Default)]
struct PatternTally {
    counts: Vec<RepeatedPattern>,
    index: HashMap<String, usize>,
}

impl PatternTally {
    fn record(&mut self, pattern: String) {
        match self.index.get(&pattern) {
            Some(&idx) => self.counts[idx].count += 1,
            None => {
                self.index.insert(pattern.clone(), self.counts.len());
                self.counts.push(RepeatedPattern { pattern, count: 1 });
            }
        }
    }

    /// Patterns seen more than once, most frequent first. Ties keep
    /// first-seen order.
    fn top(self, limit: usize) -> Vec<RepeatedPattern> {
        let mut repeated: Vec<RepeatedPattern> =
            self.counts.into_iter().filter(|p| p.count > 1).collect();
        repeated.sort_by(|a, b| b.count.cmp(&a.count));
        repeated.truncate(limit);
        repeated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(parse(""), Err(TriageError::Parse(_))));
        assert!(matches!(parse("  \n \n"), Err(TriageError::Parse(_))));
    }

    #[test]
    fn test_error_with_stack_frame() {
        let text = "2024-01-01T00:00:00Z ERROR Database connection failed\n  at connect (db.ts:42:7)\n";
        let parsed = parse(text).unwrap();

        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].message, "Database connection failed");
        assert_eq!(parsed.errors[0].timestamp, "2024-01-01T00:00:00Z");
        assert_eq!(parsed.errors[0].level, LogLevel::Error);
        assert_eq!(
            parsed.errors[0].full_line,
            "2024-01-01T00:00:00Z ERROR Database connection failed"
        );
        assert_eq!(
            parsed.stack_frames,
            vec![StackFrame {
                method: "connect".to_string(),
                file: "db.ts".to_string(),
                line: 42,
                column: Some(7),
            }]
        );
        assert!(parsed.summary.has_stack_trace);
        assert_eq!(parsed.summary.total_lines, 3);
    }

    #[test]
    fn test_level_marker_variations() {
        let text = "[ERROR] bracketed failure\nerror: lower case failure\n2024-05-06 10:11:12,345 WARNING: disk almost full\n[warn] cache miss\nINFO all good";
        let parsed = parse(text).unwrap();

        let errors: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(errors, vec!["bracketed failure", "lower case failure"]);

        let warnings: Vec<&str> = parsed.warnings.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(warnings, vec!["disk almost full", "cache miss"]);
        assert_eq!(parsed.warnings[0].timestamp, "2024-05-06 10:11:12,345");
        assert_eq!(parsed.warnings[1].timestamp, "");
    }

    #[test]
    fn test_marker_must_follow_timestamp() {
        let parsed = parse("[main] ERROR thread died").unwrap();
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_anonymous_and_nested_stack_frames() {
        let frame = parse_stack_frame("at /app/src/server.js:10:5").unwrap();
        assert_eq!(frame.method, "<anonymous>");
        assert_eq!(frame.file, "/app/src/server.js");
        assert_eq!(frame.line, 10);
        assert_eq!(frame.column, Some(5));

        let frame = parse_stack_frame("at Object.<anonymous> (/app/index.js:3)").unwrap();
        assert_eq!(frame.method, "Object.<anonymous>");
        assert_eq!(frame.file, "/app/index.js");
        assert_eq!(frame.line, 3);
        assert_eq!(frame.column, None);

        let frame = parse_stack_frame("at node:internal/main/run_main_module:23:47").unwrap();
        assert_eq!(frame.file, "node:internal/main/run_main_module");
        assert_eq!(frame.line, 23);
    }

    #[test]
    fn test_non_frames_are_skipped() {
        assert!(parse_stack_frame("at async Promise.all (index 0)").is_none());
        assert!(parse_stack_frame("listening on 0.0.0.0:8080").is_none());
        assert!(parse_stack_frame("at main (app.ts:99999999999)").is_none());
    }

    #[test]
    fn test_file_paths_are_deduplicated_and_stripped() {
        let text = "ERROR boom in /srv/app/handler.ts:12:4\n  at handle (/srv/app/handler.ts:12:4)\n  at run (/srv/app/lib/runner.js:7:1)";
        let parsed = parse(text).unwrap();
        assert_eq!(
            parsed.file_paths,
            vec!["/srv/app/handler.ts".to_string(), "/srv/app/lib/runner.js".to_string()]
        );
    }

    #[test]
    fn test_repeated_patterns_normalize_ids() {
        let text = "ERROR timeout id=a1b2c3d4e5f6a1b2c3d4e5f6\nERROR timeout id=ffffffffffffffffffffffff\nERROR something else";
        let parsed = parse(text).unwrap();

        assert_eq!(
            parsed.repeated_patterns,
            vec![RepeatedPattern {
                pattern: "timeout id=<id>".to_string(),
                count: 2,
            }]
        );
    }

    #[test]
    fn test_repeated_patterns_sorted_and_capped() {
        let mut lines = Vec::new();
        for (i, name) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            for _ in 0..(i + 2) {
                lines.push(format!("WARN retry {}", name));
            }
        }
        let parsed = parse(&lines.join("\n")).unwrap();

        let counts: Vec<usize> = parsed.repeated_patterns.iter().map(|p| p.count).collect();
        assert_eq!(counts, vec![7, 6, 5, 4, 3]);
        assert_eq!(parsed.repeated_patterns[0].pattern, "retry f");
    }

    #[test]
    fn test_normalize_pattern_placeholders() {
        assert_eq!(
            normalize_pattern("job 123e4567-e89b-12d3-a456-426614174000 failed at 2024-01-01T10:00:00.123Z"),
            "job <uuid> failed at <timestamp>"
        );
        assert_eq!(normalize_pattern(&"x".repeat(150)).len(), 100);
    }

    #[test]
    fn test_summary_matches_collections() {
        let text = "ERROR a\nWARN b\n\n  at f (x.js:1:1)\nERROR c\nrandom noise";
        let parsed = parse(text).unwrap();

        assert_eq!(parsed.summary.error_count, parsed.errors.len());
        assert_eq!(parsed.summary.warning_count, parsed.warnings.len());
        assert_eq!(parsed.summary.has_stack_trace, !parsed.stack_frames.is_empty());
        assert_eq!(parsed.summary.total_lines, 6);
        assert_eq!(parsed.raw_logs, text);
    }

    #[test]
    fn test_primary_accessors() {
        let parsed = parse("ERROR first\nERROR second\n at a (a.js:1:1)\n at b (b.js:2:2)").unwrap();
        assert_eq!(parsed.primary_error().unwrap().message, "first");
        assert_eq!(parsed.primary_stack_frame().unwrap().file, "a.js");
        assert_eq!(
            parsed.primary_stack_frame().unwrap().to_string(),
            "at a (a.js:1:1)"
        );
    }
}
