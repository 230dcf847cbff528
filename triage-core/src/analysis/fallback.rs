//! Deterministic incident report built from parsed logs alone.

use crate::parser::ParsedLogs;
use crate::report::{now_timestamp, GeneratedBy, IncidentReport, Severity};

const CRITICAL_KEYWORDS: [&str; 6] = ["fatal", "crash", "unhandled", "panic", "oom", "out of memory"];
const TITLE_MAX_CHARS: usize = 60;
const MAX_AFFECTED_COMPONENTS: usize = 5;

/// First matching rule wins: critical keyword, trace with more than two
/// errors, any error or trace, otherwise low.
pub fn determine_severity(parsed: &ParsedLogs) -> Severity {
    let has_critical = parsed.errors.iter().any(|entry| {
        let message = entry.message.to_lowercase();
        CRITICAL_KEYWORDS.iter().any(|keyword| message.contains(keyword))
    });
    if has_critical {
        return Severity::Critical;
    }

    let summary = &parsed.summary;
    if summary.has_stack_trace && summary.error_count > 2 {
        return Severity::High;
    }
    if summary.error_count > 0 || summary.has_stack_trace {
        return Severity::Medium;
    }
    Severity::Low
}

pub fn build_fallback_report(parsed: &ParsedLogs) -> IncidentReport {
    let primary_error = parsed.primary_error();
    let primary_frame = parsed.primary_stack_frame();

    let title = match primary_error {
        Some(error) => format!("Error: {}", truncate_chars(&error.message, TITLE_MAX_CHARS)),
        None => "Log Analysis Report - No Specific Error Found".to_string(),
    };

    let summary = match primary_error {
        Some(error) => format!(
            "{} error(s) detected. Primary error: \"{}\"",
            parsed.summary.error_count, error.message
        ),
        None => format!(
            "Analyzed {} log lines with {} warning(s).",
            parsed.summary.total_lines, parsed.summary.warning_count
        ),
    };

    let root_cause = match (primary_error, primary_frame) {
        (Some(error), Some(frame)) => format!(
            "Based on error message: \"{}\". Error originated in {} at line {}.",
            error.message, frame.file, frame.line
        ),
        (Some(error), None) => format!(
            "Based on error message: \"{}\". No stack trace available for detailed analysis.",
            error.message
        ),
        (None, _) => "Unable to determine root cause - no error messages found.".to_string(),
    };

    let stack_frame_responsible = match primary_frame {
        Some(frame) => format!("{} ({}:{})", frame.method, frame.file, frame.line),
        None => "No stack frame available".to_string(),
    };

    let fix_plan = match primary_frame {
        Some(frame) => format!(
            "1. Review {} at line {}\n2. Check for null/undefined values\n3. Add error handling if missing\n4. Test with similar input scenarios",
            frame.file, frame.line
        ),
        None => "1. Review the error messages\n2. Check recent code changes\n3. Add logging if needed\n4. Monitor for recurrence".to_string(),
    };

    IncidentReport {
        title,
        summary,
        severity: determine_severity(parsed),
        root_cause,
        stack_frame_responsible,
        impact: format!(
            "Potential impact on {} component(s). Requires investigation.",
            parsed.file_paths.len()
        ),
        fix_plan,
        prevention_plan: "1. Add comprehensive error handling\n2. Implement input validation\n3. Add monitoring alerts\n4. Write unit tests for edge cases".to_string(),
        affected_components: parsed
            .file_paths
            .iter()
            .take(MAX_AFFECTED_COMPONENTS)
            .cloned()
            .collect(),
        timestamp: now_timestamp(),
        generated_by: GeneratedBy::Fallback,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_panic_is_critical_regardless_of_counts() {
        let parsed = parse("ERROR worker thread panic: index out of bounds").unwrap();
        let report = build_fallback_report(&parsed);
        assert_eq!(report.severity, Severity::Critical);
        assert_eq!(report.generated_by, GeneratedBy::Fallback);
    }

    #[test]
    fn test_critical_keywords_are_case_insensitive() {
        let parsed = parse("ERROR Process hit OUT OF MEMORY").unwrap();
        assert_eq!(determine_severity(&parsed), Severity::Critical);
    }

    #[test]
    fn test_critical_keyword_in_warning_does_not_count() {
        let parsed = parse("WARN possible crash loop detected").unwrap();
        assert_eq!(determine_severity(&parsed), Severity::Low);
    }

    #[test]
    fn test_trace_with_many_errors_is_high() {
        let text = "ERROR a\nERROR b\nERROR c\n  at f (/app/f.js:1:1)";
        let parsed = parse(text).unwrap();
        assert_eq!(determine_severity(&parsed), Severity::High);
    }

    #[test]
    fn test_errors_without_trace_or_lone_trace_is_medium() {
        let parsed = parse("ERROR a").unwrap();
        assert_eq!(determine_severity(&parsed), Severity::Medium);

        let parsed = parse("ERROR a\nERROR b\nERROR c").unwrap();
        assert_eq!(determine_severity(&parsed), Severity::Medium);

        let parsed = parse("something odd\n  at f (/app/f.js:1:1)").unwrap();
        assert_eq!(determine_severity(&parsed), Severity::Medium);
    }

    #[test]
    fn test_clean_logs_are_low_with_generic_title() {
        let parsed = parse("INFO service started\nINFO ready").unwrap();
        let report = build_fallback_report(&parsed);

        assert_eq!(report.severity, Severity::Low);
        assert!(report.title.contains("No Specific Error Found"));
        assert_eq!(report.summary, "Analyzed 2 log lines with 0 warning(s).");
        assert_eq!(report.stack_frame_responsible, "No stack frame available");
        assert!(report.affected_components.is_empty());
    }

    #[test]
    fn test_report_names_primary_frame() {
        let text = "ERROR Database connection failed\n  at connect (/srv/db.ts:42:7)\n  at boot (/srv/main.ts:3:1)";
        let parsed = parse(text).unwrap();
        let report = build_fallback_report(&parsed);

        assert_eq!(report.title, "Error: Database connection failed");
        assert_eq!(report.stack_frame_responsible, "connect (/srv/db.ts:42)");
        assert!(report.root_cause.contains("originated in /srv/db.ts at line 42"));
        assert!(report.fix_plan.starts_with("1. Review /srv/db.ts at line 42"));
        assert_eq!(
            report.affected_components,
            vec!["/srv/db.ts".to_string(), "/srv/main.ts".to_string()]
        );
        assert_eq!(report.impact, "Potential impact on 2 component(s). Requires investigation.");
    }

    #[test]
    fn test_long_title_is_truncated() {
        let message = "m".repeat(80);
        let parsed = parse(&format!("ERROR {}", message)).unwrap();
        let report = build_fallback_report(&parsed);
        assert_eq!(report.title, format!("Error: {}...", "m".repeat(60)));
    }

    #[test]
    fn test_affected_components_capped() {
        let text = (0..8)
            .map(|i| format!("ERROR failed in /app/mod{}.rs", i))
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = parse(&text).unwrap();
        let report = build_fallback_report(&parsed);
        assert_eq!(report.affected_components.len(), 5);
        assert_eq!(report.affected_components[0], "/app/mod0.rs");
    }
}
