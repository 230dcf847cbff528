use crate::parser::ParsedLogs;
use std::fmt::Write;

const MAX_PROMPT_ERRORS: usize = 10;
const MAX_PROMPT_WARNINGS: usize = 5;
const MAX_PROMPT_FRAMES: usize = 10;
const MAX_PROMPT_FILES: usize = 10;
/// Raw logs are only quoted below this many characters.
const RAW_EXCERPT_LIMIT: usize = 2_000;

pub struct SystemPromptGenerator;

impl SystemPromptGenerator {
    pub fn system_prompt() -> &'static str {
        r#"You are an expert DevOps engineer and incident analyst. Your task is to analyze application logs and generate a structured incident report.

You must respond with a valid JSON object matching this exact structure:
{
  "title": "Short, descriptive title for the incident",
  "summary": "2-3 sentence summary of what happened",
  "severity": "LOW" | "MEDIUM" | "HIGH" | "CRITICAL",
  "rootCause": "Detailed explanation of the root cause",
  "stackFrameResponsible": "The specific file:line or function that caused the issue",
  "impact": "Description of the impact on users/system",
  "fixPlan": "Step-by-step plan to fix the issue",
  "preventionPlan": "Steps to prevent this from happening again",
  "affectedComponents": ["list", "of", "affected", "components"]
}

Guidelines:
- Every text field must be non-empty
- Severity must be exactly one of LOW, MEDIUM, HIGH, CRITICAL
- Severity levels: LOW (minor issue, no user impact), MEDIUM (some user impact), HIGH (significant user impact), CRITICAL (system down)
- Be concise but thorough and focus on actionable insights
- If information is missing, make reasonable inferences based on the error patterns
- Always provide a fix plan even if speculative
- Respond with the JSON object only"#
    }

    /// User prompt for one run, bounded regardless of log volume.
    pub fn create_analysis_prompt(parsed: &ParsedLogs) -> String {
        let summary = &parsed.summary;
        let mut prompt = String::from("Analyze the following application logs and generate an incident report:\n\n");

        prompt.push_str("## Log Summary\n");
        let _ = writeln!(prompt, "- Total lines: {}", summary.total_lines);
        let _ = writeln!(prompt, "- Error count: {}", summary.error_count);
        let _ = writeln!(prompt, "- Warning count: {}", summary.warning_count);
        let _ = writeln!(
            prompt,
            "- Has stack trace: {}\n",
            if summary.has_stack_trace { "Yes" } else { "No" }
        );

        if !parsed.errors.is_empty() {
            prompt.push_str("## Error Messages\n");
            for (i, entry) in parsed.errors.iter().take(MAX_PROMPT_ERRORS).enumerate() {
                let _ = writeln!(prompt, "{}. [{}] {}", i + 1, timestamp_or_placeholder(&entry.timestamp), entry.message);
            }
            prompt.push('\n');
        }

        if !parsed.warnings.is_empty() {
            prompt.push_str("## Warnings\n");
            for (i, entry) in parsed.warnings.iter().take(MAX_PROMPT_WARNINGS).enumerate() {
                let _ = writeln!(prompt, "{}. [{}] {}", i + 1, timestamp_or_placeholder(&entry.timestamp), entry.message);
            }
            prompt.push('\n');
        }

        if !parsed.stack_frames.is_empty() {
            prompt.push_str("## Stack Trace\n");
            for (i, frame) in parsed.stack_frames.iter().take(MAX_PROMPT_FRAMES).enumerate() {
                let _ = writeln!(prompt, "{}. {}", i + 1, frame);
            }
            prompt.push('\n');
        }

        if !parsed.file_paths.is_empty() {
            prompt.push_str("## Affected Files\n");
            for path in parsed.file_paths.iter().take(MAX_PROMPT_FILES) {
                let _ = writeln!(prompt, "- {}", path);
            }
            prompt.push('\n');
        }

        if !parsed.repeated_patterns.is_empty() {
            prompt.push_str("## Repeated Patterns\n");
            for pattern in &parsed.repeated_patterns {
                let _ = writeln!(prompt, "- {} (x{})", pattern.pattern, pattern.count);
            }
            prompt.push('\n');
        }

        if parsed.raw_logs.chars().count() < RAW_EXCERPT_LIMIT {
            let _ = writeln!(prompt, "## Raw Logs\n```\n{}\n```", parsed.raw_logs);
        }

        prompt.push_str("\nGenerate a comprehensive incident report in JSON format.");
        prompt
    }
}

fn timestamp_or_placeholder(timestamp: &str) -> &str {
    if timestamp.is_empty() {
        "no timestamp"
    } else {
        timestamp
    }
}
