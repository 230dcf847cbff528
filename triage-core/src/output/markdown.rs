use crate::error::{Result, TriageError};
use crate::parser::ParsedLogs;
use crate::report::IncidentReport;
use askama::Template;

const EXCERPT_MAX_ERRORS: usize = 10;
const EXCERPT_MAX_FRAMES: usize = 10;

#[derive(Template)]
#[template(path = "incident_report.md", escape = "none")]
struct IncidentReportTemplate {
    title: String,
    severity_badge: String,
    timestamp: String,
    provenance: String,
    provenance_tag: String,
    run_id: String,
    is_fallback: bool,
    summary: String,
    root_cause: String,
    stack_frame_responsible: String,
    impact: String,
    affected_components: Vec<String>,
    fix_plan: String,
    prevention_plan: String,
    include_excerpt: bool,
    total_lines: usize,
    error_count: usize,
    warning_count: usize,
    has_stack_trace: bool,
    errors: Vec<String>,
    stack_frames: Vec<String>,
    repeated_patterns: Vec<String>,
}

/// Render the human-readable report document.
pub fn render_markdown(
    report: &IncidentReport,
    parsed: &ParsedLogs,
    is_fallback: bool,
    run_id: &str,
    include_excerpt: bool,
) -> Result<String> {
    let template = IncidentReportTemplate {
        title: report.title.clone(),
        severity_badge: report.severity.badge().to_string(),
        timestamp: report.timestamp.clone(),
        provenance: report.generated_by.description().to_string(),
        provenance_tag: report.generated_by.to_string(),
        run_id: run_id.to_string(),
        is_fallback,
        summary: report.summary.clone(),
        root_cause: report.root_cause.clone(),
        stack_frame_responsible: report.stack_frame_responsible.clone(),
        impact: report.impact.clone(),
        affected_components: report.affected_components.clone(),
        fix_plan: report.fix_plan.clone(),
        prevention_plan: report.prevention_plan.clone(),
        include_excerpt,
        total_lines: parsed.summary.total_lines,
        error_count: parsed.summary.error_count,
        warning_count: parsed.summary.warning_count,
        has_stack_trace: parsed.summary.has_stack_trace,
        errors: parsed
            .errors
            .iter()
            .take(EXCERPT_MAX_ERRORS)
            .map(|e| e.full_line.clone())
            .collect(),
        stack_frames: parsed
            .stack_frames
            .iter()
            .take(EXCERPT_MAX_FRAMES)
            .map(|f| f.to_string())
            .collect(),
        repeated_patterns: parsed
            .repeated_patterns
            .iter()
            .map(|p| format!("`{}` ({} occurrences)", p.pattern, p.count))
            .collect(),
    };

    template
        .render()
        .map_err(|e| TriageError::Render(e.to_string()))
}
