pub mod markdown;

use crate::config::ReportSettings;
use crate::error::{Result, TriageError};
use crate::parser::ParsedLogs;
use crate::report::IncidentReport;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use markdown::render_markdown;

/// Where a rendered report lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDestination {
    /// One well-known file, overwritten by every run.
    Fixed(PathBuf),
    /// `<stem>-<run_id>.<ext>` inside `dir`, so concurrent runs never collide.
    PerRun { dir: PathBuf, file_name: String },
}

impl ReportDestination {
    pub fn from_settings(settings: &ReportSettings) -> Self {
        if settings.per_run_file {
            ReportDestination::PerRun {
                dir: settings.output_dir.clone(),
                file_name: settings.file_name.clone(),
            }
        } else {
            ReportDestination::Fixed(settings.output_dir.join(&settings.file_name))
        }
    }

    pub fn resolve(&self, run_id: &str) -> PathBuf {
        match self {
            ReportDestination::Fixed(path) => path.clone(),
            ReportDestination::PerRun { dir, file_name } => {
                let name = Path::new(file_name);
                let stem = name
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("INCIDENT_REPORT");
                let file = match name.extension().and_then(|e| e.to_str()) {
                    Some(ext) => format!("{}-{}.{}", stem, run_id, ext),
                    None => format!("{}-{}", stem, run_id),
                };
                dir.join(file)
            }
        }
    }
}

pub struct ReportWriter {
    destination: ReportDestination,
    include_excerpt: bool,
}

impl ReportWriter {
    pub fn new(settings: &ReportSettings) -> Self {
        Self {
            destination: ReportDestination::from_settings(settings),
            include_excerpt: settings.include_log_excerpt,
        }
    }

    /// Render the report and write it, returning the path written.
    pub fn write(
        &self,
        report: &IncidentReport,
        parsed: &ParsedLogs,
        is_fallback: bool,
        run_id: &str,
    ) -> Result<PathBuf> {
        let content = render_markdown(report, parsed, is_fallback, run_id, self.include_excerpt)?;
        let path = self.destination.resolve(run_id);
        save_report(&content, &path)?;
        info!(path = %path.display(), generated_by = %report.generated_by, "Incident report written");
        Ok(path)
    }
}

/// Write `content` to `path`, creating parent directories as needed.
pub fn save_report(content: &str, path: &Path) -> Result<()> {
    let file_error = |source| TriageError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(file_error)?;
        }
    }
    debug!("Writing {} bytes to {}", content.len(), path.display());
    fs::write(path, content).map_err(file_error)
}
