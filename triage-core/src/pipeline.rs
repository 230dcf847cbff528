//! One run: sanitize, parse, generate a report, write it.
//!
//! Sanitize and parse failures end the run before anything is written.
//! LLM failures never surface here; the generator substitutes the fallback.

use crate::ai_provider::create_provider;
use crate::analysis::{FallbackReason, GeneratedReport, LlmAnalyzer, ReportGenerator};
use crate::config::Config;
use crate::error::Result;
use crate::intake::{self, LogPayload};
use crate::output::ReportWriter;
use crate::parser::{self, ParsedLogs};
use crate::report::{GeneratedBy, IncidentReport};
use crate::sanitizer::{self, SanitizeResult};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Received,
    Sanitized,
    Parsed,
    AnalyzingLlm,
    Analyzed,
    AnalysisFailed,
    FallbackBuilt,
    Written,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Received => "RECEIVED",
            PipelineStage::Sanitized => "SANITIZED",
            PipelineStage::Parsed => "PARSED",
            PipelineStage::AnalyzingLlm => "ANALYZING_LLM",
            PipelineStage::Analyzed => "ANALYZED",
            PipelineStage::AnalysisFailed => "ANALYSIS_FAILED",
            PipelineStage::FallbackBuilt => "FALLBACK_BUILT",
            PipelineStage::Written => "WRITTEN",
        };
        f.write_str(s)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub stages: Vec<PipelineStage>,
    pub sanitize: SanitizeResult,
    pub report: IncidentReport,
    pub generated_by: GeneratedBy,
    pub fallback_reason: Option<FallbackReason>,
    pub location: PathBuf,
}

pub struct Pipeline {
    generator: ReportGenerator,
    writer: ReportWriter,
}

impl Pipeline {
    pub fn new(generator: ReportGenerator, writer: ReportWriter) -> Self {
        Self { generator, writer }
    }

    /// Wire the pipeline from configuration. A missing credential or an
    /// unknown provider leaves the LLM strategy unavailable, so every run
    /// falls back.
    pub fn from_config(config: &Config) -> Self {
        Self::with_api_key(config, config.get_api_key())
    }

    /// Like [`Pipeline::from_config`] with an explicitly resolved credential.
    pub fn with_api_key(config: &Config, api_key: Option<String>) -> Self {
        let analyzer = if !config.llm.enabled {
            LlmAnalyzer::unavailable()
        } else {
            match api_key {
                Some(api_key) => match create_provider(&config.llm, &api_key) {
                    Ok(provider) => LlmAnalyzer::new(provider)
                        .with_sampling(config.llm.max_tokens, config.llm.temperature),
                    Err(e) => {
                        warn!("Could not create LLM provider, using fallback only: {}", e);
                        LlmAnalyzer::unavailable()
                    }
                },
                None => {
                    warn!(
                        provider = %config.llm.provider,
                        "No API key found, LLM analysis unavailable"
                    );
                    LlmAnalyzer::unavailable()
                }
            }
        };

        let generator = ReportGenerator::new(analyzer, config.llm.enabled);
        info!(
            provider = %config.llm.provider,
            llm_available = generator.llm_available(),
            output_dir = %config.report.output_dir.display(),
            "Pipeline configured"
        );
        Self::new(generator, ReportWriter::new(&config.report))
    }

    pub async fn run_payload(&self, payload: LogPayload) -> Result<PipelineOutcome> {
        payload.validate()?;
        self.run(&payload.logs).await
    }

    /// Raw bytes from a file or stdin. The intake bounds apply as for a
    /// payload; invalid UTF-8 counts replacement characters toward them.
    pub async fn run_bytes(&self, raw: &[u8]) -> Result<PipelineOutcome> {
        intake::check_bounds(String::from_utf8_lossy(raw).chars().count())?;
        let run = RunState::start();
        let sanitized = sanitizer::sanitize_bytes(raw).inspect_err(|e| run.failed(e))?;
        self.continue_run(run, sanitized).await
    }

    pub async fn run(&self, raw_logs: &str) -> Result<PipelineOutcome> {
        let run = RunState::start();
        let sanitized = sanitizer::sanitize(raw_logs).inspect_err(|e| run.failed(e))?;
        self.continue_run(run, sanitized).await
    }

    async fn continue_run(
        &self,
        mut run: RunState,
        sanitized: SanitizeResult,
    ) -> Result<PipelineOutcome> {
        run.advance(PipelineStage::Sanitized);
        info!(
            run_id = %run.id,
            original_length = sanitized.original_length,
            sanitized_length = sanitized.sanitized_logs.len(),
            truncated = sanitized.was_truncated,
            ansi_codes_removed = sanitized.ansi_codes_removed,
            "Logs sanitized"
        );

        let parsed = parser::parse(&sanitized.sanitized_logs).inspect_err(|e| run.failed(e))?;
        run.advance(PipelineStage::Parsed);
        info!(
            run_id = %run.id,
            lines = parsed.summary.total_lines,
            errors = parsed.summary.error_count,
            warnings = parsed.summary.warning_count,
            stack_trace = parsed.summary.has_stack_trace,
            "Logs parsed"
        );

        let generated = self.generator.generate(&parsed).await;
        run.record_generation(&generated);

        let location = self.write(&run, &generated, &parsed)?;
        run.advance(PipelineStage::Written);

        Ok(PipelineOutcome {
            run_id: run.id,
            stages: run.stages,
            sanitize: sanitized,
            generated_by: generated.report.generated_by,
            report: generated.report,
            fallback_reason: generated.fallback_reason,
            location,
        })
    }

    fn write(
        &self,
        run: &RunState,
        generated: &GeneratedReport,
        parsed: &ParsedLogs,
    ) -> Result<PathBuf> {
        self.writer
            .write(&generated.report, parsed, generated.is_fallback(), &run.id)
            .inspect_err(|e| run.failed(e))
    }
}

struct RunState {
    id: String,
    stages: Vec<PipelineStage>,
}

impl RunState {
    fn start() -> Self {
        let id = Uuid::new_v4().to_string();
        debug!(run_id = %id, stage = %PipelineStage::Received, "Pipeline run started");
        Self {
            id,
            stages: vec![PipelineStage::Received],
        }
    }

    fn advance(&mut self, stage: PipelineStage) {
        debug!(run_id = %self.id, stage = %stage, "Stage reached");
        self.stages.push(stage);
    }

    fn record_generation(&mut self, generated: &GeneratedReport) {
        match &generated.fallback_reason {
            None => {
                self.advance(PipelineStage::AnalyzingLlm);
                self.advance(PipelineStage::Analyzed);
            }
            Some(FallbackReason::MockMode) => {
                self.advance(PipelineStage::FallbackBuilt);
            }
            Some(reason @ FallbackReason::LlmFailed { .. }) => {
                self.advance(PipelineStage::AnalyzingLlm);
                self.advance(PipelineStage::AnalysisFailed);
                info!(run_id = %self.id, reason = %reason, "Falling back to heuristic report");
                self.advance(PipelineStage::FallbackBuilt);
            }
        }
    }

    fn failed(&self, err: &crate::error::TriageError) {
        let last = self.stages.last().copied().unwrap_or(PipelineStage::Received);
        error!(
            run_id = %self.id,
            last_stage = %last,
            code = err.kind().code(),
            "Pipeline run failed: {}",
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportSettings;

    fn fallback_pipeline(dir: &std::path::Path) -> Pipeline {
        let settings = ReportSettings {
            output_dir: dir.to_path_buf(),
            ..ReportSettings::default()
        };
        Pipeline::new(ReportGenerator::fallback_only(), ReportWriter::new(&settings))
    }

    #[tokio::test]
    async fn test_mock_mode_stage_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = fallback_pipeline(dir.path())
            .run("ERROR something broke")
            .await
            .unwrap();

        assert_eq!(
            outcome.stages,
            vec![
                PipelineStage::Received,
                PipelineStage::Sanitized,
                PipelineStage::Parsed,
                PipelineStage::FallbackBuilt,
                PipelineStage::Written,
            ]
        );
        assert_eq!(outcome.fallback_reason, Some(FallbackReason::MockMode));
        assert_eq!(outcome.generated_by, GeneratedBy::Fallback);
        assert!(outcome.location.exists());
    }

    #[tokio::test]
    async fn test_invalid_utf8_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = fallback_pipeline(dir.path())
            .run_bytes(&[0xff, 0xfe, 0x00])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Sanitization);
        assert!(!dir.path().join("INCIDENT_REPORT.md").exists());
    }

    #[tokio::test]
    async fn test_oversized_invalid_utf8_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = vec![b'a'; crate::intake::MAX_PAYLOAD_CHARS];
        raw.push(0xff);
        let err = fallback_pipeline(dir.path()).run_bytes(&raw).await.unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(!dir.path().join("INCIDENT_REPORT.md").exists());

        let err = fallback_pipeline(dir.path()).run_bytes(&[]).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_disabled_config_never_builds_provider() {
        let mut config = Config::default();
        config.llm.enabled = false;
        config.llm.api_key = Some("sk-test".to_string());
        let pipeline = Pipeline::with_api_key(&config, config.llm.api_key.clone());
        assert!(!pipeline.generator.llm_available());
    }

    #[test]
    fn test_llm_available_only_with_credential() {
        let config = Config::default();
        assert!(!Pipeline::with_api_key(&config, None).generator.llm_available());
        assert!(Pipeline::with_api_key(&config, Some("sk-test".to_string()))
            .generator
            .llm_available());
    }
}
