use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSettings,
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// openai, openrouter, claude (alias anthropic)
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// When false every run uses the fallback report.
    pub enabled: bool,
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            base_url: None,
            timeout: 60,
            max_tokens: 1500,
            temperature: 0.3,
            enabled: true,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub file_name: String,
    /// Suffix the file name with the run id instead of overwriting one file.
    pub per_run_file: bool,
    pub include_log_excerpt: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_name: "INCIDENT_REPORT.md".to_string(),
            per_run_file: false,
            include_log_excerpt: true,
        }
    }
}

impl Config {
    /// Load from the first config file found, then apply environment
    /// overrides. Falls back to defaults when no file exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::get_config_path() {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Config::default()
                }
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            TriageError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| TriageError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Provider key by priority: environment variable, then config file.
    pub fn get_api_key(&self) -> Option<String> {
        let var = format!("{}_API_KEY", self.llm.provider.to_uppercase());
        env::var(&var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.llm.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(mock) = env::var("MOCK_LLM") {
            if mock.eq_ignore_ascii_case("true") || mock == "1" {
                warn!("MOCK_LLM is set, LLM analysis disabled");
                self.llm.enabled = false;
            }
        }
        if let Ok(dir) = env::var("TRIAGE_REPORT_DIR") {
            if !dir.trim().is_empty() {
                self.report.output_dir = PathBuf::from(dir);
            }
        }
    }

    fn get_config_path() -> Option<PathBuf> {
        // Check for project-level config first
        if let Ok(current_dir) = env::current_dir() {
            let project_config = current_dir.join(".triage.toml");
            if project_config.exists() {
                return Some(project_config);
            }
        }

        // Check for user-level config
        if let Some(home_dir) = dirs::home_dir() {
            let user_config = home_dir.join(".config").join("triage").join("config.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.max_tokens, 1500);
        assert!(config.llm.enabled);
        assert_eq!(config.report.file_name, "INCIDENT_REPORT.md");
        assert!(!config.report.per_run_file);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [llm]
            provider = "claude"
            model = "claude-3-5-sonnet-latest"

            [report]
            per_run_file = true
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.provider, "claude");
        assert_eq!(config.llm.timeout, 60);
        assert!(config.report.per_run_file);
        assert_eq!(config.report.file_name, "INCIDENT_REPORT.md");
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[llm\nprovider = ").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, TriageError::Config(_)));
    }

    // Environment variables are process-global; tests touching them hold this.
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("triage.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_mock_llm_env_disables_llm() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[llm]\nenabled = true\n");

        env::set_var("MOCK_LLM", "true");
        let mocked = Config::load(Some(&path));
        env::set_var("MOCK_LLM", "1");
        let mocked_numeric = Config::load(Some(&path));
        env::set_var("MOCK_LLM", "false");
        let not_mocked = Config::load(Some(&path));
        env::remove_var("MOCK_LLM");

        assert!(!mocked.unwrap().llm.enabled);
        assert!(!mocked_numeric.unwrap().llm.enabled);
        assert!(not_mocked.unwrap().llm.enabled);
    }

    #[test]
    fn test_report_dir_env_overrides_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[report]\noutput_dir = \"from-file\"\n");

        env::set_var("TRIAGE_REPORT_DIR", "/var/reports");
        let overridden = Config::load(Some(&path));
        env::set_var("TRIAGE_REPORT_DIR", "  ");
        let blank = Config::load(Some(&path));
        env::remove_var("TRIAGE_REPORT_DIR");
        let unset = Config::load(Some(&path));

        assert_eq!(overridden.unwrap().report.output_dir, PathBuf::from("/var/reports"));
        assert_eq!(blank.unwrap().report.output_dir, PathBuf::from("from-file"));
        assert_eq!(unset.unwrap().report.output_dir, PathBuf::from("from-file"));
    }

    #[test]
    fn test_provider_env_key_wins_over_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[llm]\nprovider = \"envkeytest\"\napi_key = \"from-file\"\n",
        );

        env::set_var("ENVKEYTEST_API_KEY", "from-env");
        let from_env = Config::load(Some(&path)).unwrap().get_api_key();
        env::set_var("ENVKEYTEST_API_KEY", "");
        let blank_env = Config::load(Some(&path)).unwrap().get_api_key();
        env::remove_var("ENVKEYTEST_API_KEY");
        let from_file = Config::load(Some(&path)).unwrap().get_api_key();

        assert_eq!(from_env.as_deref(), Some("from-env"));
        assert_eq!(blank_env.as_deref(), Some("from-file"));
        assert_eq!(from_file.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_api_key_from_config_file() {
        let mut config = Config::default();
        config.llm.provider = "unit-test-provider".to_string();
        assert_eq!(config.get_api_key(), None);

        config.llm.api_key = Some("from-file".to_string());
        assert_eq!(config.get_api_key().as_deref(), Some("from-file"));
    }
}
