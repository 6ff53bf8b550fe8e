use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::transcribe::ModelSize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenAI API settings (remote transcription + summarization)
    pub openai: OpenAiConfig,

    /// Local whisper.cpp settings
    pub local: LocalConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Transcription model name
    pub whisper_model: String,

    /// Chat model used for summaries
    pub summary_model: String,

    /// Per-request timeout in seconds for API calls
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory holding ggml model checkpoints; platform data dir if unset
    pub models_dir: Option<PathBuf>,

    /// Model size used when none is given on the command line
    pub default_model_size: ModelSize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base directory for per-video output directories
    pub output_dir: PathBuf,

    /// Keep the downloaded audio file next to the transcripts
    pub keep_audio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig {
                whisper_model: "whisper-1".to_string(),
                summary_model: "gpt-3.5-turbo".to_string(),
                request_timeout_secs: 300,
            },
            local: LocalConfig {
                models_dir: None,
                default_model_size: ModelSize::default(),
            },
            app: AppConfig {
                output_dir: PathBuf::from("./outputs"),
                keep_audio: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("yt2transcript").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.openai.whisper_model.is_empty() {
            anyhow::bail!("openai.whisper_model must not be empty");
        }
        if self.openai.request_timeout_secs == 0 {
            anyhow::bail!("openai.request_timeout_secs must be positive");
        }
        Ok(())
    }

    /// Directory holding local whisper model checkpoints.
    pub fn models_dir(&self) -> PathBuf {
        self.local.models_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("yt2transcript")
                .join("models")
        })
    }

    /// Model size to use: an explicit command-line value wins over the
    /// configured default.
    pub fn resolve_model_size(&self, flag: Option<ModelSize>) -> ModelSize {
        flag.unwrap_or(self.local.default_model_size)
    }

    /// Output base directory: an explicit command-line value wins over the
    /// configured one.
    pub fn resolve_output_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.unwrap_or_else(|| self.app.output_dir.clone())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.openai.request_timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Whisper API model: {}", self.openai.whisper_model);
        println!("  Summary model: {}", self.openai.summary_model);
        println!("  Request timeout: {}s", self.openai.request_timeout_secs);
        println!("  Models dir: {}", self.models_dir().display());
        println!(
            "  Default model size: {}",
            self.local.default_model_size
        );
        println!("  Output dir: {}", self.app.output_dir.display());
        println!("  Keep audio: {}", self.app.keep_audio);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_yaml() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.openai.whisper_model, "whisper-1");
        assert_eq!(parsed.local.default_model_size, ModelSize::Base);
        assert!(!parsed.app.keep_audio);
    }

    #[test]
    fn model_size_serializes_lowercase() {
        let yaml = serde_yaml::to_string(&ModelSize::Medium).unwrap();
        assert_eq!(yaml.trim(), "medium");
    }

    #[test]
    fn validate_rejects_empty_model() {
        let mut config = Config::default();
        config.openai.whisper_model.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn configured_settings_apply_when_flags_are_absent() {
        let mut config = Config::default();
        config.local.default_model_size = ModelSize::Small;
        config.app.output_dir = PathBuf::from("/srv/transcripts");

        assert_eq!(config.resolve_model_size(None), ModelSize::Small);
        assert_eq!(
            config.resolve_output_dir(None),
            PathBuf::from("/srv/transcripts")
        );
    }

    #[test]
    fn explicit_flags_win_over_configured_settings() {
        let mut config = Config::default();
        config.local.default_model_size = ModelSize::Small;

        assert_eq!(
            config.resolve_model_size(Some(ModelSize::Large)),
            ModelSize::Large
        );
        assert_eq!(
            config.resolve_output_dir(Some(PathBuf::from("./elsewhere"))),
            PathBuf::from("./elsewhere")
        );
    }

    #[test]
    fn explicit_models_dir_wins() {
        let mut config = Config::default();
        config.local.models_dir = Some(PathBuf::from("/opt/models"));
        assert_eq!(config.models_dir(), PathBuf::from("/opt/models"));
    }
}
