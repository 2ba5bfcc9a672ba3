//! Configuration for a narration run.
//!
//! Non-secret settings live in a TOML file (`narrator.toml` by default):
//!
//! ```toml
//! [paths]
//! input_dir = "text csv"
//! run_root = "audio"
//! output_dir = "text csv"
//! error_log = "error_log/error.txt"
//!
//! [columns]
//! text = "Narration"
//! title = "Slide Title"
//! index = "Slide"
//!
//! [voice]
//! model = "tts-1"
//! voice = "nova"
//!
//! [pipeline]
//! concurrency = 4
//! requests_per_second = 2
//!
//! [folders]
//! Episode1 = "1AbCdEfGhIjKlMnOp"
//! ```
//!
//! Secrets come from the environment (a `.env` file is honoured):
//! `OPENAI_API_KEY` and `DRIVE_ACCESS_TOKEN`.

use openai_client::AudioFormat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::SecretString;
use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;

/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the Drive OAuth access token.
pub const DRIVE_ACCESS_TOKEN_VAR: &str = "DRIVE_ACCESS_TOKEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub columns: ColumnsConfig,
    pub voice: VoiceConfig,
    pub pipeline: PipelineConfig,

    /// Group name → remote destination folder id
    pub folders: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory of `<group>.csv` input tables
    pub input_dir: PathBuf,

    /// Audio files land in `<run_root>/<group>/`
    pub run_root: PathBuf,

    /// Augmented tables are written to `<output_dir>/<group>.csv`
    pub output_dir: PathBuf,

    /// Append-only error log
    pub error_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            run_root: PathBuf::from("audio"),
            output_dir: PathBuf::from("output"),
            error_log: PathBuf::from("error_log/error.txt"),
        }
    }
}

/// Names of the source columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub text: String,
    pub title: String,
    pub index: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            text: "text".to_string(),
            title: "title".to_string(),
            index: "index".to_string(),
        }
    }
}

/// Options passed to the speech provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub model: String,
    pub voice: String,
    pub response_format: AudioFormat,
    pub speed: Option<f32>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "nova".to_string(),
            response_format: AudioFormat::Mp3,
            speed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rows processed at once within a group
    pub concurrency: usize,

    /// Synthesis requests per second; unset or 0 means unlimited
    pub requests_per_second: Option<u32>,

    /// Per-attempt timeout for every external call
    pub timeout_secs: u64,

    /// Attempts per external call, first one included
    pub max_attempts: u32,

    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            requests_per_second: None,
            timeout_secs: 120,
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            timeout: self.timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse from TOML text.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Check settings that do not depend on the input.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.pipeline.concurrency == 0 {
            problems.push("pipeline.concurrency must be at least 1".to_string());
        }
        if self.pipeline.max_attempts == 0 {
            problems.push("pipeline.max_attempts must be at least 1".to_string());
        }
        if self.pipeline.timeout_secs == 0 {
            problems.push("pipeline.timeout_secs must be at least 1".to_string());
        }
        if self.voice.model.trim().is_empty() || self.voice.voice.trim().is_empty() {
            problems.push("voice.model and voice.voice must be set".to_string());
        }
        if let Some(speed) = self.voice.speed {
            if !(0.25..=4.0).contains(&speed) {
                problems.push(format!("voice.speed {} is outside 0.25..=4.0", speed));
            }
        }
        let columns = [&self.columns.text, &self.columns.title, &self.columns.index];
        if columns.iter().any(|c| c.trim().is_empty()) {
            problems.push("columns.text, columns.title and columns.index must be set".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Config(problems.join("; ")))
        }
    }

    /// Destination folder for a group.
    pub fn folder_for(&self, group: &str) -> Option<&str> {
        self.folders
            .get(group)
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
    }

    /// Groups without a usable folder mapping, in input order.
    pub fn missing_folders<'a>(&self, groups: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        groups
            .into_iter()
            .filter(|g| self.folder_for(g).is_none())
            .map(str::to_string)
            .collect()
    }
}

/// Secrets read from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub openai_api_key: SecretString,
}

impl Credentials {
    /// Load from environment variables. The binary loads `.env` into the
    /// environment before anything calls this.
    pub fn from_env() -> Result<Self> {
        let openai_api_key = std::env::var(OPENAI_API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| PipelineError::Config(format!("{} must be set", OPENAI_API_KEY_VAR)))?;

        Ok(Self {
            openai_api_key: SecretString::new(openai_api_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_nova_voice() {
        let config = Config::default();
        assert_eq!(config.voice.model, "tts-1");
        assert_eq!(config.voice.voice, "nova");
        assert_eq!(config.voice.response_format, AudioFormat::Mp3);
        assert_eq!(config.pipeline.concurrency, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml(
            r#"
            [paths]
            input_dir = "text csv"
            run_root = "lesson"

            [columns]
            text = "Narration"
            title = "Slide Title"
            index = "Slide"

            [voice]
            voice = "alloy"
            speed = 1.1

            [pipeline]
            concurrency = 4
            requests_per_second = 2

            [folders]
            Episode1 = "folder-1"
            "Episode 2" = "folder-2"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.input_dir, PathBuf::from("text csv"));
        assert_eq!(config.paths.output_dir, PathBuf::from("output"));
        assert_eq!(config.columns.title, "Slide Title");
        assert_eq!(config.voice.model, "tts-1");
        assert_eq!(config.voice.voice, "alloy");
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.pipeline.requests_per_second, Some(2));
        assert_eq!(config.folder_for("Episode 2"), Some("folder-2"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_folders_listed_in_order() {
        let config = Config::from_toml(
            r#"
            [folders]
            Episode1 = "folder-1"
            Episode3 = "  "
            "#,
        )
        .unwrap();

        let missing = config.missing_folders(["Episode1", "Episode2", "Episode3"]);
        assert_eq!(missing, vec!["Episode2", "Episode3"]);
    }

    #[test]
    fn test_validate_collects_problems() {
        let mut config = Config::default();
        config.pipeline.concurrency = 0;
        config.voice.speed = Some(9.0);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("concurrency"));
        assert!(err.contains("speed"));
    }

    #[test]
    fn test_retry_policy_from_settings() {
        let pipeline = PipelineConfig {
            max_attempts: 5,
            base_delay_ms: 250,
            max_delay_ms: 2_000,
            timeout_secs: 30,
            ..Default::default()
        };
        let policy = pipeline.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = Config::from_toml("[voice]\nresponse_format = \"ogg-vorbis\"\n");
        assert!(result.is_err());
    }
}
