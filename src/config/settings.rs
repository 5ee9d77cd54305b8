use super::ConfigError;
use crate::router::RoutingThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when the trust gate itself malfunctions (not when it denies):
/// fail-closed aborts the utterance, fail-open continues without verification.
/// The default is fail-closed; degrading silently is worse than refusing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrustFailurePolicy {
    #[default]
    FailClosed,
    FailOpen,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub wakeword: WakewordConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub speaker: SpeakerConfig,
    /// Override for the declarative command source; defaults to
    /// `commands.txt` under the state root.
    #[serde(default)]
    pub registry_path: Option<PathBuf>,
    /// Override for the intent classifier's phrase artifacts; defaults to
    /// `intents.yaml` under the state root.
    #[serde(default)]
    pub intent_artifacts_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default = "default_auto_execute_threshold")]
    pub auto_execute_threshold: f64,
    #[serde(default = "default_confirmation_threshold")]
    pub confirmation_threshold: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            auto_execute_threshold: default_auto_execute_threshold(),
            confirmation_threshold: default_confirmation_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WakewordConfig {
    #[serde(default = "default_wakeword")]
    pub word: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_true")]
    pub leading_only: bool,
}

impl Default for WakewordConfig {
    fn default() -> Self {
        Self {
            word: default_wakeword(),
            case_sensitive: false,
            leading_only: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Recorder command line producing raw s16le PCM on stdout; `{duration}`
    /// is replaced with the phrase limit in seconds.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_capture_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_phrase_limit_seconds")]
    pub phrase_limit_seconds: u64,
    /// Bounded retry budget for capture timeouts in a voice session. Device
    /// errors never retry.
    #[serde(default = "default_max_capture_attempts")]
    pub max_attempts: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            command: None,
            sample_rate: default_sample_rate(),
            timeout_seconds: default_capture_timeout_seconds(),
            phrase_limit_seconds: default_phrase_limit_seconds(),
            max_attempts: default_max_capture_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriberConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeakerConfig {
    /// Whether utterances require speaker verification before routing.
    #[serde(default)]
    pub verify: bool,
    #[serde(default = "default_speaker_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub on_error: TrustFailurePolicy,
    /// Override for the trust snapshot blob; defaults to
    /// `models/speaker.json` under the state root.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            verify: false,
            threshold: default_speaker_threshold(),
            on_error: TrustFailurePolicy::default(),
            model_path: None,
        }
    }
}

fn default_auto_execute_threshold() -> f64 {
    0.75
}

fn default_confirmation_threshold() -> f64 {
    0.4
}

fn default_wakeword() -> String {
    "borealis".to_string()
}

fn default_true() -> bool {
    true
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_capture_timeout_seconds() -> u64 {
    5
}

fn default_phrase_limit_seconds() -> u64 {
    10
}

fn default_max_capture_attempts() -> u32 {
    3
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_speaker_threshold() -> f64 {
    0.5
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        RoutingThresholds::new(
            self.routing.confirmation_threshold,
            self.routing.auto_execute_threshold,
        )
        .map_err(ConfigError::Settings)?;

        if !(0.0..=1.0).contains(&self.speaker.threshold) {
            return Err(ConfigError::Settings(format!(
                "speaker threshold must be within [0, 1], got {}",
                self.speaker.threshold
            )));
        }
        if self.wakeword.word.trim().is_empty() {
            return Err(ConfigError::Settings(
                "wakeword must be non-empty".to_string(),
            ));
        }
        if self.capture.max_attempts == 0 {
            return Err(ConfigError::Settings(
                "capture max_attempts must be at least 1".to_string(),
            ));
        }
        if self.capture.sample_rate == 0 {
            return Err(ConfigError::Settings(
                "capture sample_rate must be positive".to_string(),
            ));
        }
        if let Some(command) = &self.capture.command {
            let argv = shell_words::split(command).map_err(|err| {
                ConfigError::Settings(format!("capture command is not shell-tokenizable: {err}"))
            })?;
            if argv.is_empty() {
                return Err(ConfigError::Settings(
                    "capture command must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Result<RoutingThresholds, ConfigError> {
        RoutingThresholds::new(
            self.routing.confirmation_threshold,
            self.routing.auto_execute_threshold,
        )
        .map_err(ConfigError::Settings)
    }

    pub fn resolve_registry_path(&self, state_root: &Path) -> PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(|| state_root.join("commands.txt"))
    }

    pub fn resolve_compiled_registry_path(&self, state_root: &Path) -> PathBuf {
        state_root.join("commands.json")
    }

    pub fn resolve_intent_artifacts_path(&self, state_root: &Path) -> PathBuf {
        self.intent_artifacts_path
            .clone()
            .unwrap_or_else(|| state_root.join("intents.yaml"))
    }

    pub fn resolve_speaker_model_path(&self, state_root: &Path) -> PathBuf {
        self.speaker
            .model_path
            .clone()
            .unwrap_or_else(|| state_root.join("models/speaker.json"))
    }
}
