// src/config.rs
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::StartupError;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const NARRATION_FILE: &str = "visionvoice-narration.wav";

/// Raw settings as given on the command line or in the environment.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// API key for the vision model
    #[arg(long, env = API_KEY_VAR, hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Vision model name
    #[arg(long, env = "VISION_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Base URL of the model API
    #[arg(long, env = "GEMINI_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    pub endpoint: String,

    /// Request timeout for the vision model, in seconds
    #[arg(long, default_value_t = 300, global = true)]
    pub timeout_secs: u64,

    /// Directory holding Tesseract language data (library default when unset)
    #[arg(long, global = true)]
    pub tessdata: Option<String>,

    /// Tesseract language pack
    #[arg(long, default_value = "eng", global = true)]
    pub ocr_lang: String,

    /// eSpeak NG executable
    #[arg(long, env = "ESPEAK_CMD", default_value = "espeak-ng", global = true)]
    pub espeak: String,

    /// Speaking rate in words per minute
    #[arg(long, default_value_t = 150, global = true)]
    pub speech_rate: u32,

    /// Speaking volume between 0.0 and 1.0
    #[arg(long, default_value_t = 1.0, global = true)]
    pub speech_volume: f32,

    /// Where the narration audio is written (overwritten on every narration)
    #[arg(long, global = true)]
    pub audio_path: Option<PathBuf>,

    /// Program used to play narration audio
    #[arg(long, env = "AUDIO_PLAYER", global = true)]
    pub player: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub datapath: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub command: String,
    pub rate: u32,
    pub volume: f32,
    pub audio_path: PathBuf,
    pub player: String,
}

/// Validated configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub ocr: OcrConfig,
    pub speech: SpeechConfig,
}

impl Config {
    pub fn resolve(settings: Settings) -> Result<Self, StartupError> {
        let api_key = settings
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(StartupError::MissingCredential(API_KEY_VAR))?;

        if settings.model.trim().is_empty() {
            return Err(StartupError::InvalidSetting {
                name: "model",
                reason: "must not be empty".to_string(),
            });
        }
        if !(settings.endpoint.starts_with("http://") || settings.endpoint.starts_with("https://")) {
            return Err(StartupError::InvalidSetting {
                name: "endpoint",
                reason: format!("`{}` is not an http(s) URL", settings.endpoint),
            });
        }
        if settings.timeout_secs == 0 {
            return Err(StartupError::InvalidSetting {
                name: "timeout-secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if settings.speech_rate == 0 {
            return Err(StartupError::InvalidSetting {
                name: "speech-rate",
                reason: "must be at least 1 word per minute".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&settings.speech_volume) {
            return Err(StartupError::InvalidSetting {
                name: "speech-volume",
                reason: format!("{} is outside 0.0..=1.0", settings.speech_volume),
            });
        }

        let audio_path = settings
            .audio_path
            .unwrap_or_else(|| std::env::temp_dir().join(NARRATION_FILE));
        let player = settings.player.unwrap_or_else(|| default_player().to_string());

        Ok(Self {
            model: ModelConfig {
                api_key,
                model: settings.model.trim().to_string(),
                endpoint: settings.endpoint.trim_end_matches('/').to_string(),
                timeout: Duration::from_secs(settings.timeout_secs),
            },
            ocr: OcrConfig {
                datapath: settings.tessdata,
                language: settings.ocr_lang,
            },
            speech: SpeechConfig {
                command: settings.espeak,
                rate: settings.speech_rate,
                volume: settings.speech_volume,
                audio_path,
                player,
            },
        })
    }
}

fn default_player() -> &'static str {
    if cfg!(target_os = "macos") {
        "afplay"
    } else {
        "aplay"
    }
}
