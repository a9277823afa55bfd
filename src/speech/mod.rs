// src/speech/mod.rs
use std::path::PathBuf;

pub mod espeak;
pub mod player;

pub use espeak::EspeakSynthesizer;
pub use player::AudioPlayer;

use crate::error::SynthesisError;

/// A rendered narration on disk. `mime_type` is whatever the engine really
/// wrote; eSpeak NG produces `audio/wav`, not `audio/mpeg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub bytes: u64,
    /// Characters of text that went into this narration
    pub spoken_chars: usize,
}

/// Text-to-speech backend
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` to the narration file, replacing whatever was there.
    fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError>;

    /// Report the engine version if it can be started
    fn probe(&self) -> Result<String, SynthesisError>;
}
