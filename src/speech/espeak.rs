// src/speech/espeak.rs
use log::{info, warn};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use super::{AudioArtifact, SpeechSynthesizer};
use crate::config::SpeechConfig;
use crate::error::SynthesisError;

/// eSpeak NG backend. Writes RIFF/WAV output to a single, reused file.
pub struct EspeakSynthesizer {
    command: String,
    rate: u32,
    amplitude: u32,
    output: PathBuf,
}

impl EspeakSynthesizer {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            command: config.command.clone(),
            rate: config.rate,
            // eSpeak amplitude runs 0..=200 with 100 as normal volume
            amplitude: (config.volume * 100.0).round() as u32,
            output: config.audio_path.clone(),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "-s".to_string(),
            self.rate.to_string(),
            "-a".to_string(),
            self.amplitude.to_string(),
            "-w".to_string(),
            self.output.to_string_lossy().into_owned(),
            "--stdin".to_string(),
        ]
    }

    fn spawn_error(&self, e: std::io::Error) -> SynthesisError {
        if e.kind() == ErrorKind::NotFound {
            SynthesisError::EngineUnavailable(self.command.clone())
        } else {
            SynthesisError::Io(e)
        }
    }
}

/// Stop a child we can no longer feed and reap it.
fn abandon(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to stop speech engine: {}", e);
    }
    let _ = child.wait();
}

impl SpeechSynthesizer for EspeakSynthesizer {
    fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::NothingToSay);
        }

        // A stale file from the previous narration must not pass for fresh output.
        match std::fs::remove_file(&self.output) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SynthesisError::Io(e)),
        }

        info!(
            "Synthesizing {} chars with {} (rate {}, amplitude {})",
            text.chars().count(),
            self.command,
            self.rate,
            self.amplitude
        );

        let started = Instant::now();
        let mut child = Command::new(&self.command)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                if e.kind() != ErrorKind::BrokenPipe {
                    drop(stdin);
                    abandon(&mut child);
                    return Err(SynthesisError::Io(e));
                }
                warn!("{} closed stdin early", self.command);
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("{} exited with {}", self.command, output.status)
            } else {
                stderr
            };
            return Err(SynthesisError::Render(detail));
        }

        let bytes = match std::fs::metadata(&self.output) {
            Ok(meta) if meta.len() > 0 => meta.len(),
            _ => return Err(SynthesisError::NoAudio(self.output.clone())),
        };

        info!(
            "Narration written to {} ({} bytes) in {:.1}s",
            self.output.display(),
            bytes,
            started.elapsed().as_secs_f32()
        );

        Ok(AudioArtifact {
            path: self.output.clone(),
            mime_type: "audio/wav",
            bytes,
            spoken_chars: text.chars().count(),
        })
    }

    fn probe(&self) -> Result<String, SynthesisError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
