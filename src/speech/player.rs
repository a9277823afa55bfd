// src/speech/player.rs
use log::{error, info};
use std::io;
use std::process::{Command, Stdio};
use std::thread;

use super::AudioArtifact;

/// Plays narration through an external command-line player
#[derive(Debug, Clone)]
pub struct AudioPlayer {
    command: String,
}

impl AudioPlayer {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Start playback and return immediately. The player is reaped on a
    /// background thread.
    pub fn play(&self, artifact: &AudioArtifact) -> io::Result<()> {
        info!("Playing {} with {}", artifact.path.display(), self.command);
        let mut child = Command::new(&self.command)
            .arg(&artifact.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let command = self.command.clone();
        thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => error!("{} exited with {}", command, status),
            Err(e) => error!("Failed to wait for {}: {}", command, e),
            _ => {}
        });
        Ok(())
    }
}
