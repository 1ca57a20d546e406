// Speech engines backed by external programs
//
// - Capture: a speech-to-text command that records one utterance and prints
//   the transcript on stdout (e.g., a whisper.cpp wrapper script)
// - Playback: an espeak-compatible TTS command (`-s` words/min, `-p` pitch,
//   `-a` amplitude, text as the last argument)
//
// Child processes are killed when the adapter drops the engine future, which
// is how stop/cancel reach the engine.

use anyhow::{bail, Context, Result};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use super::capture::SpeechRecognizer;
use super::playback::{SpeechSynthesizer, VoiceSettings};
use crate::config::SpeechConfig;

/// Recognizer running an external speech-to-text program
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for CommandRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    async fn listen(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Placeholder for platforms without a speech-to-text engine
pub struct UnavailableRecognizer;

#[async_trait::async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    async fn listen(&self) -> Result<String> {
        bail!("no speech-to-text engine configured")
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Synthesizer running an espeak-compatible program
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// espeak flags for the voice settings
    pub fn voice_args(voice: &VoiceSettings) -> Vec<String> {
        let speed = (175.0 * voice.rate).round().clamp(80.0, 500.0);
        let pitch = (50.0 * voice.pitch).round().clamp(0.0, 99.0);
        let amplitude = (100.0 * voice.volume).round().clamp(0.0, 200.0);

        vec![
            "-s".to_string(),
            format!("{}", speed as u32),
            "-p".to_string(),
            format!("{}", pitch as u32),
            "-a".to_string(),
            format!("{}", amplitude as u32),
        ]
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .args(Self::voice_args(voice))
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Synthesizer that only logs (no TTS engine configured)
pub struct SilentSynthesizer;

#[async_trait::async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn speak(&self, text: &str, _voice: &VoiceSettings) -> Result<()> {
        debug!("(silent) {}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "silent"
    }
}

/// Speech engine factory
pub struct SpeechFactory;

impl SpeechFactory {
    /// Create the speech-to-text engine from configuration
    pub fn recognizer(config: &SpeechConfig) -> Arc<dyn SpeechRecognizer> {
        match &config.capture_command {
            Some(program) => {
                info!("Speech capture via {}", program);
                Arc::new(CommandRecognizer::new(program.clone(), config.capture_args.clone()))
            }
            None => {
                info!("Speech capture disabled (no capture_command)");
                Arc::new(UnavailableRecognizer)
            }
        }
    }

    /// Create the text-to-speech engine from configuration
    pub fn synthesizer(config: &SpeechConfig) -> Arc<dyn SpeechSynthesizer> {
        match &config.playback_command {
            Some(program) => {
                info!("Speech playback via {}", program);
                Arc::new(CommandSynthesizer::new(program.clone(), config.playback_args.clone()))
            }
            None => {
                info!("Speech playback disabled (no playback_command)");
                Arc::new(SilentSynthesizer)
            }
        }
    }
}
