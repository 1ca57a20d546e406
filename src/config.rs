use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::session::{SessionConfig, SpeakPolicy};
use crate::speech::VoiceSettings;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub speech: SpeechConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "smart-scheduler".to_string(),
            http: HttpConfig::default(),
        }
    }
}

/// Control API listener
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

/// Where the scheduling agent lives
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// HTTP base for the auth endpoints
    pub api_url: String,
    /// WebSocket base; the channel is `{ws_url}/ws/{identity}`
    pub ws_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speech-to-text program; capture is disabled when unset
    pub capture_command: Option<String>,
    pub capture_args: Vec<String>,
    /// Listening episodes end as cancelled after this long (0 = never)
    pub capture_timeout_secs: u64,
    /// espeak-compatible TTS program; playback is silent when unset
    pub playback_command: Option<String>,
    pub playback_args: Vec<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Which text gets spoken
    pub speak: SpeakPolicy,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            capture_command: None,
            capture_args: Vec::new(),
            capture_timeout_secs: 30,
            playback_command: None,
            playback_args: Vec::new(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            speak: SpeakPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Drop proposed slots when the channel is disconnected
    pub clear_slots_on_disconnect: bool,
}

impl Config {
    /// Load from a config file; every field has a default so the file is optional
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Coordinator settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        let timeout = match self.speech.capture_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        SessionConfig {
            speak_policy: self.speech.speak,
            clear_slots_on_disconnect: self.conversation.clear_slots_on_disconnect,
            capture_timeout: timeout,
            voice: VoiceSettings {
                rate: self.speech.rate,
                pitch: self.speech.pitch,
                volume: self.speech.volume,
            },
        }
    }
}
