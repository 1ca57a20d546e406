use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::speech::VoiceSettings;

/// Which text the coordinator hands to speech playback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakPolicy {
    /// Read back each submitted utterance
    #[default]
    UserUtterance,
    /// Read each agent reply aloud
    AgentReply,
    /// Never speak
    Off,
}

/// Configuration for a conversation coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// What gets spoken after submits and replies
    pub speak_policy: SpeakPolicy,

    /// Drop proposed slots when the channel disconnects
    /// Default: false (messages and slots survive a reconnect)
    pub clear_slots_on_disconnect: bool,

    /// Listening episodes longer than this end as cancelled
    /// Default: 30 seconds
    pub capture_timeout: Option<Duration>,

    /// Rate/pitch/volume for playback
    pub voice: VoiceSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speak_policy: SpeakPolicy::UserUtterance,
            clear_slots_on_disconnect: false,
            capture_timeout: Some(Duration::from_secs(30)),
            voice: VoiceSettings::default(),
        }
    }
}
