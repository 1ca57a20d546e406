//! Speech capture and playback adapters
//!
//! Speech engines are black-box capabilities behind two traits:
//! - `SpeechRecognizer`: one utterance per `listen()` call
//! - `SpeechSynthesizer`: speak one string to completion
//!
//! The adapters (`SpeechCapture`, `SpeechPlayback`) run engine calls on
//! spawned tasks and report their outcome on the coordinator queue.

pub mod capture;
pub mod command;
pub mod playback;

pub use capture::{SpeechCapture, SpeechRecognizer};
pub use command::{
    CommandRecognizer, CommandSynthesizer, SilentSynthesizer, SpeechFactory, UnavailableRecognizer,
};
pub use playback::{SpeechPlayback, SpeechSynthesizer, VoiceSettings};
