// Shared fixtures for coordinator-level tests
#![allow(dead_code)]

use smart_scheduler::testing::{MockRemote, MockTransport, RecordingSynthesizer, ScriptedRecognizer};
use smart_scheduler::{Coordinator, SessionConfig, SessionIdentity, TimeSlot};
use std::sync::Arc;
use std::time::Duration;

pub struct Fixture {
    pub coordinator: Coordinator,
    pub remote: MockRemote,
    pub synth: RecordingSynthesizer,
}

pub fn fixture(config: SessionConfig, recognizer: ScriptedRecognizer) -> Fixture {
    let transport = MockTransport::new();
    let remote = transport.remote();
    let synth = RecordingSynthesizer::new();

    let coordinator = Coordinator::new(
        SessionIdentity::new("client-test"),
        config,
        Box::new(transport),
        Arc::new(recognizer),
        Arc::new(synth.clone()),
    );

    Fixture {
        coordinator,
        remote,
        synth,
    }
}

pub fn default_fixture() -> Fixture {
    fixture(SessionConfig::default(), ScriptedRecognizer::new(Vec::new()))
}

/// Process queued events until the queue stays empty for a short while
pub async fn settle(coordinator: &mut Coordinator) {
    while let Ok(true) = tokio::time::timeout(Duration::from_millis(50), coordinator.step()).await {}
}

pub fn slot(start: &str, end: &str, formatted_start: &str, formatted_end: &str) -> TimeSlot {
    TimeSlot {
        start: start.to_string(),
        end: end.to_string(),
        formatted_start: formatted_start.to_string(),
        formatted_end: formatted_end.to_string(),
        duration_minutes: 30,
    }
}

pub fn tomorrow_slot() -> TimeSlot {
    slot(
        "2024-01-02T10:00",
        "2024-01-02T10:30",
        "Jan 2, 10:00 AM",
        "Jan 2, 10:30 AM",
    )
}
