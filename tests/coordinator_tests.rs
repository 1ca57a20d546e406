// Conversation coordinator tests
//
// The coordinator is driven directly (no spawned loop); `settle` processes
// whatever the channel and speech adapters posted in the meantime.

mod common;

use anyhow::Result;
use common::{default_fixture, fixture, settle, slot, tomorrow_slot};
use smart_scheduler::testing::{Heard, ScriptedRecognizer};
use smart_scheduler::{
    booking_utterance, CaptureError, ConnectionState, OutboundMessage, Phase, PlaybackEvent, Role,
    SchedulerError, SessionConfig, SessionEvent, SpeakPolicy,
};

fn roles_and_contents(coordinator: &smart_scheduler::Coordinator) -> Vec<(Role, String)> {
    coordinator
        .conversation()
        .messages()
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}

#[tokio::test]
async fn test_submit_and_receive_slots() -> Result<()> {
    let mut f = default_fixture();

    f.coordinator.connect().await?;
    assert_eq!(f.coordinator.phase(), Phase::Idle);

    f.coordinator.submit("Schedule a meeting tomorrow")?;
    assert_eq!(f.coordinator.phase(), Phase::AwaitingReply);

    assert!(f.remote.reply("Here are some options", &[tomorrow_slot()]));
    settle(&mut f.coordinator).await;

    assert_eq!(
        roles_and_contents(&f.coordinator),
        vec![
            (Role::User, "Schedule a meeting tomorrow".to_string()),
            (Role::Agent, "Here are some options".to_string()),
        ]
    );
    assert_eq!(f.coordinator.conversation().proposed_slots(), &[tomorrow_slot()]);
    assert_eq!(f.coordinator.phase(), Phase::Idle);

    assert_eq!(
        f.remote.sent_messages(),
        vec![OutboundMessage::utterance("Schedule a meeting tomorrow")]
    );

    Ok(())
}

#[tokio::test]
async fn test_rapid_submits_keep_submission_order() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("A")?;
    f.coordinator.submit("B")?;

    // Replies arrive in the opposite order
    f.remote.reply("reply to B", &[]);
    f.remote.reply("reply to A", &[]);
    settle(&mut f.coordinator).await;

    assert_eq!(
        roles_and_contents(&f.coordinator),
        vec![
            (Role::User, "A".to_string()),
            (Role::User, "B".to_string()),
            (Role::Agent, "reply to B".to_string()),
            (Role::Agent, "reply to A".to_string()),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_awaiting_reply_until_every_submit_answered() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("A")?;
    f.coordinator.submit("B")?;

    f.remote.reply("first", &[]);
    settle(&mut f.coordinator).await;
    assert_eq!(f.coordinator.phase(), Phase::AwaitingReply);

    f.remote.reply("second", &[]);
    settle(&mut f.coordinator).await;
    assert_eq!(f.coordinator.phase(), Phase::Idle);

    Ok(())
}

#[tokio::test]
async fn test_reply_interleaved_with_local_submit() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("A")?;
    f.remote.reply("reply to A", &[]);
    settle(&mut f.coordinator).await;
    f.coordinator.submit("B")?;

    assert_eq!(
        roles_and_contents(&f.coordinator),
        vec![
            (Role::User, "A".to_string()),
            (Role::Agent, "reply to A".to_string()),
            (Role::User, "B".to_string()),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_empty_submit_has_no_side_effects() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    for blank in ["", "   ", "\n\t "] {
        let err = f.coordinator.submit(blank).unwrap_err();
        assert!(matches!(err, SchedulerError::EmptyUtterance));
    }
    settle(&mut f.coordinator).await;

    assert!(f.coordinator.conversation().messages().is_empty());
    assert!(f.remote.sent().is_empty());
    assert!(f.synth.spoken().is_empty());
    assert_eq!(f.coordinator.phase(), Phase::Idle);

    Ok(())
}

#[tokio::test]
async fn test_submit_is_trimmed() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("  Friday afternoon  ")?;

    assert_eq!(
        f.coordinator.conversation().messages()[0].content,
        "Friday afternoon"
    );
    assert_eq!(
        f.remote.sent_messages(),
        vec![OutboundMessage::utterance("Friday afternoon")]
    );

    Ok(())
}

#[tokio::test]
async fn test_submit_while_disconnected_is_rejected() -> Result<()> {
    let mut f = default_fixture();

    let err = f.coordinator.submit("hello").unwrap_err();

    assert!(matches!(err, SchedulerError::NotConnected));
    assert!(f.coordinator.conversation().messages().is_empty());
    assert!(f.remote.sent().is_empty());
    assert_eq!(f.coordinator.phase(), Phase::NotConnected);

    let last_error = f.coordinator.last_error().unwrap_or_default();
    assert!(last_error.contains("not connected"), "got {:?}", last_error);

    Ok(())
}

#[tokio::test]
async fn test_submit_after_connection_lost_is_not_queued() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.remote.drop_connection("network");
    settle(&mut f.coordinator).await;

    assert!(f.coordinator.submit("lost?").is_err());

    f.coordinator.connect().await?;
    settle(&mut f.coordinator).await;
    assert!(
        f.remote.sent().is_empty(),
        "rejected utterance is not delivered on reconnect"
    );

    Ok(())
}

#[tokio::test]
async fn test_reply_without_slots_keeps_proposed_slots() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("Tomorrow")?;
    f.remote.reply("Here are some options", &[tomorrow_slot()]);
    settle(&mut f.coordinator).await;

    f.coordinator.submit("Anything earlier?")?;
    f.remote.reply("Those are the only ones", &[]);
    f.remote
        .push_text(r#"{"type":"response","content":"No slots field at all"}"#);
    settle(&mut f.coordinator).await;

    assert_eq!(f.coordinator.conversation().proposed_slots(), &[tomorrow_slot()]);
    assert_eq!(f.coordinator.conversation().messages().len(), 5);

    Ok(())
}

#[tokio::test]
async fn test_new_slots_replace_old_list() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    let first = vec![
        tomorrow_slot(),
        slot("2024-01-02T11:00", "2024-01-02T11:30", "Jan 2, 11:00 AM", "Jan 2, 11:30 AM"),
    ];
    let second = vec![slot(
        "2024-01-03T09:00",
        "2024-01-03T09:30",
        "Jan 3, 9:00 AM",
        "Jan 3, 9:30 AM",
    )];

    f.coordinator.submit("Tomorrow")?;
    f.remote.reply("Two options", &first);
    settle(&mut f.coordinator).await;
    assert_eq!(f.coordinator.conversation().proposed_slots(), first.as_slice());

    f.coordinator.submit("Wednesday instead")?;
    f.remote.reply("One option", &second);
    settle(&mut f.coordinator).await;
    assert_eq!(f.coordinator.conversation().proposed_slots(), second.as_slice());

    Ok(())
}

#[tokio::test]
async fn test_select_slot_sends_one_booking_utterance() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("Tomorrow")?;
    f.remote.reply("Here are some options", &[tomorrow_slot()]);
    settle(&mut f.coordinator).await;
    let sent_before = f.remote.sent().len();
    let messages_before = f.coordinator.conversation().messages().len();

    f.coordinator.select_slot(0)?;

    let sent = f.remote.sent_messages();
    assert_eq!(sent.len(), sent_before + 1);
    assert_eq!(
        sent.last(),
        Some(&OutboundMessage::utterance(booking_utterance(&tomorrow_slot())))
    );

    let messages = f.coordinator.conversation().messages();
    assert_eq!(messages.len(), messages_before + 1);
    let booking = &messages[messages.len() - 1];
    assert_eq!(booking.role, Role::User);
    assert!(booking.content.contains("Jan 2, 10:00 AM"));

    // Slots stay until the agent replaces them
    assert_eq!(f.coordinator.conversation().proposed_slots().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_select_missing_slot() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    let err = f.coordinator.select_slot(3).unwrap_err();

    assert!(matches!(err, SchedulerError::SlotNotFound(3)));
    assert!(f.remote.sent().is_empty());
    assert!(f.coordinator.conversation().messages().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_reset_while_connected() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("Tomorrow")?;
    f.remote.reply("Here are some options", &[tomorrow_slot()]);
    settle(&mut f.coordinator).await;

    f.coordinator.reset();

    assert!(f.coordinator.conversation().messages().is_empty());
    assert!(f.coordinator.conversation().proposed_slots().is_empty());
    assert_eq!(f.remote.sent_messages().last(), Some(&OutboundMessage::ResetRequest));
    assert_eq!(f.coordinator.phase(), Phase::Idle);

    // The agent's acknowledgement does not add anything
    f.remote.push_text(r#"{"type":"reset_complete","message":"Conversation reset"}"#);
    settle(&mut f.coordinator).await;
    assert!(f.coordinator.conversation().messages().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_snapshot_counts_resets() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;
    f.coordinator.submit("Tomorrow")?;
    settle(&mut f.coordinator).await;
    assert_eq!(f.coordinator.snapshot().resets, 0);

    f.coordinator.reset();
    f.coordinator.submit("Friday instead")?;
    f.coordinator.submit("Afternoon")?;
    settle(&mut f.coordinator).await;

    // Longer log than before the reset, yet the reset is still visible
    let snapshot = f.coordinator.snapshot();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.resets, 1);

    Ok(())
}

#[tokio::test]
async fn test_reset_while_disconnected_still_clears() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("Tomorrow")?;
    f.remote.reply("Here are some options", &[tomorrow_slot()]);
    settle(&mut f.coordinator).await;

    f.coordinator.disconnect().await;
    settle(&mut f.coordinator).await;
    let sent_before = f.remote.sent().len();

    f.coordinator.reset();

    assert!(f.coordinator.conversation().messages().is_empty());
    assert!(f.coordinator.conversation().proposed_slots().is_empty());
    assert_eq!(f.remote.sent().len(), sent_before, "no reset frame sent");

    Ok(())
}

#[tokio::test]
async fn test_disconnect_preserves_conversation() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("Tomorrow")?;
    f.remote.reply("Here are some options", &[tomorrow_slot()]);
    settle(&mut f.coordinator).await;

    f.coordinator.disconnect().await;
    settle(&mut f.coordinator).await;

    assert_eq!(f.coordinator.connection_state(), ConnectionState::Disconnected);
    assert_eq!(f.coordinator.phase(), Phase::NotConnected);
    assert_eq!(f.coordinator.conversation().messages().len(), 2);
    assert_eq!(f.coordinator.conversation().proposed_slots().len(), 1);

    // Reconnect resumes with the same identity and history
    f.coordinator.connect().await?;
    assert_eq!(f.coordinator.phase(), Phase::Idle);
    assert_eq!(f.coordinator.conversation().messages().len(), 2);

    let opened = f.remote.opened();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0], opened[1]);
    assert_eq!(&opened[0], f.coordinator.identity());

    Ok(())
}

#[tokio::test]
async fn test_clear_slots_on_disconnect_option() -> Result<()> {
    let config = SessionConfig {
        clear_slots_on_disconnect: true,
        ..SessionConfig::default()
    };
    let mut f = fixture(config, ScriptedRecognizer::new(Vec::new()));
    f.coordinator.connect().await?;

    f.coordinator.submit("Tomorrow")?;
    f.remote.reply("Here are some options", &[tomorrow_slot()]);
    settle(&mut f.coordinator).await;

    f.coordinator.disconnect().await;

    assert!(f.coordinator.conversation().proposed_slots().is_empty());
    assert_eq!(f.coordinator.conversation().messages().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_unexpected_close_reports_connection_error() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;
    f.coordinator.submit("Tomorrow")?;

    f.remote.drop_connection("server restarting");
    settle(&mut f.coordinator).await;

    assert_eq!(f.coordinator.phase(), Phase::NotConnected);
    let last_error = f.coordinator.last_error().unwrap_or_default();
    assert!(last_error.contains("server restarting"), "got {:?}", last_error);
    assert_eq!(f.coordinator.conversation().messages().len(), 1);

    // A successful reconnect clears the error and pending replies
    f.coordinator.connect().await?;
    assert_eq!(f.coordinator.last_error(), None);
    assert_eq!(f.coordinator.phase(), Phase::Idle);

    Ok(())
}

/// Wait until the channel reader has seen the close, leaving its events queued
async fn wait_until_disconnected(coordinator: &smart_scheduler::Coordinator) {
    while coordinator.connection_state() != ConnectionState::Disconnected {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_reconnect_before_close_is_processed() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.remote.drop_connection("agent restarted");
    wait_until_disconnected(&f.coordinator).await;

    f.coordinator.connect().await?;
    f.coordinator.submit("hello")?;
    settle(&mut f.coordinator).await;

    // The old link's close does not touch the new session
    assert_eq!(f.coordinator.connection_state(), ConnectionState::Connected);
    assert_eq!(f.coordinator.phase(), Phase::AwaitingReply);
    assert_eq!(f.coordinator.last_error(), None);

    f.remote.reply("hi", &[]);
    settle(&mut f.coordinator).await;
    assert_eq!(f.coordinator.phase(), Phase::Idle);

    Ok(())
}

#[tokio::test]
async fn test_reply_from_replaced_link_is_logged_but_not_counted() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;
    f.coordinator.submit("A")?;

    f.remote.reply("reply to A", &[tomorrow_slot()]);
    f.remote.drop_connection("agent restarted");
    wait_until_disconnected(&f.coordinator).await;

    f.coordinator.connect().await?;
    f.coordinator.submit("B")?;
    settle(&mut f.coordinator).await;

    assert_eq!(
        roles_and_contents(&f.coordinator),
        vec![
            (Role::User, "A".to_string()),
            (Role::User, "B".to_string()),
            (Role::Agent, "reply to A".to_string()),
        ]
    );
    assert_eq!(f.coordinator.conversation().proposed_slots(), &[tomorrow_slot()]);
    assert_eq!(f.coordinator.phase(), Phase::AwaitingReply, "B is still unanswered");

    Ok(())
}

#[tokio::test]
async fn test_reconnect_stops_listening_from_lost_link() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![Heard::Silence]);
    let mut f = fixture(SessionConfig::default(), recognizer);
    f.coordinator.connect().await?;
    f.coordinator.start_listening()?;

    f.remote.drop_connection("agent restarted");
    wait_until_disconnected(&f.coordinator).await;
    f.coordinator.connect().await?;

    assert!(!f.coordinator.snapshot().listening);

    Ok(())
}

#[tokio::test]
async fn test_refused_connect() -> Result<()> {
    let mut f = default_fixture();
    f.remote.refuse_connections(true);

    let err = f.coordinator.connect().await.unwrap_err();

    assert!(matches!(err, SchedulerError::Connection(_)));
    assert_eq!(f.coordinator.phase(), Phase::NotConnected);
    assert!(f.coordinator.last_error().is_some());

    f.remote.refuse_connections(false);
    f.coordinator.connect().await?;
    assert_eq!(f.coordinator.connection_state(), ConnectionState::Connected);

    Ok(())
}

#[tokio::test]
async fn test_malformed_frame_does_not_halt_processing() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;
    f.coordinator.submit("Tomorrow")?;

    f.remote.push_text("not json");
    f.remote.push_text(r#"{"type":"mystery"}"#);
    f.remote.reply("Here are some options", &[tomorrow_slot()]);
    settle(&mut f.coordinator).await;

    assert_eq!(f.coordinator.conversation().messages().len(), 2);
    assert_eq!(f.coordinator.conversation().proposed_slots().len(), 1);
    assert_eq!(f.coordinator.connection_state(), ConnectionState::Connected);

    Ok(())
}

#[tokio::test]
async fn test_agent_error_frame() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.remote
        .push_text(r#"{"type":"error","message":"Calendar service unavailable"}"#);
    settle(&mut f.coordinator).await;

    assert_eq!(
        f.coordinator.last_error(),
        Some("Calendar service unavailable")
    );
    assert!(f.coordinator.conversation().messages().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_housekeeping_frames_do_not_touch_log() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.remote.push_text(r#"{"type":"connected","message":"Connected"}"#);
    f.remote.push_text(r#"{"type":"processing","message":"Processing your request..."}"#);
    settle(&mut f.coordinator).await;

    assert!(f.coordinator.conversation().messages().is_empty());
    assert_eq!(f.coordinator.last_error(), None);

    Ok(())
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_default_policy_speaks_user_utterance() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("Schedule a meeting tomorrow")?;
    f.remote.reply("Here are some options", &[]);
    settle(&mut f.coordinator).await;

    assert_eq!(f.synth.spoken(), vec!["Schedule a meeting tomorrow"]);

    Ok(())
}

#[tokio::test]
async fn test_agent_reply_policy() -> Result<()> {
    let config = SessionConfig {
        speak_policy: SpeakPolicy::AgentReply,
        ..SessionConfig::default()
    };
    let mut f = fixture(config, ScriptedRecognizer::new(Vec::new()));
    f.coordinator.connect().await?;

    f.coordinator.submit("Schedule a meeting tomorrow")?;
    f.remote.reply("Here are some options", &[]);
    settle(&mut f.coordinator).await;

    assert_eq!(f.synth.spoken(), vec!["Here are some options"]);

    Ok(())
}

#[tokio::test]
async fn test_speech_off_policy() -> Result<()> {
    let config = SessionConfig {
        speak_policy: SpeakPolicy::Off,
        ..SessionConfig::default()
    };
    let mut f = fixture(config, ScriptedRecognizer::new(Vec::new()));
    f.coordinator.connect().await?;

    f.coordinator.submit("Schedule a meeting tomorrow")?;
    f.remote.reply("Here are some options", &[]);
    settle(&mut f.coordinator).await;

    assert!(f.synth.spoken().is_empty());
    assert!(!f.coordinator.snapshot().speaking);

    Ok(())
}

#[tokio::test]
async fn test_late_start_of_replaced_utterance() -> Result<()> {
    let mut f = default_fixture();
    f.coordinator.connect().await?;

    f.coordinator.submit("first")?;
    f.coordinator.submit("second")?;
    settle(&mut f.coordinator).await;

    // Playback tasks may report in any order across utterances
    f.coordinator
        .handle_event(SessionEvent::Playback(PlaybackEvent::Started { utterance: 2 }))
        .await;
    f.coordinator
        .handle_event(SessionEvent::Playback(PlaybackEvent::Started { utterance: 1 }))
        .await;
    f.coordinator
        .handle_event(SessionEvent::Playback(PlaybackEvent::Ended {
            utterance: 1,
            interrupted: true,
        }))
        .await;

    assert!(f.coordinator.snapshot().speaking, "utterance 2 is still playing");

    f.coordinator
        .handle_event(SessionEvent::Playback(PlaybackEvent::Ended {
            utterance: 2,
            interrupted: false,
        }))
        .await;
    assert!(!f.coordinator.snapshot().speaking);

    Ok(())
}

#[tokio::test]
async fn test_transcript_is_submitted() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![Heard::Transcript(
        "Schedule a meeting tomorrow".to_string(),
    )]);
    let mut f = fixture(SessionConfig::default(), recognizer);
    f.coordinator.connect().await?;

    f.coordinator.start_listening()?;
    settle(&mut f.coordinator).await;

    assert!(!f.coordinator.snapshot().listening);
    assert_eq!(
        roles_and_contents(&f.coordinator),
        vec![(Role::User, "Schedule a meeting tomorrow".to_string())]
    );
    assert_eq!(
        f.remote.sent_messages(),
        vec![OutboundMessage::utterance("Schedule a meeting tomorrow")]
    );

    Ok(())
}

#[tokio::test]
async fn test_stop_listening_discards_episode() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![Heard::Silence]);
    let mut f = fixture(SessionConfig::default(), recognizer);
    f.coordinator.connect().await?;

    f.coordinator.start_listening()?;
    assert!(f.coordinator.snapshot().listening);

    f.coordinator.stop_listening();
    settle(&mut f.coordinator).await;

    assert!(!f.coordinator.snapshot().listening);
    assert!(f.coordinator.conversation().messages().is_empty());
    assert!(f.remote.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_listening_requires_connection() -> Result<()> {
    let mut f = default_fixture();

    let err = f.coordinator.start_listening().unwrap_err();

    assert!(matches!(err, SchedulerError::NotConnected));
    assert!(!f.coordinator.snapshot().listening);

    Ok(())
}

#[tokio::test]
async fn test_capture_unavailable() -> Result<()> {
    let mut f = fixture(SessionConfig::default(), ScriptedRecognizer::unavailable());
    assert!(!f.coordinator.snapshot().capture_available);

    f.coordinator.connect().await?;
    let err = f.coordinator.start_listening().unwrap_err();

    assert!(matches!(
        err,
        SchedulerError::SpeechCapture(CaptureError::Unavailable)
    ));
    assert!(!f.coordinator.snapshot().listening);

    Ok(())
}

#[tokio::test]
async fn test_capture_error_is_reported() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![Heard::Error("audio-capture".to_string())]);
    let mut f = fixture(SessionConfig::default(), recognizer);
    f.coordinator.connect().await?;

    f.coordinator.start_listening()?;
    settle(&mut f.coordinator).await;

    let last_error = f.coordinator.last_error().unwrap_or_default();
    assert!(last_error.contains("audio-capture"), "got {:?}", last_error);
    assert!(f.coordinator.conversation().messages().is_empty());
    assert_eq!(f.coordinator.connection_state(), ConnectionState::Connected);

    Ok(())
}

#[tokio::test]
async fn test_disconnect_stops_listening() -> Result<()> {
    let recognizer = ScriptedRecognizer::new(vec![Heard::Silence]);
    let mut f = fixture(SessionConfig::default(), recognizer);
    f.coordinator.connect().await?;

    f.coordinator.start_listening()?;
    f.coordinator.disconnect().await;
    settle(&mut f.coordinator).await;

    assert!(!f.coordinator.snapshot().listening);

    Ok(())
}

// ---------------------------------------------------------------------------
// Handle and snapshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_handle_drives_running_coordinator() -> Result<()> {
    let f = default_fixture();
    let remote = f.remote.clone();
    let handle = f.coordinator.handle();
    let mut updates = handle.subscribe();
    let runner = tokio::spawn(f.coordinator.run());

    handle.connect().await?;
    handle.submit("Schedule a meeting tomorrow").await?;
    assert_eq!(handle.snapshot().phase, Phase::AwaitingReply);

    remote.reply("Here are some options", &[tomorrow_slot()]);
    let snapshot = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        updates.wait_for(|s| s.proposed_slots.len() == 1),
    )
    .await??
    .clone();

    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.phase, Phase::Idle);
    assert_eq!(snapshot.connection, ConnectionState::Connected);

    handle.select_slot(0).await?;
    assert!(matches!(
        handle.select_slot(5).await,
        Err(SchedulerError::SlotNotFound(5))
    ));

    handle.shutdown().await?;
    runner.await?;

    assert!(!remote.is_open(), "shutdown closes the channel");
    assert!(matches!(
        handle.submit("after shutdown").await,
        Err(SchedulerError::Stopped)
    ));

    Ok(())
}

#[tokio::test]
async fn test_snapshot_reflects_rejections() -> Result<()> {
    let f = default_fixture();
    let handle = f.coordinator.handle();
    let runner = tokio::spawn(f.coordinator.run());

    assert!(matches!(
        handle.submit("hello").await,
        Err(SchedulerError::NotConnected)
    ));
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.phase, Phase::NotConnected);
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.last_error.is_some());

    handle.shutdown().await?;
    runner.await?;

    Ok(())
}
