//! Tests for how backend events and commands change the session.
//!
//! The controller applies state only from backend events, in delivery order.
//! Commands are forwarded and never change local state by themselves.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use meeting_session::actors::{MeetingSessionControllerHandle, SessionNotification, SessionState};
use meeting_session::backend::{BackendCommand, BackendConnector, RawEvent};
use meeting_session::errors::{BackendError, SessionError};
use meeting_session_test_utils::{
    chat_bodies, events, participant_ids, wait_for_snapshot, MockBackend, TestSessionConfig,
};
use serde_json::json;

async fn joined(backend: &MockBackend) -> MeetingSessionControllerHandle {
    let connector = Arc::new(BackendConnector::new(backend.as_backend()));
    let controller = MeetingSessionControllerHandle::new(connector, Duration::from_secs(1));
    controller
        .join(TestSessionConfig::new("room-1").display_name("Ann").build())
        .await
        .unwrap();
    controller
}

// ============================================================================
// Roster
// ============================================================================

#[tokio::test]
async fn test_registry_size_tracks_joins_minus_matching_leaves() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    backend.emit(events::participant_joined("p1", Some("Bob")));
    backend.emit(events::participant_joined("p2", Some("Cy")));
    backend.emit(events::participant_joined("p1", Some("Bob again")));
    backend.emit(events::participant_left("p9"));
    backend.emit(events::participant_left("p1"));
    backend.emit(events::participant_joined("p3", None));
    backend.emit(events::participant_left("local"));

    let snapshot = wait_for_snapshot(&controller, |s| {
        participant_ids(s) == ["local", "p2", "p3"]
    })
    .await;

    let p3 = snapshot.participants.iter().find(|p| p.id == "p3").unwrap();
    assert_eq!(p3.display_name, "Anonymous");
    assert!(!p3.is_audio_muted);
    assert!(!p3.is_video_muted);
    assert_eq!(
        snapshot.participants.iter().filter(|p| p.is_local).count(),
        1
    );
}

#[tokio::test]
async fn test_participant_left_scenario() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    backend.emit(events::participant_joined("p1", Some("Bob")));
    wait_for_snapshot(&controller, |s| participant_ids(s) == ["local", "p1"]).await;

    backend.emit(events::participant_left("p1"));
    let snapshot = wait_for_snapshot(&controller, |s| participant_ids(s) == ["local"]).await;
    assert_eq!(snapshot.state, SessionState::Active);
}

#[tokio::test]
async fn test_roster_notifications() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;
    let mut notifications = controller.subscribe_notifications();

    backend.emit(events::participant_joined("p1", Some("Bob")));
    backend.emit(events::participant_joined("p1", Some("Bob")));
    backend.emit(events::participant_left("p1"));

    assert_eq!(
        notifications.recv().await.unwrap(),
        SessionNotification::ParticipantJoined {
            id: "p1".to_string(),
            display_name: "Bob".to_string()
        }
    );
    assert_eq!(
        notifications.recv().await.unwrap(),
        SessionNotification::ParticipantLeft {
            id: "p1".to_string()
        }
    );
}

#[tokio::test]
async fn test_kicked_remote_participant_removed() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    backend.emit(events::participant_joined("p1", Some("Bob")));
    backend.emit(events::kicked("p1", false));

    let snapshot = wait_for_snapshot(&controller, |s| {
        s.state == SessionState::Active && participant_ids(s) == ["local"]
    })
    .await;
    assert!(snapshot.last_end_reason.is_none());
}

// ============================================================================
// Media state
// ============================================================================

#[tokio::test]
async fn test_toggle_audio_is_not_optimistic() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    controller.toggle_audio().await.unwrap();

    let snapshot = controller.get_snapshot().await.unwrap();
    assert!(!snapshot.is_audio_muted);
    assert!(!snapshot.participants.first().unwrap().is_audio_muted);
    assert_eq!(backend.commands(), vec![BackendCommand::ToggleAudio]);

    backend.emit(events::audio_mute(None, true));
    let snapshot = wait_for_snapshot(&controller, |s| s.is_audio_muted).await;
    assert!(snapshot.participants.first().unwrap().is_audio_muted);
}

#[tokio::test]
async fn test_echoing_backend_applies_toggles() {
    let backend = MockBackend::builder().echo_commands().build();
    let controller = joined(&backend).await;

    controller.toggle_video().await.unwrap();
    controller.toggle_screen_share().await.unwrap();

    let snapshot =
        wait_for_snapshot(&controller, |s| s.is_video_muted && s.is_screen_sharing).await;
    assert!(snapshot.participants.first().unwrap().is_video_muted);
    assert!(!snapshot.is_audio_muted);
}

#[tokio::test]
async fn test_remote_mute_updates_only_that_participant() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    backend.emit(events::participant_joined("p1", Some("Bob")));
    backend.emit(events::audio_mute(Some("p1"), true));
    backend.emit(events::video_mute(Some("p1"), true));
    backend.emit(events::audio_mute(Some("ghost"), true));

    let snapshot = wait_for_snapshot(&controller, |s| {
        s.participants
            .iter()
            .any(|p| p.id == "p1" && p.is_audio_muted && p.is_video_muted)
    })
    .await;
    assert!(!snapshot.is_audio_muted);
    assert!(!snapshot.is_video_muted);
    assert!(!snapshot.participants.first().unwrap().is_audio_muted);
    assert_eq!(snapshot.participants.len(), 2);
}

#[tokio::test]
async fn test_rejected_command_leaves_state_unchanged() {
    let backend = MockBackend::builder().reject_commands().build();
    let controller = joined(&backend).await;

    let result = controller.toggle_audio().await;
    match result {
        Err(err @ SessionError::CommandFailed(BackendError::CommandRejected(_))) => {
            assert_eq!(err.as_label(), "command_failed");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }

    let snapshot = controller.get_snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Active);
    assert!(!snapshot.is_audio_muted);
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_chat_in_arrival_order_and_send_does_not_append() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    controller.send_chat_message("from Ann").await.unwrap();
    assert!(controller.get_snapshot().await.unwrap().chat.is_empty());
    assert_eq!(
        backend.commands(),
        vec![BackendCommand::SendChatMessage("from Ann".to_string())]
    );

    backend.emit(events::chat(Some("Bob"), "one"));
    backend.emit(events::chat(None, "two"));
    backend.emit(events::chat(Some("Ann"), "from Ann"));

    let snapshot = wait_for_snapshot(&controller, |s| s.chat.len() == 3).await;
    assert_eq!(chat_bodies(&snapshot), vec!["one", "two", "from Ann"]);
    let senders: Vec<_> = snapshot.chat.iter().map(|m| m.sender.as_str()).collect();
    assert_eq!(senders, vec!["Bob", "Anonymous", "Ann"]);

    let ids: std::collections::HashSet<_> = snapshot.chat.iter().map(|m| &m.id).collect();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn test_blank_chat_message_not_sent() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    controller.send_chat_message("  \n ").await.unwrap();
    assert!(backend.commands().is_empty());
}

// ============================================================================
// Forward compatibility
// ============================================================================

#[tokio::test]
async fn test_unknown_and_malformed_events_ignored() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;

    backend.emit(events::unknown("raiseHandUpdated"));
    backend.emit(RawEvent::new(
        "participantJoined",
        json!({ "displayName": "No Id" }),
    ));
    backend.emit(RawEvent::new("audioMuteStatusChanged", json!({ "muted": "yes" })));
    backend.emit(events::conference_joined("room-1"));
    backend.emit(events::screen_share(true));

    let snapshot = wait_for_snapshot(&controller, |s| s.is_screen_sharing).await;
    assert_eq!(snapshot.state, SessionState::Active);
    assert_eq!(participant_ids(&snapshot), vec!["local"]);
    assert!(!snapshot.is_audio_muted);
}

#[tokio::test]
async fn test_snapshot_serializes_for_presentation_layer() {
    let backend = MockBackend::healthy();
    let controller = joined(&backend).await;
    backend.emit(events::participant_joined("p1", Some("Bob")));
    let snapshot = wait_for_snapshot(&controller, |s| s.participants.len() == 2).await;

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["state"], "active");
    assert_eq!(json["roomId"], "room-1");
    assert!(json["elapsedSeconds"].is_u64());
    assert_eq!(json["participants"][0]["isLocal"], true);
    assert_eq!(json["participants"][1]["displayName"], "Bob");
}
