//! Meeting Session demo driver
//!
//! Runs one meeting session against the in-process loopback backend.
//!
//! # Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing and the Prometheus metrics recorder
//! 3. Spawn the session controller over a shared `BackendConnector`
//! 4. Join the default room and exercise the session commands
//! 5. Wait for Ctrl-C or `MEETING_DEMO_SECONDS`
//! 6. Leave and log the rendered metrics

#![warn(clippy::pedantic)]

use std::sync::Arc;
use std::time::Duration;

use meeting_session::actors::{MeetingSessionControllerHandle, SessionNotification};
use meeting_session::backend::loopback::LoopbackBackend;
use meeting_session::backend::BackendConnector;
use meeting_session::config::Config;
use meeting_session::observability::init_metrics_recorder;
use meeting_session::timer::format_elapsed;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default demo duration.
const DEFAULT_DEMO_SECONDS: u64 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_session=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting meeting session demo");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        domain = %config.domain,
        default_room = %config.default_room,
        is_admin = config.is_admin,
        max_participants = config.max_participants,
        tick_interval_ms = u64::try_from(config.tick_interval.as_millis()).unwrap_or(u64::MAX),
        "Configuration loaded successfully"
    );

    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let demo_duration = demo_duration()?;

    let backend = Arc::new(LoopbackBackend::new(config.domain.clone()));
    let connector = Arc::new(BackendConnector::new(backend));
    let controller = MeetingSessionControllerHandle::new(connector, config.tick_interval);

    let mut notifications = controller.subscribe_notifications();
    let notification_task = tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            match notification {
                SessionNotification::Joined { room_id } => {
                    info!(room_id = %room_id, "Joined meeting");
                }
                SessionNotification::Ended { reason } => {
                    info!(reason = reason.as_label(), "Meeting ended");
                }
                SessionNotification::ParticipantJoined { id, .. } => {
                    info!(participant_id = %id, "Participant joined");
                }
                SessionNotification::ParticipantLeft { id } => {
                    info!(participant_id = %id, "Participant left");
                }
            }
        }
    });

    let session_config = config.default_session_config();
    info!(
        meeting_link = %config.meeting_link(&session_config.room_id),
        "Share this link to invite participants"
    );

    controller.join(session_config).await.map_err(|e| {
        error!(error = %e, "{}", e.client_message());
        e
    })?;

    controller.toggle_audio().await?;
    controller.toggle_video().await?;
    controller.toggle_screen_share().await?;
    controller
        .send_chat_message("Welcome to the staff meeting")
        .await?;

    tokio::select! {
        () = shutdown_signal() => info!("Shutdown signal received"),
        () = tokio::time::sleep(demo_duration) => info!("Demo duration elapsed"),
    }

    let snapshot = controller.get_snapshot().await?;
    info!(
        state = snapshot.state.as_str(),
        elapsed = %format_elapsed(snapshot.elapsed_seconds),
        participants = snapshot.participant_count(),
        chat_messages = snapshot.chat.len(),
        is_audio_muted = snapshot.is_audio_muted,
        is_video_muted = snapshot.is_video_muted,
        is_screen_sharing = snapshot.is_screen_sharing,
        "Session snapshot"
    );
    match serde_json::to_string(&snapshot) {
        Ok(json) => info!(snapshot = %json, "Session snapshot (json)"),
        Err(e) => error!(error = %e, "Failed to serialize snapshot"),
    }

    controller.leave().await?;
    controller.cancel();
    drop(controller);
    let _ = notification_task.await;

    info!(metrics = %prometheus_handle.render(), "Final metrics");
    info!("Meeting session demo stopped");

    Ok(())
}

fn demo_duration() -> Result<Duration, String> {
    match std::env::var("MEETING_DEMO_SECONDS") {
        Ok(value) => value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("Invalid MEETING_DEMO_SECONDS: {e}")),
        Err(_) => Ok(Duration::from_secs(DEFAULT_DEMO_SECONDS)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}
