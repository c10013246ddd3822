//! `MeetingSessionController` - owns the lifecycle of one live meeting session.
//!
//! The controller is a single actor. It owns the session state, the
//! participant registry, the chat log and the meeting timer, and is the only
//! writer of any of them:
//!
//! - Presentation-layer requests arrive through [`MeetingSessionControllerHandle`]
//! - Backend events arrive from the `EventBridge` forwarding task
//! - Timer ticks arrive from the `MeetingTimer` ticker task
//!
//! All three share one mailbox, so events are applied strictly in delivery
//! order. Events and ticks are tagged with the session generation they were
//! produced for; anything from an older session is dropped.
//!
//! # State machine
//!
//! ```text
//! Idle --join--> Joining --handle created--> Active --leave/readyToClose/kicked--> Ending --> Idle
//!                   |
//!                   +--init failure--> Idle
//! ```
//!
//! Commands (`toggle_*`, `send_chat_message`) are forwarded to the backend and
//! never mutate local state. Only the backend's echo event does.

use crate::backend::{BackendCommand, BackendConnector, SessionHandle};
use crate::bridge::{EventBridge, SessionEvent, Subscription};
use crate::chat::ChatLog;
use crate::config::SessionConfig;
use crate::errors::{BackendError, SessionError};
use crate::observability::metrics;
use crate::registry::{ParticipantRegistry, LOCAL_PARTICIPANT_ID};
use crate::timer::MeetingTimer;

use super::messages::{
    ControllerMessage, EndReason, SessionNotification, SessionSnapshot, SessionState,
};
use super::metrics::MailboxMonitor;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Default channel buffer size for the controller mailbox.
const CONTROLLER_CHANNEL_BUFFER: usize = 500;

/// Buffered notifications per subscriber before lagging.
const NOTIFICATION_CAPACITY: usize = 64;

/// Handle to the `MeetingSessionController`.
///
/// Cloneable. The controller stops once every handle is dropped or
/// [`cancel`](Self::cancel) is called, tearing down any active session.
#[derive(Debug, Clone)]
pub struct MeetingSessionControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    notifications: broadcast::Sender<SessionNotification>,
    cancel_token: CancellationToken,
}

impl MeetingSessionControllerHandle {
    /// Spawn a controller that creates sessions through `connector`.
    ///
    /// Share one connector across controllers to load the backend client
    /// only once per process.
    #[must_use]
    pub fn new(connector: Arc<BackendConnector>, tick_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(CONTROLLER_CHANNEL_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let cancel_token = CancellationToken::new();

        let actor = MeetingSessionController::new(
            receiver,
            sender.downgrade(),
            cancel_token.clone(),
            connector,
            tick_interval,
            snapshot_tx,
            notifications.clone(),
        );

        tokio::spawn(actor.run());

        Self {
            sender,
            snapshot_rx,
            notifications,
            cancel_token,
        }
    }

    /// Join a session.
    ///
    /// Resolves once the session is Active, or with `InvalidConfig`,
    /// `AlreadyInSession` or `SessionInit`.
    pub async fn join(&self, config: SessionConfig) -> Result<(), SessionError> {
        self.request(|respond_to| ControllerMessage::Join { config, respond_to })
            .await?
    }

    /// Leave the current session. Idempotent.
    ///
    /// While Joining the leave is recorded and applied as soon as the join
    /// settles.
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.request(|respond_to| ControllerMessage::Leave { respond_to })
            .await?
    }

    /// Ask the backend to toggle the local microphone.
    pub async fn toggle_audio(&self) -> Result<(), SessionError> {
        self.command(BackendCommand::ToggleAudio).await
    }

    /// Ask the backend to toggle the local camera.
    pub async fn toggle_video(&self) -> Result<(), SessionError> {
        self.command(BackendCommand::ToggleVideo).await
    }

    /// Ask the backend to toggle screen sharing.
    pub async fn toggle_screen_share(&self) -> Result<(), SessionError> {
        self.command(BackendCommand::ToggleShareScreen).await
    }

    /// Send a chat message. Blank messages are ignored.
    ///
    /// The chat log only changes when the backend echoes the message back.
    pub async fn send_chat_message(&self, body: impl Into<String>) -> Result<(), SessionError> {
        self.command(BackendCommand::SendChatMessage(body.into()))
            .await
    }

    /// Read the current snapshot through the mailbox.
    ///
    /// Ordered after every previously sent request.
    pub async fn get_snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|respond_to| ControllerMessage::GetSnapshot { respond_to })
            .await
    }

    /// Subscribe to snapshots published after every internal mutation.
    #[must_use]
    pub fn watch_snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Subscribe to lifecycle notifications (joined, ended, roster changes).
    #[must_use]
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<SessionNotification> {
        self.notifications.subscribe()
    }

    /// Cancel the controller. Any active session is torn down.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn command(&self, command: BackendCommand) -> Result<(), SessionError> {
        self.request(|respond_to| ControllerMessage::Command {
            command,
            respond_to,
        })
        .await?
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControllerMessage,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))
    }
}

/// A join waiting for the backend.
struct PendingJoin {
    config: SessionConfig,
    respond_to: oneshot::Sender<Result<(), SessionError>>,
    leave_requested: bool,
}

/// Resources held while Active. Dropping it unsubscribes and stops the timer.
struct ActiveSession {
    config: SessionConfig,
    handle: Box<dyn SessionHandle>,
    timer: MeetingTimer,
    subscription: Subscription,
}

/// The `MeetingSessionController` implementation.
pub struct MeetingSessionController {
    controller_id: String,
    receiver: mpsc::Receiver<ControllerMessage>,
    /// Weak so the controller exits once every handle is gone.
    mailbox_tx: mpsc::WeakSender<ControllerMessage>,
    cancel_token: CancellationToken,
    connector: Arc<BackendConnector>,
    tick_interval: Duration,
    state: SessionState,
    /// Incremented on every accepted join.
    generation: u64,
    pending_join: Option<PendingJoin>,
    active: Option<ActiveSession>,
    registry: ParticipantRegistry,
    chat: ChatLog,
    is_audio_muted: bool,
    is_video_muted: bool,
    is_screen_sharing: bool,
    last_end_reason: Option<EndReason>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    notifications: broadcast::Sender<SessionNotification>,
    mailbox: MailboxMonitor,
}

impl MeetingSessionController {
    fn new(
        receiver: mpsc::Receiver<ControllerMessage>,
        mailbox_tx: mpsc::WeakSender<ControllerMessage>,
        cancel_token: CancellationToken,
        connector: Arc<BackendConnector>,
        tick_interval: Duration,
        snapshot_tx: watch::Sender<SessionSnapshot>,
        notifications: broadcast::Sender<SessionNotification>,
    ) -> Self {
        let controller_id = uuid::Uuid::new_v4().to_string();
        let mailbox = MailboxMonitor::new(&controller_id);

        Self {
            controller_id,
            receiver,
            mailbox_tx,
            cancel_token,
            connector,
            tick_interval,
            state: SessionState::Idle,
            generation: 0,
            pending_join: None,
            active: None,
            registry: ParticipantRegistry::new(),
            chat: ChatLog::new(),
            is_audio_muted: false,
            is_video_muted: false,
            is_screen_sharing: false,
            last_end_reason: None,
            snapshot_tx,
            notifications,
            mailbox,
        }
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "ms.actor.controller", fields(controller_id = %self.controller_id))]
    async fn run(mut self) {
        info!(
            target: "ms.actor.controller",
            controller_id = %self.controller_id,
            "MeetingSessionController started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "ms.actor.controller",
                        controller_id = %self.controller_id,
                        "MeetingSessionController received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.record_enqueue();
                            self.handle_message(message).await;
                            self.mailbox.record_dequeue();
                            self.publish_snapshot();
                        }
                        None => {
                            info!(
                                target: "ms.actor.controller",
                                controller_id = %self.controller_id,
                                "MeetingSessionController channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.shutdown().await;

        info!(
            target: "ms.actor.controller",
            controller_id = %self.controller_id,
            messages_processed = self.mailbox.messages_processed(),
            "MeetingSessionController stopped"
        );
    }

    async fn handle_message(&mut self, message: ControllerMessage) {
        match message {
            ControllerMessage::Join { config, respond_to } => {
                self.begin_join(config, respond_to);
            }

            ControllerMessage::JoinSettled { generation, result } => {
                self.on_join_settled(generation, result).await;
            }

            ControllerMessage::Leave { respond_to } => {
                self.leave().await;
                let _ = respond_to.send(Ok(()));
            }

            ControllerMessage::Command {
                command,
                respond_to,
            } => {
                let result = self.forward_command(command).await;
                let _ = respond_to.send(result);
            }

            ControllerMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }

            ControllerMessage::BackendEvent { generation, event } => {
                if self.is_current(generation) {
                    self.apply_event(event).await;
                } else {
                    debug!(
                        target: "ms.actor.controller",
                        generation,
                        current_generation = self.generation,
                        event = event.as_label(),
                        "Dropping stale backend event"
                    );
                }
            }

            ControllerMessage::BackendStreamClosed { generation } => {
                if self.is_current(generation) {
                    warn!(
                        target: "ms.actor.controller",
                        generation,
                        "Backend event stream closed while active"
                    );
                    self.end_session(EndReason::BackendDisconnected).await;
                }
            }

            ControllerMessage::Tick { generation } => {
                if self.is_current(generation) {
                    if let Some(active) = self.active.as_mut() {
                        active.timer.record_tick();
                    }
                }
            }
        }
    }

    /// Whether a generation-tagged message belongs to the Active session.
    fn is_current(&self, generation: u64) -> bool {
        self.state == SessionState::Active && generation == self.generation
    }

    fn begin_join(
        &mut self,
        config: SessionConfig,
        respond_to: oneshot::Sender<Result<(), SessionError>>,
    ) {
        if let Err(e) = config.validate() {
            debug!(target: "ms.actor.controller", error = %e, "Join rejected");
            metrics::record_session_join(e.as_label());
            let _ = respond_to.send(Err(e));
            return;
        }

        if self.state != SessionState::Idle {
            debug!(
                target: "ms.actor.controller",
                state = self.state.as_str(),
                "Join rejected, already in a session"
            );
            let err = SessionError::AlreadyInSession;
            metrics::record_session_join(err.as_label());
            let _ = respond_to.send(Err(err));
            return;
        }

        self.generation = self.generation.wrapping_add(1);
        self.state = SessionState::Joining;

        info!(
            target: "ms.actor.controller",
            room_id = %config.room_id,
            generation = self.generation,
            "Joining session"
        );

        let generation = self.generation;
        let connector = Arc::clone(&self.connector);
        let mailbox = self.mailbox_tx.clone();
        let token = self.cancel_token.child_token();
        let join_config = config.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = token.cancelled() => return,
                result = connector.create_handle(&join_config) => result,
            };

            let Some(sender) = mailbox.upgrade() else {
                dispose_orphan(&connector, result).await;
                return;
            };
            if let Err(mpsc::error::SendError(message)) = sender
                .send(ControllerMessage::JoinSettled { generation, result })
                .await
            {
                if let ControllerMessage::JoinSettled { result, .. } = message {
                    dispose_orphan(&connector, result).await;
                }
            }
        });

        self.pending_join = Some(PendingJoin {
            config,
            respond_to,
            leave_requested: false,
        });
    }

    async fn on_join_settled(
        &mut self,
        generation: u64,
        result: Result<Box<dyn SessionHandle>, BackendError>,
    ) {
        let pending = if self.state == SessionState::Joining && generation == self.generation {
            self.pending_join.take()
        } else {
            None
        };
        let Some(pending) = pending else {
            dispose_orphan(&self.connector, result).await;
            return;
        };

        let mut handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                self.fail_join(pending, e);
                return;
            }
        };

        let subscription = match EventBridge::subscribe(
            handle.as_mut(),
            generation,
            self.mailbox_tx.clone(),
            self.cancel_token.child_token(),
        ) {
            Ok(subscription) => subscription,
            Err(e) => {
                if let Err(dispose_err) = self.connector.dispose(handle).await {
                    warn!(
                        target: "ms.actor.controller",
                        error = %dispose_err,
                        "Failed to dispose handle after subscribe failure"
                    );
                }
                self.fail_join(pending, e);
                return;
            }
        };

        let timer = self.start_timer(generation);

        self.registry.seed_local(&pending.config.display_name);
        self.chat.clear();
        self.is_audio_muted = false;
        self.is_video_muted = false;
        self.is_screen_sharing = false;
        self.last_end_reason = None;

        let room_id = pending.config.room_id.clone();
        self.active = Some(ActiveSession {
            config: pending.config,
            handle,
            timer,
            subscription,
        });
        self.state = SessionState::Active;

        info!(
            target: "ms.actor.controller",
            room_id = %room_id,
            generation,
            "Session active"
        );
        metrics::record_session_join("success");
        metrics::set_participants_active(self.registry.len());

        let _ = pending.respond_to.send(Ok(()));
        let _ = self.notifications.send(SessionNotification::Joined { room_id });

        if pending.leave_requested {
            debug!(
                target: "ms.actor.controller",
                generation,
                "Applying leave requested while joining"
            );
            self.end_session(EndReason::Local).await;
        }
    }

    fn fail_join(&mut self, pending: PendingJoin, error: BackendError) {
        warn!(
            target: "ms.actor.controller",
            room_id = %pending.config.room_id,
            error = %error,
            "Session initialization failed"
        );
        self.state = SessionState::Idle;

        let err = SessionError::SessionInit(error);
        metrics::record_session_join(err.as_label());
        let _ = pending.respond_to.send(Err(err));
    }

    fn start_timer(&self, generation: u64) -> MeetingTimer {
        let mailbox = self.mailbox_tx.clone();
        MeetingTimer::start(
            self.tick_interval,
            self.cancel_token.child_token(),
            move || {
                let mailbox = mailbox.clone();
                async move {
                    match mailbox.upgrade() {
                        Some(sender) => sender
                            .send(ControllerMessage::Tick { generation })
                            .await
                            .is_ok(),
                        None => false,
                    }
                }
            },
        )
    }

    async fn leave(&mut self) {
        match self.state {
            SessionState::Idle | SessionState::Ending => {}
            SessionState::Joining => {
                if let Some(pending) = self.pending_join.as_mut() {
                    pending.leave_requested = true;
                }
            }
            SessionState::Active => self.end_session(EndReason::Local).await,
        }
    }

    async fn forward_command(&mut self, command: BackendCommand) -> Result<(), SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotActive);
        }
        if let BackendCommand::SendChatMessage(body) = &command {
            if body.trim().is_empty() {
                debug!(target: "ms.actor.controller", "Ignoring blank chat message");
                return Ok(());
            }
        }
        let Some(active) = self.active.as_mut() else {
            return Err(SessionError::NotActive);
        };

        let name = command.name();
        metrics::record_backend_command(name);
        active.handle.execute_command(command).await.map_err(|e| {
            warn!(
                target: "ms.actor.controller",
                command = name,
                error = %e,
                "Backend rejected command"
            );
            SessionError::CommandFailed(e)
        })
    }

    async fn apply_event(&mut self, event: SessionEvent) {
        let label = event.as_label();
        metrics::record_backend_event(label);

        match event {
            SessionEvent::ConferenceJoined | SessionEvent::ConferenceLeft => {
                debug!(target: "ms.actor.controller", event = label, "Conference status event");
            }

            SessionEvent::ParticipantJoined { id, display_name } => {
                if !self.registry.insert_remote(&id, display_name.as_deref()) {
                    debug!(
                        target: "ms.actor.controller",
                        participant_id = %id,
                        "Ignoring duplicate participant"
                    );
                    return;
                }
                let display_name = self
                    .registry
                    .get(&id)
                    .map(|p| p.display_name.clone())
                    .unwrap_or_default();
                debug!(target: "ms.actor.controller", participant_id = %id, "Participant joined");
                metrics::set_participants_active(self.registry.len());
                let _ = self
                    .notifications
                    .send(SessionNotification::ParticipantJoined { id, display_name });
            }

            SessionEvent::ParticipantLeft { id } => self.remove_participant(id),

            SessionEvent::AudioMuteChanged {
                participant_id,
                muted,
            } => {
                let id = participant_id.as_deref().unwrap_or(LOCAL_PARTICIPANT_ID);
                if id == LOCAL_PARTICIPANT_ID {
                    self.is_audio_muted = muted;
                }
                if !self.registry.set_audio_muted(id, muted) {
                    debug!(target: "ms.actor.controller", participant_id = %id, "Audio mute for unknown participant");
                }
            }

            SessionEvent::VideoMuteChanged {
                participant_id,
                muted,
            } => {
                let id = participant_id.as_deref().unwrap_or(LOCAL_PARTICIPANT_ID);
                if id == LOCAL_PARTICIPANT_ID {
                    self.is_video_muted = muted;
                }
                if !self.registry.set_video_muted(id, muted) {
                    debug!(target: "ms.actor.controller", participant_id = %id, "Video mute for unknown participant");
                }
            }

            SessionEvent::ScreenShareChanged { on } => {
                self.is_screen_sharing = on;
            }

            SessionEvent::ChatReceived { sender, body } => {
                let message = self.chat.append(sender, body);
                debug!(target: "ms.actor.controller", message_id = %message.id, "Chat message received");
            }

            SessionEvent::Kicked {
                participant_id,
                is_local,
            } => {
                if is_local {
                    info!(target: "ms.actor.controller", "Local participant was kicked");
                    self.end_session(EndReason::Kicked).await;
                } else {
                    self.remove_participant(participant_id);
                }
            }

            SessionEvent::ReadyToClose => {
                self.end_session(EndReason::RemoteClosed).await;
            }
        }
    }

    fn remove_participant(&mut self, id: String) {
        if self.registry.remove_remote(&id).is_none() {
            debug!(target: "ms.actor.controller", participant_id = %id, "Ignoring leave for unknown participant");
            return;
        }
        debug!(target: "ms.actor.controller", participant_id = %id, "Participant left");
        metrics::set_participants_active(self.registry.len());
        let _ = self
            .notifications
            .send(SessionNotification::ParticipantLeft { id });
    }

    /// Active -> Ending -> Idle. Every teardown step runs even if an earlier
    /// one fails.
    async fn end_session(&mut self, reason: EndReason) {
        let Some(active) = self.active.take() else {
            return;
        };
        self.state = SessionState::Ending;
        self.publish_snapshot_with(Some(&active));

        let ActiveSession {
            config,
            mut handle,
            mut timer,
            mut subscription,
        } = active;

        subscription.unsubscribe();
        timer.stop();
        let elapsed_seconds = timer.elapsed_seconds();

        if let Err(e) = handle.execute_command(BackendCommand::Hangup).await {
            debug!(target: "ms.actor.controller", error = %e, "Hangup ignored");
        }
        if let Err(e) = self.connector.dispose(handle).await {
            warn!(
                target: "ms.actor.controller",
                room_id = %config.room_id,
                error = %e,
                "Failed to dispose session handle"
            );
        }

        self.registry.clear();
        self.chat.clear();
        self.is_audio_muted = false;
        self.is_video_muted = false;
        self.is_screen_sharing = false;
        self.state = SessionState::Idle;
        self.last_end_reason = Some(reason);

        info!(
            target: "ms.actor.controller",
            room_id = %config.room_id,
            reason = reason.as_label(),
            elapsed_seconds,
            "Session ended"
        );
        metrics::record_session_end(reason.as_label());
        metrics::set_participants_active(0);
        let _ = self.notifications.send(SessionNotification::Ended { reason });
    }

    async fn shutdown(&mut self) {
        if let Some(pending) = self.pending_join.take() {
            let _ = pending.respond_to.send(Err(SessionError::Internal(
                "controller shutting down".to_string(),
            )));
        }
        if self.active.is_some() {
            self.end_session(EndReason::Local).await;
        }
        self.state = SessionState::Idle;
        self.publish_snapshot();
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_with(self.active.as_ref())
    }

    fn snapshot_with(&self, active: Option<&ActiveSession>) -> SessionSnapshot {
        let room_id = active
            .map(|a| a.config.room_id.clone())
            .or_else(|| self.pending_join.as_ref().map(|p| p.config.room_id.clone()));

        SessionSnapshot {
            state: self.state,
            room_id,
            started_at: active.map(|a| a.timer.started_at()),
            elapsed_seconds: active.map_or(0, |a| a.timer.elapsed_seconds()),
            participants: self.registry.to_vec(),
            chat: self.chat.messages().to_vec(),
            is_audio_muted: self.is_audio_muted,
            is_video_muted: self.is_video_muted,
            is_screen_sharing: self.is_screen_sharing,
            last_end_reason: self.last_end_reason,
        }
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn publish_snapshot_with(&self, active: Option<&ActiveSession>) {
        self.snapshot_tx.send_replace(self.snapshot_with(active));
    }
}

/// Dispose a handle whose join was superseded or abandoned.
async fn dispose_orphan(
    connector: &BackendConnector,
    result: Result<Box<dyn SessionHandle>, BackendError>,
) {
    if let Ok(handle) = result {
        debug!(target: "ms.actor.controller", "Disposing handle from abandoned join");
        if let Err(e) = connector.dispose(handle).await {
            warn!(target: "ms.actor.controller", error = %e, "Failed to dispose abandoned handle");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backend::loopback::LoopbackBackend;

    fn spawn_controller() -> (MeetingSessionControllerHandle, Arc<LoopbackBackend>) {
        let backend = Arc::new(LoopbackBackend::new("loopback.test"));
        let connector = Arc::new(BackendConnector::new(backend.clone()));
        let handle = MeetingSessionControllerHandle::new(connector, Duration::from_secs(1));
        (handle, backend)
    }

    #[tokio::test]
    async fn test_join_seeds_local_participant() {
        let (controller, _) = spawn_controller();

        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Active);
        assert_eq!(snapshot.room_id.as_deref(), Some("room-1"));
        assert_eq!(snapshot.participants.len(), 1);
        let local = snapshot.participants.first().unwrap();
        assert_eq!(local.id, "local");
        assert_eq!(local.display_name, "Ann");
        assert!(local.is_local);
    }

    #[tokio::test]
    async fn test_empty_room_rejected_without_state_change() {
        let (controller, backend) = spawn_controller();

        let result = controller.join(SessionConfig::new("   ", "Ann")).await;
        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(backend.load_count(), 0);
    }

    #[tokio::test]
    async fn test_second_join_rejected() {
        let (controller, _) = spawn_controller();
        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        let result = controller.join(SessionConfig::new("room-2", "Bob")).await;
        assert!(matches!(result, Err(SessionError::AlreadyInSession)));

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Active);
        assert_eq!(snapshot.room_id.as_deref(), Some("room-1"));
    }

    #[tokio::test]
    async fn test_commands_require_active_session() {
        let (controller, _) = spawn_controller();

        assert!(matches!(
            controller.toggle_audio().await,
            Err(SessionError::NotActive)
        ));
        assert!(matches!(
            controller.send_chat_message("hi").await,
            Err(SessionError::NotActive)
        ));
        // Leaving while idle is a no-op.
        controller.leave().await.unwrap();
    }

    #[tokio::test]
    async fn test_toggle_applied_only_from_echo() {
        let (controller, _) = spawn_controller();
        let mut snapshots = controller.watch_snapshot();
        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        controller.toggle_audio().await.unwrap();

        let snapshot = snapshots
            .wait_for(|s| s.is_audio_muted)
            .await
            .unwrap()
            .clone();
        assert!(snapshot.participants.first().unwrap().is_audio_muted);
    }

    #[tokio::test]
    async fn test_chat_echo_and_blank_message() {
        let (controller, _) = spawn_controller();
        let mut snapshots = controller.watch_snapshot();
        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        controller.send_chat_message("   ").await.unwrap();
        controller.send_chat_message("hello").await.unwrap();

        let snapshot = snapshots
            .wait_for(|s| !s.chat.is_empty())
            .await
            .unwrap()
            .clone();
        assert_eq!(snapshot.chat.len(), 1);
        assert_eq!(snapshot.chat.first().unwrap().body, "hello");
        assert_eq!(snapshot.chat.first().unwrap().sender, "Ann");
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_advances_while_active_and_resets() {
        let (controller, _) = spawn_controller();
        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(controller.get_snapshot().await.unwrap().elapsed_seconds, 3);

        controller.leave().await.unwrap();
        let idle = controller.get_snapshot().await.unwrap();
        assert_eq!(idle.state, SessionState::Idle);
        assert_eq!(idle.elapsed_seconds, 0);
        assert_eq!(idle.last_end_reason, Some(EndReason::Local));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.get_snapshot().await.unwrap().elapsed_seconds, 0);

        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();
        assert_eq!(controller.get_snapshot().await.unwrap().elapsed_seconds, 0);
    }

    #[tokio::test]
    async fn test_leave_clears_session_and_notifies() {
        let (controller, backend) = spawn_controller();
        let mut notifications = controller.subscribe_notifications();

        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();
        controller.leave().await.unwrap();
        controller.leave().await.unwrap();

        assert_eq!(
            notifications.recv().await.unwrap(),
            SessionNotification::Joined {
                room_id: "room-1".to_string()
            }
        );
        assert_eq!(
            notifications.recv().await.unwrap(),
            SessionNotification::Ended {
                reason: EndReason::Local
            }
        );

        let snapshot = controller.get_snapshot().await.unwrap();
        assert!(snapshot.participants.is_empty());
        assert!(snapshot.chat.is_empty());

        // Rejoin reuses the loaded client.
        controller
            .join(SessionConfig::new("room-2", "Ann"))
            .await
            .unwrap();
        assert_eq!(backend.load_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_generation_messages_dropped() {
        let (controller, _) = spawn_controller();
        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        controller
            .sender
            .send(ControllerMessage::BackendEvent {
                generation: 0,
                event: SessionEvent::ParticipantJoined {
                    id: "p1".to_string(),
                    display_name: Some("Bob".to_string()),
                },
            })
            .await
            .unwrap();
        controller
            .sender
            .send(ControllerMessage::Tick { generation: 0 })
            .await
            .unwrap();
        controller
            .sender
            .send(ControllerMessage::BackendStreamClosed { generation: 0 })
            .await
            .unwrap();

        let snapshot = controller.get_snapshot().await.unwrap();
        assert_eq!(snapshot.state, SessionState::Active);
        assert_eq!(snapshot.participants.len(), 1);
        assert_eq!(snapshot.elapsed_seconds, 0);
    }

    #[tokio::test]
    async fn test_cancel_tears_down_active_session() {
        let (controller, _) = spawn_controller();
        let mut snapshots = controller.watch_snapshot();
        controller
            .join(SessionConfig::new("room-1", "Ann"))
            .await
            .unwrap();

        controller.cancel();
        assert!(controller.is_cancelled());

        let snapshot = snapshots
            .wait_for(|s| s.state == SessionState::Idle && s.last_end_reason.is_some())
            .await
            .unwrap()
            .clone();
        assert!(snapshot.participants.is_empty());
    }
}
