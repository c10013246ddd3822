//! Snapshot wait helpers for controller tests.

use meeting_session::actors::{MeetingSessionControllerHandle, SessionSnapshot, SessionState};
use std::time::Duration;

/// Upper bound on how long a helper waits before failing the test.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait until a published snapshot satisfies `predicate` and return it.
///
/// # Panics
///
/// Panics if the predicate is not met within [`WAIT_TIMEOUT`] or the
/// controller stops.
pub async fn wait_for_snapshot(
    controller: &MeetingSessionControllerHandle,
    mut predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut snapshots = controller.watch_snapshot();
    let snapshot = tokio::time::timeout(WAIT_TIMEOUT, snapshots.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for snapshot")
        .expect("controller stopped while waiting for snapshot");
    snapshot.clone()
}

/// Wait until the controller reaches `state`.
pub async fn wait_for_state(
    controller: &MeetingSessionControllerHandle,
    state: SessionState,
) -> SessionSnapshot {
    wait_for_snapshot(controller, |s| s.state == state).await
}

/// Ids of the snapshot's participants in roster order.
#[must_use]
pub fn participant_ids(snapshot: &SessionSnapshot) -> Vec<String> {
    snapshot.participants.iter().map(|p| p.id.clone()).collect()
}

/// Chat bodies in arrival order.
#[must_use]
pub fn chat_bodies(snapshot: &SessionSnapshot) -> Vec<String> {
    snapshot.chat.iter().map(|m| m.body.clone()).collect()
}
