//! Participant roster for the current session.
//!
//! Mutated only by the controller in response to bridged backend events. Keeps
//! arrival order (local participant first) so the presentation layer renders a
//! stable list.

use serde::Serialize;

/// Id given to the synthetic local participant.
pub const LOCAL_PARTICIPANT_ID: &str = "local";

/// Display name used when the backend does not provide one.
pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous";

/// A participant in the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub is_audio_muted: bool,
    pub is_video_muted: bool,
    pub is_local: bool,
}

/// Ordered roster with unique ids and at most one local participant.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: Vec<Participant>,
}

impl ParticipantRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with the synthetic local participant.
    pub fn seed_local(&mut self, display_name: &str) {
        self.participants.clear();
        self.participants.push(Participant {
            id: LOCAL_PARTICIPANT_ID.to_string(),
            display_name: display_name_or_anonymous(Some(display_name)),
            is_audio_muted: false,
            is_video_muted: false,
            is_local: true,
        });
    }

    /// Insert a remote participant, unmuted. Returns `false` if the id is
    /// already present.
    pub fn insert_remote(&mut self, id: &str, display_name: Option<&str>) -> bool {
        if self.contains(id) {
            return false;
        }
        self.participants.push(Participant {
            id: id.to_string(),
            display_name: display_name_or_anonymous(display_name),
            is_audio_muted: false,
            is_video_muted: false,
            is_local: false,
        });
        true
    }

    /// Remove a remote participant by id. The local participant is only
    /// removed by [`ParticipantRegistry::clear`].
    pub fn remove_remote(&mut self, id: &str) -> Option<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.id == id && !p.is_local)?;
        Some(self.participants.remove(index))
    }

    /// Update audio mute for a participant. Returns `false` if unknown.
    pub fn set_audio_muted(&mut self, id: &str, muted: bool) -> bool {
        self.get_mut(id).map(|p| p.is_audio_muted = muted).is_some()
    }

    /// Update video mute for a participant. Returns `false` if unknown.
    pub fn set_video_muted(&mut self, id: &str, muted: bool) -> bool {
        self.get_mut(id).map(|p| p.is_video_muted = muted).is_some()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn local(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_local)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    /// Copy of the roster in arrival order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }
}

/// Blank or missing names become [`ANONYMOUS_DISPLAY_NAME`].
#[must_use]
pub fn display_name_or_anonymous(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS_DISPLAY_NAME.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn seeded() -> ParticipantRegistry {
        let mut registry = ParticipantRegistry::new();
        registry.seed_local("Ann");
        registry
    }

    #[test]
    fn test_seed_local() {
        let registry = seeded();
        assert_eq!(registry.len(), 1);
        let local = registry.local().unwrap();
        assert_eq!(local.id, "local");
        assert_eq!(local.display_name, "Ann");
        assert!(local.is_local);
        assert!(!local.is_audio_muted);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut registry = seeded();
        assert!(registry.insert_remote("p1", Some("Bob")));
        assert!(!registry.insert_remote("p1", Some("Bob again")));
        assert!(!registry.insert_remote("local", Some("Impostor")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("p1").unwrap().display_name, "Bob");
    }

    #[test]
    fn test_remove_keeps_order_and_protects_local() {
        let mut registry = seeded();
        registry.insert_remote("p1", Some("Bob"));
        registry.insert_remote("p2", None);

        assert!(registry.remove_remote("p1").is_some());
        assert!(registry.remove_remote("p1").is_none());
        assert!(registry.remove_remote("local").is_none());

        let ids: Vec<_> = registry.to_vec().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["local", "p2"]);
        assert_eq!(registry.get("p2").unwrap().display_name, "Anonymous");
    }

    #[test]
    fn test_mute_updates() {
        let mut registry = seeded();
        registry.insert_remote("p1", Some("Bob"));

        assert!(registry.set_audio_muted("p1", true));
        assert!(registry.set_video_muted("local", true));
        assert!(!registry.set_audio_muted("ghost", true));

        assert!(registry.get("p1").unwrap().is_audio_muted);
        assert!(!registry.get("p1").unwrap().is_video_muted);
        assert!(registry.local().unwrap().is_video_muted);
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name_or_anonymous(None), "Anonymous");
        assert_eq!(display_name_or_anonymous(Some("  ")), "Anonymous");
        assert_eq!(display_name_or_anonymous(Some(" Cy ")), "Cy");
    }
}
