//! Meeting session configuration.
//!
//! [`Config`] is loaded from environment variables and describes what the host
//! page offers. [`SessionConfig`] is the immutable value built from it for one
//! join attempt.

use crate::errors::SessionError;
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default conferencing domain.
pub const DEFAULT_DOMAIN: &str = "meet.jit.si";

/// Default room offered on the join form.
pub const DEFAULT_ROOM: &str = "admin-meeting";

/// Default display name offered on the join form.
pub const DEFAULT_DISPLAY_NAME: &str = "Admin";

/// Default participant cap requested from the backend.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 50;

/// Default video height constraints (pixels).
pub const DEFAULT_VIDEO_IDEAL_HEIGHT: u32 = 720;
pub const DEFAULT_VIDEO_MIN_HEIGHT: u32 = 180;
pub const DEFAULT_VIDEO_MAX_HEIGHT: u32 = 720;

/// Default meeting timer tick (one second).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Default base URL used for shareable meeting links.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

/// Toolbar offered to every participant.
const BASE_TOOLBAR: &[&str] = &[
    "microphone",
    "camera",
    "closedcaptions",
    "desktop",
    "fullscreen",
    "fodeviceselection",
    "hangup",
    "chat",
    "etherpad",
    "sharedvideo",
    "settings",
    "raisehand",
    "videoquality",
    "filmstrip",
    "feedback",
    "stats",
    "shortcuts",
    "tileview",
    "videobackgroundblur",
    "download",
    "help",
    "security",
];

/// Toolbar buttons only requested for admins.
const ADMIN_TOOLBAR: &[&str] = &["recording", "livestreaming", "mute-everyone"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Host configuration for the video chat page.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Conferencing domain (default: "meet.jit.si").
    pub domain: String,

    /// Room pre-filled on the join form (default: "admin-meeting").
    pub default_room: String,

    /// Display name pre-filled on the join form (default: "Admin").
    pub default_display_name: String,

    /// Whether the page is rendered for an admin. Only affects which optional
    /// features are requested in [`SessionConfig`].
    pub is_admin: bool,

    /// Participant cap requested from the backend (default: 50).
    pub max_participants: u32,

    /// Video height constraints.
    pub video_constraints: VideoConstraints,

    /// Meeting timer tick interval (default: 1s).
    pub tick_interval: Duration,

    /// Base URL for shareable meeting links.
    pub public_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            default_room: DEFAULT_ROOM.to_string(),
            default_display_name: DEFAULT_DISPLAY_NAME.to_string(),
            is_admin: true,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            video_constraints: VideoConstraints::default(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let domain = vars
            .get("MEETING_DOMAIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());

        let default_room = vars
            .get("MEETING_DEFAULT_ROOM")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ROOM.to_string());

        let default_display_name = vars
            .get("MEETING_DEFAULT_DISPLAY_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        let is_admin = match vars.get("MEETING_IS_ADMIN") {
            Some(value) => parse_bool("MEETING_IS_ADMIN", value)?,
            None => true,
        };

        let max_participants = parse_or(vars, "MEETING_MAX_PARTICIPANTS", DEFAULT_MAX_PARTICIPANTS)?;
        if max_participants == 0 {
            return Err(ConfigError::InvalidValue(
                "MEETING_MAX_PARTICIPANTS must be greater than 0".to_string(),
            ));
        }

        let video_constraints = VideoConstraints {
            ideal_height: parse_or(vars, "MEETING_VIDEO_IDEAL_HEIGHT", DEFAULT_VIDEO_IDEAL_HEIGHT)?,
            min_height: parse_or(vars, "MEETING_VIDEO_MIN_HEIGHT", DEFAULT_VIDEO_MIN_HEIGHT)?,
            max_height: parse_or(vars, "MEETING_VIDEO_MAX_HEIGHT", DEFAULT_VIDEO_MAX_HEIGHT)?,
        };
        if !video_constraints.is_consistent() {
            return Err(ConfigError::InvalidValue(format!(
                "video height constraints must satisfy min <= ideal <= max, got {}/{}/{}",
                video_constraints.min_height,
                video_constraints.ideal_height,
                video_constraints.max_height
            )));
        }

        let tick_interval_ms = parse_or(vars, "MEETING_TICK_INTERVAL_MS", DEFAULT_TICK_INTERVAL_MS)?;
        if tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "MEETING_TICK_INTERVAL_MS must be greater than 0".to_string(),
            ));
        }

        let public_base_url = vars
            .get("MEETING_PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());

        Ok(Self {
            domain,
            default_room,
            default_display_name,
            is_admin,
            max_participants,
            video_constraints,
            tick_interval: Duration::from_millis(tick_interval_ms),
            public_base_url,
        })
    }

    /// Build the session configuration for one join attempt.
    #[must_use]
    pub fn session_config(
        &self,
        room_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> SessionConfig {
        SessionConfig {
            room_id: room_id.into(),
            display_name: display_name.into(),
            allow_recording: self.is_admin,
            max_participants: self.max_participants,
            video_constraints: self.video_constraints,
            toolbar_buttons: toolbar_for(self.is_admin),
        }
    }

    /// Build the session configuration for the pre-filled form values.
    #[must_use]
    pub fn default_session_config(&self) -> SessionConfig {
        self.session_config(self.default_room.clone(), self.default_display_name.clone())
    }

    /// Shareable link for a room.
    #[must_use]
    pub fn meeting_link(&self, room_id: &str) -> String {
        format!(
            "{}/video-chat?room={}",
            self.public_base_url,
            urlencoding::encode(room_id)
        )
    }
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key}={value}"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!("{key}={value}"))),
    }
}

fn toolbar_for(is_admin: bool) -> Vec<String> {
    let mut buttons: Vec<String> = BASE_TOOLBAR.iter().map(|b| (*b).to_string()).collect();
    if is_admin {
        buttons.extend(ADMIN_TOOLBAR.iter().map(|b| (*b).to_string()));
    }
    buttons
}

/// Requested video height constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    pub ideal_height: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_height: DEFAULT_VIDEO_IDEAL_HEIGHT,
            min_height: DEFAULT_VIDEO_MIN_HEIGHT,
            max_height: DEFAULT_VIDEO_MAX_HEIGHT,
        }
    }
}

impl VideoConstraints {
    fn is_consistent(&self) -> bool {
        self.min_height <= self.ideal_height && self.ideal_height <= self.max_height
    }
}

/// Immutable description of a requested session.
///
/// Built once per join attempt and owned by the controller for the lifetime of
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Room identifier (must be non-blank).
    pub room_id: String,
    /// Local participant's display name.
    pub display_name: String,
    /// Whether recording is requested.
    pub allow_recording: bool,
    /// Participant cap requested from the backend.
    pub max_participants: u32,
    /// Video height constraints.
    pub video_constraints: VideoConstraints,
    /// Toolbar surface requested from the backend.
    pub toolbar_buttons: Vec<String>,
}

impl SessionConfig {
    /// Create a session configuration with default features for a non-admin.
    #[must_use]
    pub fn new(room_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            display_name: display_name.into(),
            allow_recording: false,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            video_constraints: VideoConstraints::default(),
            toolbar_buttons: toolbar_for(false),
        }
    }

    /// Reject configurations that must never reach the backend.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.room_id.trim().is_empty() {
            return Err(SessionError::InvalidConfig("room id is empty".to_string()));
        }
        if self.max_participants == 0 {
            return Err(SessionError::InvalidConfig(
                "max participants must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Backend-facing options in the conferencing client's option format.
    #[must_use]
    pub fn to_backend_options(&self) -> serde_json::Value {
        serde_json::json!({
            "roomName": self.room_id,
            "userInfo": { "displayName": self.display_name },
            "configOverwrite": {
                "startWithAudioMuted": false,
                "startWithVideoMuted": false,
                "prejoinPageEnabled": false,
                "enableChat": true,
                "enableScreenSharing": true,
                "enableRecording": self.allow_recording,
                "maxParticipants": self.max_participants,
                "resolution": self.video_constraints.ideal_height,
                "constraints": {
                    "video": {
                        "height": {
                            "ideal": self.video_constraints.ideal_height,
                            "min": self.video_constraints.min_height,
                            "max": self.video_constraints.max_height,
                        }
                    }
                }
            },
            "interfaceConfigOverwrite": {
                "TOOLBAR_BUTTONS": self.toolbar_buttons,
                "TOOLBAR_ALWAYS_VISIBLE": true,
            }
        })
    }
}
