// Message types shared between the bridge, the app orchestrator and the TUI.
//
// `ClientMessage`/`ServerMessage` are the JSON frames exchanged with the
// companion browser page. `UiUpdate`/`UserCommand` travel over in-process
// mpsc channels between the orchestrator and the TUI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::present::{ScoreView, StrategyKind};
use crate::session::WidgetPhase;

// ---------------------------------------------------------------------------
// Companion page protocol
// ---------------------------------------------------------------------------

/// What the connected page can do, as reported by its own feature detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `documentPictureInPicture.requestWindow` is available.
    pub document_pip: bool,
    /// `HTMLVideoElement.requestPictureInPicture` is available.
    pub video_pip: bool,
}

impl Capabilities {
    pub fn none() -> Self {
        Capabilities::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HelloPayload {
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
    #[serde(rename = "documentPictureInPicture", default)]
    pub document_pip: bool,
    #[serde(rename = "pictureInPicture", default)]
    pub video_pip: bool,
}

impl HelloPayload {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            document_pip: self.document_pip,
            video_pip: self.video_pip,
        }
    }
}

/// Messages sent by the companion page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// First message after connecting: feature-detection results.
    Hello { payload: HelloPayload },
    /// The pop-out window requested by `OPEN_WINDOW` is open.
    WindowOpened,
    /// The pop-out window went away (its `pagehide`/unload fired).
    WindowClosed,
    /// The hidden video element reached `loadedmetadata`.
    VideoReady,
    /// `requestPictureInPicture` resolved.
    PipEntered,
    /// `requestPictureInPicture` rejected, or the video could not play.
    PipFailed { reason: String },
    /// The user left Picture-in-Picture.
    PipLeft,
    Heartbeat,
}

/// Messages sent to the companion page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    OpenWindow { width: u32, height: u32 },
    /// Replace the pop-out document's entire content.
    RenderDocument { html: String },
    CloseWindow,
    /// Create the capture canvas and hidden video element.
    AttachStream { width: u16, height: u16, fps: u32 },
    /// One painted frame, as rows of text cells.
    VideoFrame { seq: u64, rows: Vec<String> },
    RequestPip,
    ExitPip,
}

// ---------------------------------------------------------------------------
// App <-> TUI
// ---------------------------------------------------------------------------

/// Whether a companion page is connected to the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

/// Widget summary for the status bar.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetStatus {
    pub phase: WidgetPhase,
    pub strategy: Option<StrategyKind>,
    /// 1-based position of the selected match and the number of matches.
    pub position: Option<(usize, usize)>,
    pub auto_refresh: bool,
    pub sound_enabled: bool,
    pub last_refresh: Option<DateTime<Utc>>,
    pub offline: bool,
}

impl Default for WidgetStatus {
    fn default() -> Self {
        WidgetStatus {
            phase: WidgetPhase::Closed,
            strategy: None,
            position: None,
            auto_refresh: false,
            sound_enabled: false,
            last_refresh: None,
            offline: false,
        }
    }
}

/// One row of the recent-matches dashboard panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub when: String,
    pub status: String,
    pub players: String,
    pub score: String,
    pub tournament: String,
}

/// Contents of the dashboard panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    /// Which recency window matched ("Today", "This week", ...).
    pub window: Option<String>,
    pub rows: Vec<DashboardRow>,
    pub offline: bool,
}

/// Updates pushed from the orchestrator to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// Show (`Some`) or hide (`None`) the floating badge overlay.
    Badge(Option<Box<ScoreView>>),
    Widget(WidgetStatus),
    Dashboard(DashboardView),
    Bridge {
        status: ConnectionStatus,
        capabilities: Capabilities,
    },
    /// A user-visible message, e.g. a failed Picture-in-Picture request.
    Notice(String),
    /// Play the alert sound.
    Chime,
}

/// Commands sent from the TUI to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    OpenWidget,
    CloseWidget,
    NextMatch,
    PreviousMatch,
    ToggleAutoRefresh,
    ToggleSound,
    /// Re-run selection and score synthesis now.
    Refresh,
    Quit,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_parses_capabilities() {
        let json = r#"{"type":"HELLO","payload":{"userAgent":"Firefox","documentPictureInPicture":false,"pictureInPicture":true}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Hello { payload } => {
                assert_eq!(payload.user_agent, "Firefox");
                assert_eq!(
                    payload.capabilities(),
                    Capabilities {
                        document_pip: false,
                        video_pip: true
                    }
                );
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn hello_defaults_missing_capabilities_to_false() {
        let json = r#"{"type":"HELLO","payload":{}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Hello {
                payload: HelloPayload {
                    user_agent: String::new(),
                    document_pip: false,
                    video_pip: false,
                }
            }
        );
    }

    #[test]
    fn unit_client_messages_parse() {
        let cases = [
            (r#"{"type":"WINDOW_OPENED"}"#, ClientMessage::WindowOpened),
            (r#"{"type":"WINDOW_CLOSED"}"#, ClientMessage::WindowClosed),
            (r#"{"type":"VIDEO_READY"}"#, ClientMessage::VideoReady),
            (r#"{"type":"PIP_ENTERED"}"#, ClientMessage::PipEntered),
            (r#"{"type":"PIP_LEFT"}"#, ClientMessage::PipLeft),
            (r#"{"type":"HEARTBEAT"}"#, ClientMessage::Heartbeat),
        ];
        for (json, expected) in cases {
            assert_eq!(serde_json::from_str::<ClientMessage>(json).unwrap(), expected);
        }
    }

    #[test]
    fn server_messages_use_type_tag() {
        let open = serde_json::to_value(ServerMessage::OpenWindow {
            width: 320,
            height: 180,
        })
        .unwrap();
        assert_eq!(open["type"], "OPEN_WINDOW");
        assert_eq!(open["width"], 320);

        let pip = serde_json::to_value(ServerMessage::RequestPip).unwrap();
        assert_eq!(pip, serde_json::json!({"type": "REQUEST_PIP"}));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"SELFDESTRUCT"}"#).is_err());
    }
}
