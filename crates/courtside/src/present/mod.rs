// Presentation strategies for the live-match widget.
//
// All three strategies render the same `ScoreView`, built in one place from
// the session's selected match. Exactly one `LiveMatchRenderer` is mounted at
// a time; `strategy` decides which.

pub mod badge;
pub mod popout;
pub mod strategy;
pub mod video;

use std::time::Duration;

use async_trait::async_trait;
use chrono::FixedOffset;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use courtside_core::model::{LiveMatch, Match, MatchStatus, Server};

use crate::bridge::BridgeEvent;
use crate::protocol::ClientMessage;

pub use badge::FloatingBadge;
pub use popout::PopoutWindow;
pub use strategy::{build_renderer, select_strategy};
pub use video::CanvasVideoBridge;

/// Placeholder for a missing player name or score.
pub const TBD: &str = "TBD";
/// Placeholder score for an upcoming match that has none yet.
pub const SCHEDULED: &str = "Match Scheduled";

// ---------------------------------------------------------------------------
// StrategyKind / errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Same-origin pop-out document window (Document Picture-in-Picture).
    PopOut,
    /// Canvas captured to a video element in native Picture-in-Picture.
    CanvasVideo,
    /// Fixed-position overlay in the terminal UI. Always available.
    FloatingBadge,
}

impl StrategyKind {
    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::PopOut => "Pop-out",
            StrategyKind::CanvasVideo => "PiP video",
            StrategyKind::FloatingBadge => "Badge",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    /// The platform lacks the capability this strategy needs.
    #[error("{} is not supported by the connected page", .0.label())]
    Unsupported(StrategyKind),

    /// No companion page is connected, or it went away mid-request.
    #[error("companion page is not connected")]
    BridgeUnavailable,

    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: &'static str, after: Duration },

    /// The page rejected the request (user denial, autoplay policy, ...).
    #[error("request was denied: {0}")]
    Denied(String),
}

/// What the orchestrator should do after a renderer saw a page message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererSignal {
    Continue,
    /// The presentation surface was closed from the page side.
    Closed,
}

// ---------------------------------------------------------------------------
// ScoreView
// ---------------------------------------------------------------------------

/// Display-ready fields for one match, placeholders already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub headline: String,
    pub status: MatchStatus,
    pub player1: String,
    pub player2: String,
    pub score: String,
    /// Decorative set/game/server fields; only shown while live.
    pub set_label: Option<String>,
    pub game_score: Option<String>,
    pub server: Option<Server>,
    pub court: Option<String>,
    pub when: String,
    /// 1-based position and total, for paging.
    pub position: usize,
    pub total: usize,
}

/// What every presentation strategy renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreView {
    pub card: Option<ScoreCard>,
    /// Shown when there is no card.
    pub message: String,
    /// The last store read failed.
    pub offline: bool,
}

pub(crate) fn or_tbd(name: &str) -> &str {
    if name.trim().is_empty() {
        TBD
    } else {
        name
    }
}

/// The recorded score, or a placeholder when the match has none.
pub(crate) fn score_text(m: &Match) -> String {
    match (&m.score, m.status) {
        (Some(score), _) => score.clone(),
        (None, MatchStatus::Upcoming) => SCHEDULED.to_string(),
        (None, _) => TBD.to_string(),
    }
}

pub fn status_label(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Live => "LIVE",
        MatchStatus::Upcoming => "UPCOMING",
        MatchStatus::Completed => "FINAL",
    }
}

impl ScoreView {
    pub fn placeholder(message: impl Into<String>, offline: bool) -> Self {
        ScoreView {
            card: None,
            message: message.into(),
            offline,
        }
    }

    /// Build the view for `live`, the `position`-th (1-based) of `total`.
    pub fn for_match(
        live: &LiveMatch,
        position: usize,
        total: usize,
        offline: bool,
        offset: FixedOffset,
    ) -> Self {
        let m = &live.base;
        let score = score_text(m);
        let is_live = m.status == MatchStatus::Live;

        ScoreView {
            card: Some(ScoreCard {
                headline: m.tournament.clone().unwrap_or_else(|| "Live Match".to_string()),
                status: m.status,
                player1: or_tbd(&m.player1).to_string(),
                player2: or_tbd(&m.player2).to_string(),
                score,
                set_label: is_live.then(|| live.live.set_label.clone()),
                game_score: is_live.then(|| live.live.game_score.clone()),
                server: is_live.then_some(live.live.server),
                court: m.court.clone(),
                when: m
                    .date
                    .with_timezone(&offset)
                    .format("%a %d %b %H:%M")
                    .to_string(),
                position,
                total,
            }),
            message: String::new(),
            offline,
        }
    }

    /// Connectivity icon shown by every strategy.
    pub fn connectivity_icon(&self) -> &'static str {
        if self.offline {
            "○"
        } else {
            "●"
        }
    }

    /// Plain-text lines shared by the badge and the canvas painter.
    pub fn lines(&self) -> Vec<String> {
        let Some(card) = &self.card else {
            return vec![
                format!("{} Courtside", self.connectivity_icon()),
                self.message.clone(),
            ];
        };

        let serve = |server: Server| match card.server {
            Some(s) if s == server => "• ",
            _ => "  ",
        };

        let mut lines = vec![
            format!(
                "{} {} · {}",
                self.connectivity_icon(),
                status_label(card.status),
                card.headline
            ),
            format!("{}{}", serve(Server::PlayerOne), card.player1),
            format!("{}{}", serve(Server::PlayerTwo), card.player2),
            card.score.clone(),
        ];
        if let (Some(set), Some(game)) = (&card.set_label, &card.game_score) {
            lines.push(format!("{set} · {game}"));
        }
        let mut footer = card.when.clone();
        if let Some(court) = &card.court {
            footer = format!("{footer} · {court}");
        }
        if card.total > 1 {
            footer = format!("{footer} · {}/{}", card.position, card.total);
        }
        lines.push(footer);
        lines
    }
}

// ---------------------------------------------------------------------------
// Renderer interface
// ---------------------------------------------------------------------------

/// One way of presenting the selected match.
///
/// `mount` acquires whatever the strategy needs (window, media stream) and
/// shows `view`; `unmount` must release all of it and may be called after a
/// failed mount.
#[async_trait]
pub trait LiveMatchRenderer: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn mount(&mut self, view: &ScoreView) -> Result<(), PresentError>;

    async fn render(&mut self, view: &ScoreView) -> Result<(), PresentError>;

    /// React to a message from the companion page.
    fn on_client_message(&mut self, _msg: &ClientMessage) -> RendererSignal {
        RendererSignal::Continue
    }

    async fn unmount(&mut self);
}

/// Wait up to `limit` for a page message that `pick` resolves.
pub(crate) async fn await_client<T>(
    events: &mut broadcast::Receiver<BridgeEvent>,
    limit: Duration,
    what: &'static str,
    mut pick: impl FnMut(&ClientMessage) -> Option<Result<T, PresentError>> + Send,
) -> Result<T, PresentError> {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(BridgeEvent::Message(msg)) => {
                    if let Some(result) = pick(&msg) {
                        return result;
                    }
                }
                Ok(BridgeEvent::Disconnected) => return Err(PresentError::BridgeUnavailable),
                Ok(BridgeEvent::Connected { .. }) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Err(PresentError::BridgeUnavailable),
            }
        }
    };
    tokio::time::timeout(limit, wait)
        .await
        .map_err(|_| PresentError::Timeout { what, after: limit })?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use courtside_core::model::LiveState;

    pub(crate) fn live_match(status: MatchStatus, score: Option<&str>) -> LiveMatch {
        LiveMatch {
            base: Match {
                id: "m1".into(),
                player1: "Ana Ruiz".into(),
                player2: "Beth Cole".into(),
                score: score.map(str::to_string),
                date: Utc.with_ymd_and_hms(2026, 10, 14, 15, 30, 0).unwrap(),
                tournament: Some("Autumn Open".into()),
                status,
                court: Some("Court 1".into()),
            },
            live: LiveState {
                set_label: "Set 2".into(),
                game_score: "30-30".into(),
                server: Server::PlayerOne,
            },
        }
    }

    pub(crate) fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn live_card_carries_decorative_fields() {
        let view = ScoreView::for_match(&live_match(MatchStatus::Live, Some("6-4, 3-2")), 1, 2, false, utc());
        let card = view.card.as_ref().unwrap();
        assert_eq!(card.score, "6-4, 3-2");
        assert_eq!(card.set_label.as_deref(), Some("Set 2"));
        assert_eq!(card.server, Some(Server::PlayerOne));
        assert_eq!(card.when, "Wed 14 Oct 15:30");

        let lines = view.lines();
        assert_eq!(lines[0], "● LIVE · Autumn Open");
        assert_eq!(lines[1], "• Ana Ruiz");
        assert_eq!(lines[2], "  Beth Cole");
        assert!(lines.contains(&"Set 2 · 30-30".to_string()));
        assert!(lines.last().unwrap().ends_with("1/2"));
    }

    #[test]
    fn upcoming_without_score_shows_scheduled() {
        let view = ScoreView::for_match(&live_match(MatchStatus::Upcoming, None), 1, 1, false, utc());
        let card = view.card.as_ref().unwrap();
        assert_eq!(card.score, SCHEDULED);
        assert!(card.set_label.is_none());
        assert!(card.server.is_none());
    }

    #[test]
    fn missing_fields_render_tbd() {
        let mut live = live_match(MatchStatus::Completed, None);
        live.base.player2 = String::new();
        live.base.tournament = None;
        let view = ScoreView::for_match(&live, 1, 1, false, utc());
        let card = view.card.as_ref().unwrap();
        assert_eq!(card.player2, TBD);
        assert_eq!(card.score, TBD);
        assert_eq!(card.headline, "Live Match");
    }

    #[test]
    fn score_text_prefers_recorded_score() {
        let mut m = live_match(MatchStatus::Live, Some("7-5")).base;
        assert_eq!(score_text(&m), "7-5");
        m.score = None;
        assert_eq!(score_text(&m), TBD);
        m.status = MatchStatus::Upcoming;
        assert_eq!(score_text(&m), SCHEDULED);
    }

    #[test]
    fn blank_names_become_tbd() {
        assert_eq!(or_tbd("  "), TBD);
        assert_eq!(or_tbd("Ana Ruiz"), "Ana Ruiz");
    }

    #[test]
    fn placeholder_lines_show_message_and_offline_icon() {
        let view = ScoreView::placeholder("No live matches", true);
        assert_eq!(view.lines(), vec!["○ Courtside".to_string(), "No live matches".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn await_client_times_out() {
        let (tx, mut rx) = broadcast::channel::<BridgeEvent>(8);
        let result: Result<(), _> =
            await_client(&mut rx, Duration::from_secs(5), "video metadata", |_| None).await;
        assert!(matches!(result, Err(PresentError::Timeout { what: "video metadata", .. })));
        drop(tx);
    }

    #[tokio::test]
    async fn await_client_skips_unrelated_messages() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(BridgeEvent::Message(ClientMessage::Heartbeat)).unwrap();
        tx.send(BridgeEvent::Message(ClientMessage::VideoReady)).unwrap();
        let result = await_client(&mut rx, Duration::from_secs(5), "ready", |m| {
            (*m == ClientMessage::VideoReady).then_some(Ok(()))
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn await_client_fails_on_disconnect() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(BridgeEvent::Disconnected).unwrap();
        let result: Result<(), _> =
            await_client(&mut rx, Duration::from_secs(5), "ready", |_| None).await;
        assert!(matches!(result, Err(PresentError::BridgeUnavailable)));
    }
}
