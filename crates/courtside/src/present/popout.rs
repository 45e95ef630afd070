// Pop-out window: a same-origin document window opened by the companion page
// (Document Picture-in-Picture). Every change replaces its whole document.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::bridge::BridgeHandle;
use crate::config::PopoutConfig;
use crate::protocol::{ClientMessage, ServerMessage};

use super::{
    await_client, status_label, LiveMatchRenderer, PresentError, RendererSignal, ScoreView,
    StrategyKind,
};
use courtside_core::model::Server;

const STYLE: &str = "body{margin:0;font-family:system-ui,sans-serif;background:#0b3d2e;color:#fff}\
.card{padding:12px}.head{font-size:12px;opacity:.8}.live{color:#ff5a5a;font-weight:700}\
.player{font-size:16px}.serve::before{content:'\\2022 ';color:#d4ff3a}\
.score{font-size:22px;font-weight:700;margin:6px 0}.meta{font-size:12px;opacity:.8}";

pub struct PopoutWindow {
    bridge: BridgeHandle,
    config: PopoutConfig,
    open: bool,
}

impl PopoutWindow {
    pub fn new(bridge: BridgeHandle, config: PopoutConfig) -> Self {
        PopoutWindow {
            bridge,
            config,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// Escape text for an HTML text node or quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The complete document shown in the pop-out window.
pub fn render_document(view: &ScoreView) -> String {
    let body = match &view.card {
        None => format!(
            "<div class=\"head\">{} Courtside</div><div class=\"meta\">{}</div>",
            view.connectivity_icon(),
            escape_html(&view.message)
        ),
        Some(card) => {
            let player = |name: &str, who: Server| {
                let class = if card.server == Some(who) {
                    "player serve"
                } else {
                    "player"
                };
                format!("<div class=\"{class}\">{}</div>", escape_html(name))
            };
            let mut html = format!(
                "<div class=\"head\">{} <span class=\"{}\">{}</span> · {}</div>",
                view.connectivity_icon(),
                if card.set_label.is_some() { "live" } else { "status" },
                status_label(card.status),
                escape_html(&card.headline)
            );
            html.push_str(&player(&card.player1, Server::PlayerOne));
            html.push_str(&player(&card.player2, Server::PlayerTwo));
            html.push_str(&format!(
                "<div class=\"score\">{}</div>",
                escape_html(&card.score)
            ));
            if let (Some(set), Some(game)) = (&card.set_label, &card.game_score) {
                html.push_str(&format!(
                    "<div class=\"meta\">{} · {}</div>",
                    escape_html(set),
                    escape_html(game)
                ));
            }
            let mut meta = escape_html(&card.when);
            if let Some(court) = &card.court {
                meta.push_str(&format!(" · {}", escape_html(court)));
            }
            if card.total > 1 {
                meta.push_str(&format!(" · {}/{}", card.position, card.total));
            }
            html.push_str(&format!("<div class=\"meta\">{meta}</div>"));
            html
        }
    };

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Courtside</title>\
         <style>{STYLE}</style></head><body><div class=\"card\">{body}</div></body></html>"
    )
}

#[async_trait]
impl LiveMatchRenderer for PopoutWindow {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PopOut
    }

    async fn mount(&mut self, view: &ScoreView) -> Result<(), PresentError> {
        if !self.bridge.capabilities().document_pip {
            return Err(PresentError::Unsupported(StrategyKind::PopOut));
        }

        let mut events = self.bridge.subscribe();
        self.bridge
            .send(ServerMessage::OpenWindow {
                width: self.config.width,
                height: self.config.height,
            })
            .await?;

        let opened = await_client(
            &mut events,
            self.config.open_timeout(),
            "pop-out window",
            |msg| match msg {
                ClientMessage::WindowOpened => Some(Ok(())),
                ClientMessage::PipFailed { reason } => {
                    Some(Err(PresentError::Denied(reason.clone())))
                }
                _ => None,
            },
        )
        .await;
        if let Err(e) = opened {
            warn!("Pop-out window did not open: {e}");
            // It may still open late; make sure it does not linger.
            let _ = self.bridge.send(ServerMessage::CloseWindow).await;
            return Err(e);
        }

        info!(
            "Pop-out window open ({}x{})",
            self.config.width, self.config.height
        );
        self.open = true;
        self.render(view).await
    }

    async fn render(&mut self, view: &ScoreView) -> Result<(), PresentError> {
        if !self.open {
            return Ok(());
        }
        self.bridge
            .send(ServerMessage::RenderDocument {
                html: render_document(view),
            })
            .await
    }

    fn on_client_message(&mut self, msg: &ClientMessage) -> RendererSignal {
        match msg {
            ClientMessage::WindowClosed if self.open => {
                info!("Pop-out window closed by the user");
                self.open = false;
                RendererSignal::Closed
            }
            _ => RendererSignal::Continue,
        }
    }

    async fn unmount(&mut self) {
        if std::mem::take(&mut self.open) {
            let _ = self.bridge.send(ServerMessage::CloseWindow).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::FakePage;
    use crate::present::tests::{live_match, utc};
    use crate::protocol::Capabilities;
    use courtside_core::model::MatchStatus;

    fn popout_config() -> PopoutConfig {
        PopoutConfig {
            width: 320,
            height: 180,
            open_timeout_secs: 5,
        }
    }

    fn doc_caps() -> Option<Capabilities> {
        Some(Capabilities {
            document_pip: true,
            video_pip: true,
        })
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn document_marks_server_and_escapes_names() {
        let mut live = live_match(MatchStatus::Live, Some("6-4, 3-2"));
        live.base.player2 = "O'Neil <jr>".into();
        let html = render_document(&ScoreView::for_match(&live, 1, 1, false, utc()));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<div class=\"player serve\">Ana Ruiz</div>"));
        assert!(html.contains("<div class=\"player\">O&#39;Neil &lt;jr&gt;</div>"));
        assert!(html.contains("<div class=\"score\">6-4, 3-2</div>"));
        assert!(html.contains("Set 2 · 30-30"));
    }

    #[test]
    fn document_for_placeholder_shows_message() {
        let html = render_document(&ScoreView::placeholder("No matches", true));
        assert!(html.contains("○ Courtside"));
        assert!(html.contains("No matches"));
    }

    #[tokio::test]
    async fn mount_opens_then_renders_document() {
        let (mut page, bridge) = FakePage::new(doc_caps());
        let mut popout = PopoutWindow::new(bridge, popout_config());
        let view = ScoreView::placeholder("Loading matches…", false);

        let page_side = async {
            assert_eq!(
                page.next_sent().await,
                ServerMessage::OpenWindow {
                    width: 320,
                    height: 180
                }
            );
            page.reply(ClientMessage::WindowOpened);
        };
        let (mounted, ()) = tokio::join!(popout.mount(&view), page_side);
        mounted.unwrap();
        assert!(popout.is_open());
        assert!(matches!(
            page.next_sent().await,
            ServerMessage::RenderDocument { .. }
        ));

        popout.unmount().await;
        assert!(!popout.is_open());
        assert_eq!(page.sent(), vec![ServerMessage::CloseWindow]);
    }

    #[tokio::test]
    async fn window_closed_by_page_clears_state() {
        let (mut page, bridge) = FakePage::new(doc_caps());
        let mut popout = PopoutWindow::new(bridge, popout_config());
        let view = ScoreView::placeholder("No matches", false);

        let page_side = async {
            page.next_sent().await;
            page.reply(ClientMessage::WindowOpened);
        };
        let (mounted, ()) = tokio::join!(popout.mount(&view), page_side);
        mounted.unwrap();
        page.sent();

        assert_eq!(
            popout.on_client_message(&ClientMessage::WindowClosed),
            RendererSignal::Closed
        );
        assert!(!popout.is_open());

        // Nothing left to close, nothing to render into.
        popout.render(&view).await.unwrap();
        popout.unmount().await;
        assert!(page.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn open_timeout_reports_and_closes_stray_window() {
        let (mut page, bridge) = FakePage::new(doc_caps());
        let mut popout = PopoutWindow::new(bridge, popout_config());

        let result = popout
            .mount(&ScoreView::placeholder("No matches", false))
            .await;
        assert!(matches!(
            result,
            Err(PresentError::Timeout { what: "pop-out window", .. })
        ));
        assert!(!popout.is_open());
        assert_eq!(
            page.sent(),
            vec![
                ServerMessage::OpenWindow {
                    width: 320,
                    height: 180
                },
                ServerMessage::CloseWindow
            ]
        );
    }

    #[tokio::test]
    async fn unsupported_without_document_pip() {
        let (_page, bridge) = FakePage::new(None);
        let mut popout = PopoutWindow::new(bridge, popout_config());
        let result = popout
            .mount(&ScoreView::placeholder("No matches", false))
            .await;
        assert!(matches!(
            result,
            Err(PresentError::Unsupported(StrategyKind::PopOut))
        ));
    }
}
