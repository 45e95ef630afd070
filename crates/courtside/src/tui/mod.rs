// Terminal UI: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the orchestrator reports. The
// orchestrator pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::io::Write;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::debug;

use crate::present::ScoreView;
use crate::protocol::{
    Capabilities, ConnectionStatus, DashboardView, UiUpdate, UserCommand, WidgetStatus,
};

use layout::{build_layout, AppLayout};

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local mirror of the orchestrator's state, updated incrementally via
/// `UiUpdate` messages.
#[derive(Debug, Default)]
pub struct ViewState {
    /// Floating badge contents; `None` hides the overlay.
    pub badge: Option<ScoreView>,
    pub widget: WidgetStatus,
    pub dashboard: DashboardView,
    pub connection_status: ConnectionStatus,
    pub capabilities: Capabilities,
    /// Last notice from the orchestrator.
    pub notice: Option<String>,
    /// Set by `Chime`, cleared once the bell has been written.
    pub chime_pending: bool,
    /// First visible dashboard row.
    pub scroll_offset: usize,
    pub confirm_quit: bool,
}

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Badge(view) => {
            state.badge = view.map(|v| *v);
        }
        UiUpdate::Widget(status) => {
            state.widget = status;
        }
        UiUpdate::Dashboard(dashboard) => {
            let last = dashboard.rows.len().saturating_sub(1);
            state.scroll_offset = state.scroll_offset.min(last);
            state.dashboard = dashboard;
        }
        UiUpdate::Bridge {
            status,
            capabilities,
        } => {
            state.connection_status = status;
            state.capabilities = capabilities;
        }
        UiUpdate::Notice(message) => {
            state.notice = Some(message);
        }
        UiUpdate::Chime => {
            state.chime_pending = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete frame.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::match_list::render(frame, layout.main_panel, state);
    render_notice(frame, &layout, state);
    render_help_bar(frame, &layout);

    if let Some(view) = &state.badge {
        widgets::badge::render(frame, layout.badge, view);
    }
    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

fn render_notice(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let text = state.notice.as_deref().unwrap_or("");
    let paragraph = Paragraph::new(Line::from(Span::styled(
        format!(" {text}"),
        Style::default().fg(Color::Yellow),
    )));
    frame.render_widget(paragraph, layout.notice);
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout) {
    let text = " p:Widget | ←/→:Page | a:Auto-refresh | s:Sound | r:Refresh | j/k:Scroll | q:Quit";
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

/// Ring the terminal bell.
fn ring_bell() {
    let mut stdout = std::io::stdout();
    if let Err(e) = stdout.write_all(b"\x07").and_then(|()| stdout.flush()) {
        debug!("Failed to ring bell: {e}");
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits or the orchestrator goes
/// away.
///
/// Initializes the terminal, installs a panic hook that restores it, then
/// selects over UI updates, keyboard input and render ticks.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // Orchestrator is shutting down.
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
                if std::mem::take(&mut view_state.chime_pending) {
                    ring_bell();
                }
            }
        }
    }

    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
