// Application state and orchestration logic.
//
// A single event loop owns every piece of widget state. It coordinates store
// snapshots, companion page events, user commands from the TUI and the
// auto-refresh tick, and pushes UI updates to the TUI render loop.

use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use courtside_core::model::Match;
use courtside_core::recency::filter_recent;
use courtside_core::store::{MatchStore, Snapshot, Subscription};
use courtside_core::synth::ScoreStateProvider;

use crate::bridge::{BridgeEvent, BridgeHandle};
use crate::config::Config;
use crate::present::{
    build_renderer, or_tbd, score_text, select_strategy, status_label, LiveMatchRenderer,
    RendererSignal, StrategyKind,
};
use crate::protocol::{
    Capabilities, ClientMessage, ConnectionStatus, DashboardRow, DashboardView, UiUpdate,
    UserCommand, WidgetStatus,
};
use crate::session::{PresentationSession, WidgetPhase};

/// Snapshots forwarded from store subscription callbacks into the loop.
#[derive(Debug)]
pub enum FeedEvent {
    /// For the widget subscription opened as `generation`.
    Widget { generation: u64, snapshot: Snapshot },
    Dashboard(Snapshot),
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Everything the event loop mutates, passed explicitly to every handler.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn MatchStore>,
    pub bridge: BridgeHandle,
    pub provider: Box<dyn ScoreStateProvider>,
    /// `None` while the widget is closed.
    pub session: Option<PresentationSession>,
    pub renderer: Option<Box<dyn LiveMatchRenderer>>,
    pub widget_feed: Option<Subscription>,
    pub dashboard_feed: Option<Subscription>,
    pub dashboard: DashboardView,
    pub refresh_timer: Option<Interval>,
    pub connection_status: ConnectionStatus,
    /// Incremented on every widget open. Snapshots queued by an earlier
    /// subscription are discarded.
    pub feed_generation: u64,
    pub ui_tx: mpsc::Sender<UiUpdate>,
    pub feed_tx: mpsc::UnboundedSender<FeedEvent>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn MatchStore>,
        bridge: BridgeHandle,
        provider: Box<dyn ScoreStateProvider>,
        ui_tx: mpsc::Sender<UiUpdate>,
        feed_tx: mpsc::UnboundedSender<FeedEvent>,
    ) -> Self {
        AppState {
            config,
            store,
            bridge,
            provider,
            session: None,
            renderer: None,
            widget_feed: None,
            dashboard_feed: None,
            dashboard: DashboardView::default(),
            refresh_timer: None,
            connection_status: ConnectionStatus::Disconnected,
            feed_generation: 0,
            ui_tx,
            feed_tx,
        }
    }

    pub fn widget_status(&self) -> WidgetStatus {
        match &self.session {
            Some(session) => session.status(self.renderer.as_ref().map(|r| r.kind())),
            None => WidgetStatus {
                phase: WidgetPhase::Closed,
                auto_refresh: self.config.widget.auto_refresh,
                sound_enabled: self.config.widget.sound_enabled,
                ..WidgetStatus::default()
            },
        }
    }

    /// Subscribe the dashboard panel. Independent of the widget's feed.
    pub fn start_dashboard(&mut self) {
        let tx = self.feed_tx.clone();
        self.dashboard_feed = Some(self.store.subscribe(Box::new(move |snapshot| {
            let _ = tx.send(FeedEvent::Dashboard(snapshot));
        })));
    }

    fn start_widget_feed(&mut self) {
        self.feed_generation += 1;
        let generation = self.feed_generation;
        let tx = self.feed_tx.clone();
        self.widget_feed = Some(self.store.subscribe(Box::new(move |snapshot| {
            let _ = tx.send(FeedEvent::Widget {
                generation,
                snapshot,
            });
        })));
    }

    fn set_refresh_timer(&mut self, enabled: bool) {
        self.refresh_timer = enabled.then(|| {
            let period = self.config.widget.refresh_interval();
            let mut timer = tokio::time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens using `tokio::select!` on:
/// 1. Store snapshots (widget and dashboard subscriptions)
/// 2. Companion page events
/// 3. User commands from the TUI
/// 4. The auto-refresh tick, while the widget is open with auto-refresh on
pub async fn run(
    mut feed_rx: mpsc::UnboundedReceiver<FeedEvent>,
    mut bridge_rx: broadcast::Receiver<BridgeEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    state.start_dashboard();
    push(&state.ui_tx, UiUpdate::Widget(state.widget_status())).await;

    // When the bridge goes away, stop polling its channel so select! does
    // not spin on a closed receiver.
    let mut bridge_open = true;

    loop {
        tokio::select! {
            feed = feed_rx.recv() => {
                match feed {
                    Some(event) => handle_feed(&mut state, event).await,
                    None => {
                        info!("Feed channel closed, shutting down");
                        break;
                    }
                }
            }

            event = bridge_rx.recv(), if bridge_open => {
                match event {
                    Ok(event) => handle_bridge_event(&mut state, event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {skipped} bridge events");
                    }
                    Err(RecvError::Closed) => {
                        info!("Bridge channel closed");
                        bridge_open = false;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            _ = next_tick(&mut state.refresh_timer) => {
                refresh_widget(&mut state).await;
            }
        }
    }

    close_widget(&mut state).await;
    if let Some(mut feed) = state.dashboard_feed.take() {
        feed.unsubscribe();
    }
    info!("Application event loop exiting");
    Ok(())
}

/// Resolves on the timer's next tick; never resolves without a timer.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn push(ui_tx: &mpsc::Sender<UiUpdate>, update: UiUpdate) {
    if ui_tx.send(update).await.is_err() {
        debug!("UI channel closed, update dropped");
    }
}

async fn notify(state: &AppState, message: impl Into<String>) {
    push(&state.ui_tx, UiUpdate::Notice(message.into())).await;
}

// ---------------------------------------------------------------------------
// Widget lifecycle
// ---------------------------------------------------------------------------

/// `Closed → Loading`: pick a strategy, mount it, then subscribe.
pub async fn open_widget(state: &mut AppState) {
    if state.session.is_some() {
        debug!("Widget already open");
        return;
    }

    let session = PresentationSession::open(&state.config.widget);
    let caps = state.bridge.capabilities();
    let kind = select_strategy(&caps);
    info!("Opening widget with strategy {kind:?} ({caps:?})");

    let renderer = mount_renderer(state, kind, &session).await;
    state.set_refresh_timer(session.auto_refresh());
    state.session = Some(session);
    state.renderer = Some(renderer);
    state.start_widget_feed();

    push(&state.ui_tx, UiUpdate::Widget(state.widget_status())).await;
}

/// Mount `kind`, falling back to the floating badge if it fails.
async fn mount_renderer(
    state: &AppState,
    kind: StrategyKind,
    session: &PresentationSession,
) -> Box<dyn LiveMatchRenderer> {
    let view = session.view();
    let mut renderer = build_renderer(kind, &state.config, &state.bridge, &state.ui_tx);
    let failure = match renderer.mount(&view).await {
        Ok(()) => return renderer,
        Err(e) => e,
    };

    warn!("Failed to mount {kind:?}: {failure}");
    renderer.unmount().await;
    notify(
        state,
        format!("{} unavailable ({failure}), showing the badge", kind.label()),
    )
    .await;

    let mut badge = build_renderer(
        StrategyKind::FloatingBadge,
        &state.config,
        &state.bridge,
        &state.ui_tx,
    );
    if let Err(e) = badge.mount(&view).await {
        warn!("Badge failed to mount: {e}");
    }
    badge
}

/// `Displaying → Closed`: unsubscribe, stop the timer, release the surface.
pub async fn close_widget(state: &mut AppState) {
    if let Some(mut feed) = state.widget_feed.take() {
        feed.unsubscribe();
    }
    state.refresh_timer = None;
    if let Some(mut renderer) = state.renderer.take() {
        renderer.unmount().await;
    }
    if state.session.take().is_some() {
        info!("Widget closed");
        push(&state.ui_tx, UiUpdate::Widget(state.widget_status())).await;
    }
}

/// Swap the mounted renderer for the badge, keeping the session.
async fn fall_back_to_badge(state: &mut AppState) {
    let Some(session) = &state.session else {
        return;
    };
    if state.renderer.as_ref().map(|r| r.kind()) == Some(StrategyKind::FloatingBadge) {
        return;
    }
    if let Some(mut old) = state.renderer.take() {
        old.unmount().await;
    }
    let badge = mount_renderer(state, StrategyKind::FloatingBadge, session).await;
    state.renderer = Some(badge);
    push(&state.ui_tx, UiUpdate::Widget(state.widget_status())).await;
}

/// Push the session's current view to the mounted renderer.
async fn render_widget(state: &mut AppState) {
    let (Some(session), Some(renderer)) = (&state.session, state.renderer.as_mut()) else {
        return;
    };
    if let Err(e) = renderer.render(&session.view()).await {
        warn!("Render via {:?} failed: {e}", renderer.kind());
    }
    push(&state.ui_tx, UiUpdate::Widget(state.widget_status())).await;
}

/// Re-run selection and synthesis on the last snapshot.
async fn refresh_widget(state: &mut AppState) {
    let Some(session) = state.session.as_mut() else {
        return;
    };
    if session.refresh(Utc::now(), state.provider.as_mut()).is_some() {
        render_widget(state).await;
    }
}

// ---------------------------------------------------------------------------
// Event handlers
// ---------------------------------------------------------------------------

async fn handle_feed(state: &mut AppState, event: FeedEvent) {
    match event {
        FeedEvent::Widget {
            generation,
            snapshot,
        } => {
            let Some(session) = state.session.as_mut() else {
                debug!("Snapshot for closed widget ignored");
                return;
            };
            if generation != state.feed_generation {
                debug!("Stale snapshot from subscription {generation} ignored");
                return;
            }
            let outcome = session.apply_snapshot(snapshot, Utc::now(), state.provider.as_mut());
            let chime = outcome.score_changed && session.sound_enabled();
            render_widget(state).await;
            if chime {
                push(&state.ui_tx, UiUpdate::Chime).await;
            }
        }
        FeedEvent::Dashboard(snapshot) => {
            match snapshot {
                Ok(matches) => {
                    state.dashboard =
                        build_dashboard(&matches, Utc::now(), state.config.widget.utc_offset());
                }
                Err(e) => {
                    warn!("Dashboard feed unavailable: {e}");
                    state.dashboard.offline = true;
                }
            }
            push(&state.ui_tx, UiUpdate::Dashboard(state.dashboard.clone())).await;
        }
    }
}

/// Recent matches for the dashboard panel.
pub fn build_dashboard(
    matches: &[Match],
    now: chrono::DateTime<Utc>,
    offset: FixedOffset,
) -> DashboardView {
    let recent = filter_recent(matches, now, offset);
    let rows = recent
        .matches
        .iter()
        .map(|m| DashboardRow {
            when: m.date.with_timezone(&offset).format("%a %H:%M").to_string(),
            status: status_label(m.status).to_string(),
            players: format!("{} v {}", or_tbd(&m.player1), or_tbd(&m.player2)),
            score: score_text(m),
            tournament: m.tournament.clone().unwrap_or_default(),
        })
        .collect();
    DashboardView {
        window: recent.window.map(|w| w.label().to_string()),
        rows,
        offline: false,
    }
}

async fn handle_bridge_event(state: &mut AppState, event: BridgeEvent) {
    match event {
        BridgeEvent::Connected { addr } => {
            info!("Companion page connected from {addr}");
            state.connection_status = ConnectionStatus::Connected;
            push(
                &state.ui_tx,
                UiUpdate::Bridge {
                    status: ConnectionStatus::Connected,
                    capabilities: Capabilities::none(),
                },
            )
            .await;
        }
        BridgeEvent::Disconnected => {
            info!("Companion page disconnected");
            state.connection_status = ConnectionStatus::Disconnected;
            push(
                &state.ui_tx,
                UiUpdate::Bridge {
                    status: ConnectionStatus::Disconnected,
                    capabilities: Capabilities::none(),
                },
            )
            .await;
            // Whatever the page was showing is gone with it.
            fall_back_to_badge(state).await;
        }
        BridgeEvent::Message(ClientMessage::Hello { payload }) => {
            push(
                &state.ui_tx,
                UiUpdate::Bridge {
                    status: ConnectionStatus::Connected,
                    capabilities: payload.capabilities(),
                },
            )
            .await;
        }
        BridgeEvent::Message(msg) => {
            let Some(renderer) = state.renderer.as_mut() else {
                return;
            };
            if renderer.on_client_message(&msg) == RendererSignal::Closed {
                info!("{:?} closed from the page, closing widget", renderer.kind());
                close_widget(state).await;
            }
        }
    }
}

async fn handle_user_command(state: &mut AppState, cmd: UserCommand) {
    match cmd {
        UserCommand::OpenWidget => open_widget(state).await,
        UserCommand::CloseWidget => close_widget(state).await,
        UserCommand::Quit => {
            // Handled in the main loop
        }
        cmd => {
            let Some(session) = state.session.as_mut() else {
                notify(state, "Widget is closed (press p to open it)").await;
                return;
            };
            match cmd {
                UserCommand::NextMatch => {
                    if session.next() {
                        render_widget(state).await;
                    }
                }
                UserCommand::PreviousMatch => {
                    if session.previous() {
                        render_widget(state).await;
                    }
                }
                UserCommand::ToggleAutoRefresh => {
                    let enabled = session.toggle_auto_refresh();
                    info!("Auto-refresh {}", if enabled { "on" } else { "off" });
                    state.set_refresh_timer(enabled);
                    push(&state.ui_tx, UiUpdate::Widget(state.widget_status())).await;
                }
                UserCommand::ToggleSound => {
                    session.toggle_sound();
                    push(&state.ui_tx, UiUpdate::Widget(state.widget_status())).await;
                }
                UserCommand::Refresh => refresh_widget(state).await,
                UserCommand::OpenWidget | UserCommand::CloseWidget | UserCommand::Quit => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
