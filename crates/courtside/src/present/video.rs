// Canvas-to-video bridge.
//
// The score view is painted onto an off-screen ratatui buffer (the "canvas")
// and streamed to the companion page as text frames. The page draws each frame
// onto a capture canvas feeding a hidden video element and puts that element
// into Picture-in-Picture. Frames go out on every data change and on a fixed
// repaint timer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Widget};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bridge::BridgeHandle;
use crate::config::VideoConfig;
use crate::protocol::{ClientMessage, ServerMessage};

use super::{await_client, LiveMatchRenderer, PresentError, RendererSignal, ScoreView, StrategyKind};

// ---------------------------------------------------------------------------
// Canvas painting
// ---------------------------------------------------------------------------

/// Paint `view` onto a `columns` x `rows` cell buffer and read it back as
/// one string per row, trailing blanks trimmed.
pub fn paint(view: &ScoreView, columns: u16, rows: u16) -> Vec<String> {
    let area = Rect::new(0, 0, columns, rows);
    let mut buf = Buffer::empty(area);
    let lines: Vec<Line> = view.lines().into_iter().map(Line::from).collect();
    Paragraph::new(lines).render(area, &mut buf);

    (0..rows)
        .map(|y| {
            let row: String = (0..columns).map(|x| buf[(x, y)].symbol()).collect();
            row.trim_end().to_string()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Capture stream
// ---------------------------------------------------------------------------

/// One track of a captured stream. Clones share the live flag.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    live: Arc<AtomicBool>,
}

impl MediaTrack {
    fn new() -> Self {
        MediaTrack {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// The canvas capture: a single video track.
#[derive(Debug)]
pub struct FrameStream {
    tracks: Vec<MediaTrack>,
}

impl FrameStream {
    pub fn capture() -> Self {
        FrameStream {
            tracks: vec![MediaTrack::new()],
        }
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.first()
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

pub struct CanvasVideoBridge {
    bridge: BridgeHandle,
    config: VideoConfig,
    stream: Option<FrameStream>,
    /// Latest painted frame, read by the repaint timer.
    frame: watch::Sender<Vec<String>>,
    seq: Arc<AtomicU64>,
    repaint: Option<JoinHandle<()>>,
    /// `RequestPip` went out and the page has not confirmed or refused it.
    pip_requested: bool,
    in_pip: bool,
}

impl CanvasVideoBridge {
    pub fn new(bridge: BridgeHandle, config: VideoConfig) -> Self {
        let (frame, _) = watch::channel(Vec::new());
        CanvasVideoBridge {
            bridge,
            config,
            stream: None,
            frame,
            seq: Arc::new(AtomicU64::new(0)),
            repaint: None,
            pip_requested: false,
            in_pip: false,
        }
    }

    /// Tracks of the capture stream that have not been stopped.
    pub fn active_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, FrameStream::live_tracks)
    }

    /// Repaint timers still scheduled.
    pub fn pending_timers(&self) -> usize {
        self.repaint
            .as_ref()
            .map_or(0, |task| usize::from(!task.is_finished()))
    }

    async fn send_frame(&self, view: &ScoreView) -> Result<(), PresentError> {
        let rows = paint(view, self.config.columns, self.config.rows);
        self.frame.send_replace(rows.clone());
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.bridge.send(ServerMessage::VideoFrame { seq, rows }).await
    }

    async fn start(&mut self, view: &ScoreView) -> Result<(), PresentError> {
        let mut events = self.bridge.subscribe();
        self.stream = Some(FrameStream::capture());

        self.bridge
            .send(ServerMessage::AttachStream {
                width: self.config.columns,
                height: self.config.rows,
                fps: self.config.fps(),
            })
            .await?;
        self.send_frame(view).await?;

        await_client(
            &mut events,
            self.config.ready_timeout(),
            "video metadata",
            |msg| match msg {
                ClientMessage::VideoReady => Some(Ok(())),
                ClientMessage::PipFailed { reason } => {
                    Some(Err(PresentError::Denied(reason.clone())))
                }
                _ => None,
            },
        )
        .await?;

        self.bridge.send(ServerMessage::RequestPip).await?;
        self.pip_requested = true;
        await_client(
            &mut events,
            self.config.ready_timeout(),
            "Picture-in-Picture",
            |msg| match msg {
                ClientMessage::PipEntered => Some(Ok(())),
                ClientMessage::PipFailed { reason } => {
                    Some(Err(PresentError::Denied(reason.clone())))
                }
                _ => None,
            },
        )
        .await?;
        self.pip_requested = false;
        self.in_pip = true;

        let track = self
            .stream
            .as_ref()
            .and_then(FrameStream::video_track)
            .cloned()
            .ok_or(PresentError::BridgeUnavailable)?;
        self.repaint = Some(spawn_repaint(
            self.bridge.clone(),
            self.frame.subscribe(),
            Arc::clone(&self.seq),
            track,
            self.config.frame_interval(),
        ));
        Ok(())
    }

    /// Stop every track and the repaint timer.
    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop_all();
        }
        if let Some(task) = self.repaint.take() {
            task.abort();
        }
    }
}

/// Re-send the latest frame every `period` while `track` is live.
fn spawn_repaint(
    bridge: BridgeHandle,
    frame: watch::Receiver<Vec<String>>,
    seq: Arc<AtomicU64>,
    track: MediaTrack,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !track.is_live() {
                break;
            }
            let rows = frame.borrow().clone();
            let seq = seq.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = bridge.send(ServerMessage::VideoFrame { seq, rows }).await {
                debug!("Repaint timer stopping: {e}");
                break;
            }
        }
    })
}

#[async_trait]
impl LiveMatchRenderer for CanvasVideoBridge {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CanvasVideo
    }

    async fn mount(&mut self, view: &ScoreView) -> Result<(), PresentError> {
        if !self.bridge.capabilities().video_pip {
            return Err(PresentError::Unsupported(StrategyKind::CanvasVideo));
        }
        match self.start(view).await {
            Ok(()) => {
                info!("Canvas stream is in Picture-in-Picture");
                Ok(())
            }
            Err(e) => {
                warn!("Canvas Picture-in-Picture failed: {e}");
                self.release();
                // A refused request never opened a window; anything else may
                // still open one after we stopped waiting.
                if std::mem::take(&mut self.pip_requested)
                    && !matches!(e, PresentError::Denied(_))
                {
                    let _ = self.bridge.send(ServerMessage::ExitPip).await;
                }
                Err(e)
            }
        }
    }

    async fn render(&mut self, view: &ScoreView) -> Result<(), PresentError> {
        if self.stream.is_none() {
            return Ok(());
        }
        self.send_frame(view).await
    }

    fn on_client_message(&mut self, msg: &ClientMessage) -> RendererSignal {
        match msg {
            ClientMessage::PipLeft if self.in_pip => {
                info!("User left Picture-in-Picture");
                self.in_pip = false;
                self.pip_requested = false;
                RendererSignal::Closed
            }
            _ => RendererSignal::Continue,
        }
    }

    async fn unmount(&mut self) {
        self.release();
        let requested = std::mem::take(&mut self.pip_requested);
        if std::mem::take(&mut self.in_pip) || requested {
            let _ = self.bridge.send(ServerMessage::ExitPip).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
