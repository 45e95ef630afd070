// Strategy selection: run once per mount, from the page's reported
// capabilities.

use tokio::sync::mpsc;

use crate::bridge::BridgeHandle;
use crate::config::Config;
use crate::protocol::{Capabilities, UiUpdate};

use super::{CanvasVideoBridge, FloatingBadge, LiveMatchRenderer, PopoutWindow, StrategyKind};

/// Document Picture-in-Picture, else element Picture-in-Picture, else the
/// badge.
pub fn select_strategy(caps: &Capabilities) -> StrategyKind {
    if caps.document_pip {
        StrategyKind::PopOut
    } else if caps.video_pip {
        StrategyKind::CanvasVideo
    } else {
        StrategyKind::FloatingBadge
    }
}

/// Construct the (unmounted) renderer for `kind`.
pub fn build_renderer(
    kind: StrategyKind,
    config: &Config,
    bridge: &BridgeHandle,
    ui_tx: &mpsc::Sender<UiUpdate>,
) -> Box<dyn LiveMatchRenderer> {
    match kind {
        StrategyKind::PopOut => Box::new(PopoutWindow::new(bridge.clone(), config.popout.clone())),
        StrategyKind::CanvasVideo => {
            Box::new(CanvasVideoBridge::new(bridge.clone(), config.video.clone()))
        }
        StrategyKind::FloatingBadge => Box::new(FloatingBadge::new(ui_tx.clone())),
    }
}
