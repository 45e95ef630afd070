// Floating badge: a fixed-position overlay in the terminal UI. Needs no
// page and never fails to mount.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::UiUpdate;

use super::{LiveMatchRenderer, PresentError, ScoreView, StrategyKind};

pub struct FloatingBadge {
    ui_tx: mpsc::Sender<UiUpdate>,
    mounted: bool,
}

impl FloatingBadge {
    pub fn new(ui_tx: mpsc::Sender<UiUpdate>) -> Self {
        FloatingBadge {
            ui_tx,
            mounted: false,
        }
    }

    async fn push(&self, badge: Option<Box<ScoreView>>) {
        if self.ui_tx.send(UiUpdate::Badge(badge)).await.is_err() {
            debug!("UI channel closed, badge update dropped");
        }
    }
}

#[async_trait]
impl LiveMatchRenderer for FloatingBadge {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FloatingBadge
    }

    async fn mount(&mut self, view: &ScoreView) -> Result<(), PresentError> {
        self.mounted = true;
        self.push(Some(Box::new(view.clone()))).await;
        Ok(())
    }

    async fn render(&mut self, view: &ScoreView) -> Result<(), PresentError> {
        if self.mounted {
            self.push(Some(Box::new(view.clone()))).await;
        }
        Ok(())
    }

    async fn unmount(&mut self) {
        if std::mem::take(&mut self.mounted) {
            self.push(None).await;
        }
    }
}
