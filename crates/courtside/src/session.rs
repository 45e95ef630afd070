// Presentation session: the widget's state between open and close.
//
// Owned by the orchestrator and mutated only from its select loop. Holds the
// last raw snapshot so the auto-refresh tick can re-run selection and score
// synthesis without touching the store.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, warn};

use courtside_core::demo;
use courtside_core::model::{LiveMatch, Match};
use courtside_core::recency::filter_recent;
use courtside_core::selector::{select_current, Selection};
use courtside_core::store::Snapshot;
use courtside_core::synth::ScoreStateProvider;

use crate::config::{SelectionMode, WidgetConfig};
use crate::present::{ScoreView, StrategyKind};
use crate::protocol::WidgetStatus;

pub const LOADING: &str = "Loading matches…";
pub const NO_LIVE: &str = "No live matches";
pub const NO_CURRENT: &str = "No current matches";
pub const NO_MATCHES: &str = "No matches";

/// `Closed → Loading → Displaying(i) ⇄ Displaying(j)`, and back to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetPhase {
    Closed,
    /// Waiting for the first snapshot.
    Loading,
    Displaying { selected: usize },
}

/// Result of feeding a snapshot or tick into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshOutcome {
    /// The selected match is the same one as before and its score changed.
    pub score_changed: bool,
}

pub struct PresentationSession {
    phase: WidgetPhase,
    mode: SelectionMode,
    offset: FixedOffset,
    demo_fallback: bool,
    auto_refresh: bool,
    sound_enabled: bool,
    last_refresh: Option<DateTime<Utc>>,
    offline: bool,
    /// Last good snapshot. `None` before the first one and after a failure.
    snapshot: Option<Vec<Match>>,
    matches: Vec<LiveMatch>,
    /// Shown when `matches` is empty.
    message: &'static str,
}

impl PresentationSession {
    /// A freshly mounted session, waiting for its first snapshot.
    pub fn open(config: &WidgetConfig) -> Self {
        PresentationSession {
            phase: WidgetPhase::Loading,
            mode: config.selection,
            offset: config.utc_offset(),
            demo_fallback: config.demo_fallback,
            auto_refresh: config.auto_refresh,
            sound_enabled: config.sound_enabled,
            last_refresh: None,
            offline: false,
            snapshot: None,
            matches: Vec::new(),
            message: LOADING,
        }
    }

    pub fn phase(&self) -> WidgetPhase {
        self.phase
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// The matches currently being paged through, already augmented.
    pub fn matches(&self) -> &[LiveMatch] {
        &self.matches
    }

    pub fn current(&self) -> Option<&LiveMatch> {
        match self.phase {
            WidgetPhase::Displaying { selected } => self.matches.get(selected),
            _ => None,
        }
    }

    /// Take a snapshot delivered by the store subscription.
    pub fn apply_snapshot(
        &mut self,
        snapshot: Snapshot,
        now: DateTime<Utc>,
        provider: &mut dyn ScoreStateProvider,
    ) -> RefreshOutcome {
        match snapshot {
            Ok(mut matches) => {
                if matches.is_empty() && self.demo_fallback {
                    debug!("Empty snapshot, substituting demo matches");
                    matches = demo::sample_matches(now);
                }
                self.offline = false;
                self.snapshot = Some(matches);
            }
            Err(e) => {
                warn!("Match store unavailable: {e}");
                self.offline = true;
                self.snapshot = None;
            }
        }
        self.recompute(now, provider)
    }

    /// Re-run selection and synthesis over the last snapshot. Does nothing
    /// while no snapshot has arrived yet.
    pub fn refresh(
        &mut self,
        now: DateTime<Utc>,
        provider: &mut dyn ScoreStateProvider,
    ) -> Option<RefreshOutcome> {
        if self.phase == WidgetPhase::Loading {
            return None;
        }
        Some(self.recompute(now, provider))
    }

    fn recompute(
        &mut self,
        now: DateTime<Utc>,
        provider: &mut dyn ScoreStateProvider,
    ) -> RefreshOutcome {
        let previous = self
            .current()
            .map(|m| (m.base.id.clone(), m.base.score.clone()));

        let (selection, message) = match &self.snapshot {
            None => (Selection::NoData, NO_LIVE),
            Some(all) => {
                let selection = match self.mode {
                    SelectionMode::Priority => select_current(all, now),
                    SelectionMode::Recent => {
                        let recent = filter_recent(all, now, self.offset);
                        if let Some(window) = recent.window {
                            debug!("Recency window: {}", window.label());
                        }
                        select_current(&recent.matches, now)
                    }
                };
                let message = match selection {
                    Selection::NoData => NO_MATCHES,
                    Selection::NoCurrent => NO_CURRENT,
                    Selection::Current { .. } => "",
                };
                (selection, message)
            }
        };

        self.message = message;
        self.matches = selection
            .matches()
            .iter()
            .cloned()
            .map(|m| provider.augment(m))
            .collect();

        // Keep the same match selected across refreshes when it survives.
        let selected = previous
            .as_ref()
            .and_then(|(id, _)| self.matches.iter().position(|m| &m.base.id == id))
            .unwrap_or(0);
        self.phase = WidgetPhase::Displaying { selected };
        self.last_refresh = Some(now);

        let score_changed = match (previous, self.current()) {
            (Some((id, score)), Some(now_showing)) => {
                now_showing.base.id == id && now_showing.base.score != score
            }
            _ => false,
        };
        RefreshOutcome { score_changed }
    }

    /// Page forward, wrapping at the end. Returns whether the selection
    /// moved.
    pub fn next(&mut self) -> bool {
        self.step(1)
    }

    /// Page backward, wrapping at the start.
    pub fn previous(&mut self) -> bool {
        self.step(self.matches.len().saturating_sub(1))
    }

    fn step(&mut self, by: usize) -> bool {
        let WidgetPhase::Displaying { selected } = self.phase else {
            return false;
        };
        let len = self.matches.len();
        if len < 2 {
            return false;
        }
        self.phase = WidgetPhase::Displaying {
            selected: (selected + by) % len,
        };
        true
    }

    pub fn toggle_auto_refresh(&mut self) -> bool {
        self.auto_refresh = !self.auto_refresh;
        self.auto_refresh
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }

    /// The view every presentation strategy renders.
    pub fn view(&self) -> ScoreView {
        match (self.phase, self.current()) {
            (WidgetPhase::Displaying { selected }, Some(live)) => ScoreView::for_match(
                live,
                selected + 1,
                self.matches.len(),
                self.offline,
                self.offset,
            ),
            _ => ScoreView::placeholder(self.message, self.offline),
        }
    }

    pub fn status(&self, strategy: Option<StrategyKind>) -> WidgetStatus {
        let position = match self.phase {
            WidgetPhase::Displaying { selected } if !self.matches.is_empty() => {
                Some((selected + 1, self.matches.len()))
            }
            _ => None,
        };
        WidgetStatus {
            phase: self.phase,
            strategy,
            position,
            auto_refresh: self.auto_refresh,
            sound_enabled: self.sound_enabled,
            last_refresh: self.last_refresh,
            offline: self.offline,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
