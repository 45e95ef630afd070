// Coarse recency filter applied before priority selection in the
// recent-window mode: today, else this calendar week, else the last 7 days.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};

use crate::model::Match;

/// Which window produced a [`Recent`] result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyWindow {
    Today,
    ThisWeek,
    LastSevenDays,
}

impl RecencyWindow {
    pub fn label(self) -> &'static str {
        match self {
            RecencyWindow::Today => "Today",
            RecencyWindow::ThisWeek => "This week",
            RecencyWindow::LastSevenDays => "Last 7 days",
        }
    }
}

/// Matches that survived the recency filter. `window` is `None` when all
/// three windows were empty, which is a normal "no matches" state.
#[derive(Debug, Clone, PartialEq)]
pub struct Recent {
    pub window: Option<RecencyWindow>,
    pub matches: Vec<Match>,
}

impl Recent {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Narrow `matches` to the first non-empty recency window.
///
/// Calendar days and weeks (ISO, Monday first) are evaluated in the club's
/// local time given by `offset`. The 7-day window is `now - 7d ..= now`.
/// Input order is preserved inside the chosen window.
pub fn filter_recent(matches: &[Match], now: DateTime<Utc>, offset: FixedOffset) -> Recent {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive();
    let this_week = today.iso_week();

    let todays = matching(matches, |m| m.date.with_timezone(&offset).date_naive() == today);
    if !todays.is_empty() {
        return Recent {
            window: Some(RecencyWindow::Today),
            matches: todays,
        };
    }

    let weeks = matching(matches, |m| m.date.with_timezone(&offset).date_naive().iso_week() == this_week);
    if !weeks.is_empty() {
        return Recent {
            window: Some(RecencyWindow::ThisWeek),
            matches: weeks,
        };
    }

    let cutoff = now - Duration::days(7);
    let last_seven = matching(matches, |m| m.date >= cutoff && m.date <= now);
    if !last_seven.is_empty() {
        return Recent {
            window: Some(RecencyWindow::LastSevenDays),
            matches: last_seven,
        };
    }

    Recent {
        window: None,
        matches: Vec::new(),
    }
}

fn matching(matches: &[Match], pred: impl Fn(&Match) -> bool) -> Vec<Match> {
    matches.iter().filter(|m| pred(m)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
