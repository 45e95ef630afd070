// Recency/priority selection: which matches deserve the widget right now.

use chrono::{DateTime, Utc};

use crate::model::{Match, MatchStatus};

/// The priority tier a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// At least one match is in progress.
    Live,
    /// Nothing live; the soonest future match leads.
    Upcoming,
    /// Nothing live or scheduled; the latest result leads.
    Completed,
}

/// Result of running the selector over a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The input was empty: nothing has been published at all.
    NoData,
    /// There are matches, but none qualifies for any tier.
    NoCurrent,
    /// One or more matches from a single tier, in display order. Never empty.
    Current { tier: Tier, matches: Vec<Match> },
}

impl Selection {
    /// The match to show first, if any.
    pub fn primary(&self) -> Option<&Match> {
        match self {
            Selection::Current { matches, .. } => matches.first(),
            _ => None,
        }
    }

    pub fn matches(&self) -> &[Match] {
        match self {
            Selection::Current { matches, .. } => matches,
            _ => &[],
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Selection::Current { tier, .. } => Some(*tier),
            _ => None,
        }
    }
}

/// Pick the matches to display at `now`.
///
/// Tiers are tried in order and the first non-empty one wins:
/// 1. every live match, in input order;
/// 2. upcoming matches dated after `now`, soonest first;
/// 3. completed matches, most recent first.
///
/// Sorting is stable, so equal dates keep their input order.
pub fn select_current(matches: &[Match], now: DateTime<Utc>) -> Selection {
    if matches.is_empty() {
        return Selection::NoData;
    }

    let live: Vec<Match> = matches
        .iter()
        .filter(|m| m.status == MatchStatus::Live)
        .cloned()
        .collect();
    if !live.is_empty() {
        return Selection::Current {
            tier: Tier::Live,
            matches: live,
        };
    }

    let mut upcoming: Vec<Match> = matches
        .iter()
        .filter(|m| m.status == MatchStatus::Upcoming && m.date > now)
        .cloned()
        .collect();
    if !upcoming.is_empty() {
        upcoming.sort_by_key(|m| m.date);
        return Selection::Current {
            tier: Tier::Upcoming,
            matches: upcoming,
        };
    }

    let mut completed: Vec<Match> = matches
        .iter()
        .filter(|m| m.status == MatchStatus::Completed)
        .cloned()
        .collect();
    if !completed.is_empty() {
        completed.sort_by(|a, b| b.date.cmp(&a.date));
        return Selection::Current {
            tier: Tier::Completed,
            matches: completed,
        };
    }

    Selection::NoCurrent
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 15, 0, 0).unwrap()
    }

    fn m(id: &str, status: MatchStatus, offset: Duration) -> Match {
        Match {
            id: id.into(),
            player1: format!("{id} one"),
            player2: format!("{id} two"),
            score: None,
            date: now() + offset,
            tournament: None,
            status,
            court: None,
        }
    }

    fn ids(selection: &Selection) -> Vec<&str> {
        selection.matches().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn live_match_wins_over_everything() {
        let matches = vec![
            m("up", MatchStatus::Upcoming, Duration::days(1)),
            m("live", MatchStatus::Live, Duration::zero()),
            m("done", MatchStatus::Completed, -Duration::days(1)),
        ];
        let selection = select_current(&matches, now());
        assert_eq!(selection.tier(), Some(Tier::Live));
        assert_eq!(selection.primary().unwrap().status, MatchStatus::Live);
    }

    #[test]
    fn live_matches_keep_input_order() {
        let matches = vec![
            m("court-2", MatchStatus::Live, Duration::hours(1)),
            m("court-1", MatchStatus::Live, -Duration::hours(1)),
        ];
        let selection = select_current(&matches, now());
        assert_eq!(ids(&selection), vec!["court-2", "court-1"]);
    }

    #[test]
    fn soonest_upcoming_first() {
        let matches = vec![
            m("plus2", MatchStatus::Upcoming, Duration::days(2)),
            m("plus1", MatchStatus::Upcoming, Duration::days(1)),
        ];
        let selection = select_current(&matches, now());
        assert_eq!(selection.tier(), Some(Tier::Upcoming));
        assert_eq!(selection.primary().unwrap().id, "plus1");
        assert_eq!(ids(&selection), vec!["plus1", "plus2"]);
    }

    #[test]
    fn past_upcoming_matches_are_not_current() {
        let matches = vec![
            m("stale", MatchStatus::Upcoming, -Duration::hours(2)),
            m("done", MatchStatus::Completed, -Duration::days(3)),
        ];
        let selection = select_current(&matches, now());
        assert_eq!(selection.tier(), Some(Tier::Completed));
        assert_eq!(ids(&selection), vec!["done"]);
    }

    #[test]
    fn most_recent_completed_first() {
        let matches = vec![
            m("old", MatchStatus::Completed, -Duration::days(5)),
            m("recent", MatchStatus::Completed, -Duration::days(1)),
            m("middle", MatchStatus::Completed, -Duration::days(3)),
        ];
        let selection = select_current(&matches, now());
        assert_eq!(ids(&selection), vec!["recent", "middle", "old"]);
    }

    #[test]
    fn equal_dates_keep_input_order() {
        let matches = vec![
            m("b", MatchStatus::Upcoming, Duration::days(1)),
            m("a", MatchStatus::Upcoming, Duration::days(1)),
        ];
        let selection = select_current(&matches, now());
        assert_eq!(ids(&selection), vec!["b", "a"]);
    }

    #[test]
    fn empty_input_is_no_data() {
        let selection = select_current(&[], now());
        assert_eq!(selection, Selection::NoData);
        assert!(selection.primary().is_none());
    }

    #[test]
    fn only_stale_upcoming_is_no_current() {
        let matches = vec![m("stale", MatchStatus::Upcoming, -Duration::minutes(5))];
        let selection = select_current(&matches, now());
        assert_eq!(selection, Selection::NoCurrent);
        assert!(selection.matches().is_empty());
    }
}
