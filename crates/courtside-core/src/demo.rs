// Canned demonstration matches, substituted when a snapshot comes back empty
// and the widget is configured to show sample data. Also used to seed a
// fresh SQLite collection.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Match, MatchStatus};

/// Two sample matches anchored at `now`: one in progress, one later today.
pub fn sample_matches(now: DateTime<Utc>) -> Vec<Match> {
    vec![
        Match {
            id: "demo-live".to_string(),
            player1: "Alex Morgan".to_string(),
            player2: "Sam Patel".to_string(),
            score: Some("6-4, 3-2".to_string()),
            date: now - Duration::minutes(45),
            tournament: Some("Club Championship".to_string()),
            status: MatchStatus::Live,
            court: Some("Court 1".to_string()),
        },
        Match {
            id: "demo-upcoming".to_string(),
            player1: "Jordan Lee".to_string(),
            player2: "Chris Novak".to_string(),
            score: None,
            date: now + Duration::hours(2),
            tournament: Some("Club Championship".to_string()),
            status: MatchStatus::Upcoming,
            court: Some("Court 2".to_string()),
        },
    ]
}
