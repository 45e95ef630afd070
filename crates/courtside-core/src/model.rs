// Match records as the store holds them, and the decoded in-memory shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// MatchStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a tracked match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Completed,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "upcoming",
            MatchStatus::Live => "live",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = DecodeIssue;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(MatchStatus::Upcoming),
            "live" => Ok(MatchStatus::Live),
            "completed" => Ok(MatchStatus::Completed),
            _ => Err(DecodeIssue::UnknownStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreTimestamp
// ---------------------------------------------------------------------------

/// The store's native timestamp: whole seconds since the Unix epoch plus a
/// nanosecond fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub seconds: i64,
    #[serde(default)]
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        StoreTimestamp {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }

    /// Convert to a UTC date-time. Returns `None` when the value is outside
    /// the representable range or the fraction is not below one second.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.nanoseconds >= 1_000_000_000 {
            return None;
        }
        DateTime::<Utc>::from_timestamp(self.seconds, self.nanoseconds)
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// One tracked tennis match, decoded from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: String,
    pub player1: String,
    pub player2: String,
    /// Free-text score such as "6-4, 3-2". `None` when nothing was entered.
    pub score: Option<String>,
    pub date: DateTime<Utc>,
    pub tournament: Option<String>,
    pub status: MatchStatus,
    pub court: Option<String>,
}

impl Match {
    /// Whether the match is display-eligible as "current" at `now`: live, or
    /// upcoming with a date strictly in the future.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            MatchStatus::Live => true,
            MatchStatus::Upcoming => self.date > now,
            MatchStatus::Completed => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw records and decoding
// ---------------------------------------------------------------------------

/// Reasons a stored record could not be turned into a [`Match`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssue {
    #[error("record has no id")]
    MissingId,
    #[error("record has no date")]
    MissingDate,
    #[error("timestamp out of range: {seconds}s + {nanoseconds}ns")]
    BadTimestamp { seconds: i64, nanoseconds: u32 },
    #[error("record has no status")]
    MissingStatus,
    #[error("unknown status `{0}`")]
    UnknownStatus(String),
}

/// A match document exactly as the hosted store serves it. Every field is
/// optional so that one malformed document never fails a whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub player1: Option<String>,
    #[serde(default)]
    pub player2: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub date: Option<StoreTimestamp>,
    #[serde(default)]
    pub tournament: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub court: Option<String>,
}

impl MatchRecord {
    pub fn from_match(m: &Match) -> Self {
        MatchRecord {
            id: Some(m.id.clone()),
            player1: Some(m.player1.clone()),
            player2: Some(m.player2.clone()),
            score: m.score.clone(),
            date: Some(StoreTimestamp::from_datetime(m.date)),
            tournament: m.tournament.clone(),
            status: Some(m.status.as_str().to_string()),
            court: m.court.clone(),
        }
    }

    /// Decode into a [`Match`]. Missing names become empty strings and blank
    /// optional text becomes `None`; id, date and status are required.
    pub fn decode(self) -> Result<Match, DecodeIssue> {
        let id = self.id.filter(|s| !s.trim().is_empty()).ok_or(DecodeIssue::MissingId)?;
        let ts = self.date.ok_or(DecodeIssue::MissingDate)?;
        let date = ts.to_datetime().ok_or(DecodeIssue::BadTimestamp {
            seconds: ts.seconds,
            nanoseconds: ts.nanoseconds,
        })?;
        let status: MatchStatus = self.status.ok_or(DecodeIssue::MissingStatus)?.parse()?;

        Ok(Match {
            id,
            player1: self.player1.unwrap_or_default(),
            player2: self.player2.unwrap_or_default(),
            score: non_blank(self.score),
            date,
            tournament: non_blank(self.tournament),
            status,
            court: non_blank(self.court),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Decode a full snapshot, skipping (and logging) records that fail.
pub fn decode_snapshot(records: Vec<MatchRecord>) -> Vec<Match> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone().unwrap_or_else(|| "<no id>".to_string());
            match record.decode() {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!("Skipping match record {id}: {e}");
                    None
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// LiveMatch
// ---------------------------------------------------------------------------

/// Which of the two players is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Server {
    PlayerOne,
    PlayerTwo,
}

/// Decorative in-game fields produced by a score-state provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveState {
    pub set_label: String,
    pub game_score: String,
    pub server: Server,
}

/// A match plus its locally synthesized live fields. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveMatch {
    pub base: Match,
    pub live: LiveState,
}

impl LiveMatch {
    pub fn serving_player(&self) -> &str {
        match self.live.server {
            Server::PlayerOne => &self.base.player1,
            Server::PlayerTwo => &self.base.player2,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record() -> MatchRecord {
        MatchRecord {
            id: Some("m1".into()),
            player1: Some("Ana Ruiz".into()),
            player2: Some("Beth Cole".into()),
            score: Some("6-4, 3-2".into()),
            date: Some(StoreTimestamp {
                seconds: 1_760_000_000,
                nanoseconds: 500,
            }),
            tournament: Some("Club Championship".into()),
            status: Some("live".into()),
            court: Some("Centre Court".into()),
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("LIVE".parse::<MatchStatus>().unwrap(), MatchStatus::Live);
        assert_eq!(" Upcoming ".parse::<MatchStatus>().unwrap(), MatchStatus::Upcoming);
        assert_eq!(
            "completed".parse::<MatchStatus>().unwrap(),
            MatchStatus::Completed
        );
        assert_eq!(
            "postponed".parse::<MatchStatus>(),
            Err(DecodeIssue::UnknownStatus("postponed".into()))
        );
    }

    #[test]
    fn timestamp_decodes_to_utc() {
        let ts = StoreTimestamp {
            seconds: 0,
            nanoseconds: 0,
        };
        assert_eq!(ts.to_datetime(), Utc.timestamp_opt(0, 0).single());

        let dt = Utc.with_ymd_and_hms(2026, 10, 18, 14, 30, 0).unwrap();
        assert_eq!(StoreTimestamp::from_datetime(dt).to_datetime(), Some(dt));
    }

    #[test]
    fn timestamp_rejects_bad_fraction() {
        let ts = StoreTimestamp {
            seconds: 10,
            nanoseconds: 1_000_000_000,
        };
        assert!(ts.to_datetime().is_none());
    }

    #[test]
    fn decode_full_record() {
        let m = record().decode().unwrap();
        assert_eq!(m.id, "m1");
        assert_eq!(m.status, MatchStatus::Live);
        assert_eq!(m.score.as_deref(), Some("6-4, 3-2"));
        assert_eq!(m.court.as_deref(), Some("Centre Court"));
        assert_eq!(m.date.timestamp(), 1_760_000_000);
    }

    #[test]
    fn decode_tolerates_missing_optional_fields() {
        let mut r = record();
        r.player2 = None;
        r.score = Some("   ".into());
        r.tournament = None;
        r.court = None;
        let m = r.decode().unwrap();
        assert_eq!(m.player2, "");
        assert!(m.score.is_none());
        assert!(m.tournament.is_none());
        assert!(m.court.is_none());
    }

    #[test]
    fn decode_requires_date_and_status() {
        let mut r = record();
        r.date = None;
        assert_eq!(r.decode(), Err(DecodeIssue::MissingDate));

        let mut r = record();
        r.status = None;
        assert_eq!(r.decode(), Err(DecodeIssue::MissingStatus));

        let mut r = record();
        r.id = Some(String::new());
        assert_eq!(r.decode(), Err(DecodeIssue::MissingId));
    }

    #[test]
    fn decode_snapshot_skips_bad_records() {
        let mut bad = record();
        bad.id = Some("m2".into());
        bad.status = Some("abandoned".into());
        let matches = decode_snapshot(vec![record(), bad]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "m1");
    }

    #[test]
    fn record_deserializes_from_store_json() {
        let json = r#"{
            "id": "abc",
            "player1": "Ana Ruiz",
            "player2": "Beth Cole",
            "date": {"seconds": 1760000000, "nanoseconds": 0},
            "status": "upcoming",
            "tournament": "Autumn Open"
        }"#;
        let record: MatchRecord = serde_json::from_str(json).unwrap();
        let m = record.decode().unwrap();
        assert_eq!(m.status, MatchStatus::Upcoming);
        assert!(m.score.is_none());
        assert_eq!(m.tournament.as_deref(), Some("Autumn Open"));
    }

    #[test]
    fn is_current_follows_status_and_date() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let mut m = record().decode().unwrap();

        m.status = MatchStatus::Live;
        m.date = now - Duration::days(3);
        assert!(m.is_current(now));

        m.status = MatchStatus::Upcoming;
        assert!(!m.is_current(now));
        m.date = now + Duration::hours(1);
        assert!(m.is_current(now));
        m.date = now;
        assert!(!m.is_current(now));

        m.status = MatchStatus::Completed;
        m.date = now + Duration::hours(1);
        assert!(!m.is_current(now));
    }

    #[test]
    fn serving_player_follows_server() {
        let base = record().decode().unwrap();
        let live = LiveMatch {
            base,
            live: LiveState {
                set_label: "Set 1".into(),
                game_score: "15-0".into(),
                server: Server::PlayerTwo,
            },
        };
        assert_eq!(live.serving_player(), "Beth Cole");
    }
}
