// Decorative "live feel" fields. The store has no point-by-point state, so
// set, game score and server are produced by a pluggable provider.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::model::{LiveMatch, LiveState, Match, Server};

/// Every set label a best-of-five match could show.
pub const SET_LABELS: [&str; 5] = ["Set 1", "Set 2", "Set 3", "Set 4", "Set 5"];

/// How many of [`SET_LABELS`] the random provider actually draws from.
pub const DRAWN_SET_LABELS: usize = 3;

pub const GAME_SCORES: [&str; 9] = [
    "0-0",
    "15-0",
    "30-0",
    "40-0",
    "15-15",
    "30-30",
    "40-40",
    "Deuce",
    "Advantage",
];

/// Source of the in-game fields shown next to a match.
///
/// Implementations may be decorative (random) or backed by a real scoring
/// feed; renderers only ever see the resulting [`LiveState`].
pub trait ScoreStateProvider: Send + Sync {
    fn live_state(&mut self, m: &Match) -> LiveState;

    fn augment(&mut self, m: Match) -> LiveMatch {
        let live = self.live_state(&m);
        LiveMatch { base: m, live }
    }
}

/// Draws every field independently on each call. Consecutive calls for the
/// same match are unrelated; nothing carries over between refreshes.
pub struct RandomScoreSynthesizer<R = StdRng> {
    rng: R,
}

impl RandomScoreSynthesizer<StdRng> {
    pub fn from_entropy() -> Self {
        RandomScoreSynthesizer {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> RandomScoreSynthesizer<R> {
    pub fn with_rng(rng: R) -> Self {
        RandomScoreSynthesizer { rng }
    }
}

impl<R: Rng + Send + Sync> ScoreStateProvider for RandomScoreSynthesizer<R> {
    fn live_state(&mut self, _m: &Match) -> LiveState {
        let set_label = SET_LABELS[..DRAWN_SET_LABELS]
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(SET_LABELS[0]);
        let game_score = GAME_SCORES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(GAME_SCORES[0]);
        let server = if self.rng.gen_bool(0.5) {
            Server::PlayerOne
        } else {
            Server::PlayerTwo
        };

        LiveState {
            set_label: set_label.to_string(),
            game_score: game_score.to_string(),
            server,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchStatus;
    use chrono::{TimeZone, Utc};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn sample() -> Match {
        Match {
            id: "m1".into(),
            player1: "Ana Ruiz".into(),
            player2: "Beth Cole".into(),
            score: Some("6-4, 3-2".into()),
            date: Utc.with_ymd_and_hms(2026, 10, 14, 15, 0, 0).unwrap(),
            tournament: None,
            status: MatchStatus::Live,
            court: None,
        }
    }

    #[test]
    fn fields_come_from_fixed_vocabularies() {
        let mut synth = RandomScoreSynthesizer::with_rng(ChaCha8Rng::seed_from_u64(7));
        let m = sample();
        for _ in 0..500 {
            let state = synth.live_state(&m);
            assert!(SET_LABELS[..DRAWN_SET_LABELS].contains(&state.set_label.as_str()));
            assert!(GAME_SCORES.contains(&state.game_score.as_str()));
        }
    }

    #[test]
    fn only_first_three_set_labels_are_drawn() {
        let mut synth = RandomScoreSynthesizer::with_rng(ChaCha8Rng::seed_from_u64(11));
        let m = sample();
        let seen: HashSet<String> = (0..500).map(|_| synth.live_state(&m).set_label).collect();
        assert_eq!(seen.len(), DRAWN_SET_LABELS);
        assert!(!seen.contains("Set 4"));
        assert!(!seen.contains("Set 5"));
    }

    #[test]
    fn both_players_serve_over_many_draws() {
        let mut synth = RandomScoreSynthesizer::with_rng(ChaCha8Rng::seed_from_u64(3));
        let m = sample();
        let servers: HashSet<Server> = (0..200).map(|_| synth.live_state(&m).server).collect();
        assert!(servers.contains(&Server::PlayerOne));
        assert!(servers.contains(&Server::PlayerTwo));
    }

    #[test]
    fn augment_keeps_persisted_fields_untouched() {
        let mut synth = RandomScoreSynthesizer::with_rng(ChaCha8Rng::seed_from_u64(1));
        let m = sample();
        let live = synth.augment(m.clone());
        assert_eq!(live.base, m);
    }

    #[test]
    fn same_seed_reproduces_sequence() {
        let m = sample();
        let mut a = RandomScoreSynthesizer::with_rng(ChaCha8Rng::seed_from_u64(42));
        let mut b = RandomScoreSynthesizer::with_rng(ChaCha8Rng::seed_from_u64(42));
        for _ in 0..20 {
            assert_eq!(a.live_state(&m), b.live_state(&m));
        }
    }
}
