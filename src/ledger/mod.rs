//! Score Ledger
//!
//! Two independently-resettable persistence layers. The session layer
//! is the current game's append-only round history; the durable layer
//! is cumulative counters, per-competitor rank histories, per-bet-kind
//! aggregates, and the leaderboard, all mirrored to a `StatStore` as
//! one versioned document per mutation.
//!
//! In-memory state is the source of truth. A failed store write is
//! logged and gameplay continues; the next successful write carries
//! full state and self-heals the store.

pub mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::game::bet::BetKind;
use crate::game::competitor::CompetitorId;
use crate::game::race::RaceOutcome;
use crate::game::track::TrackId;
use store::StatStore;

/// Key the durable document lives under in the store.
const STORE_KEY: &str = "derby:stats";

/// Version stamped into the durable document. A mismatch on load means
/// the document came from an incompatible build: it is discarded and
/// stats restart from defaults (detection without migration).
const SCHEMA_VERSION: u32 = 1;

/// Maximum leaderboard rows kept.
const LEADERBOARD_CAP: usize = 20;

// =============================================================================
// RECORD TYPES
// =============================================================================

/// One row of session history. Created exactly once per completed
/// round, never mutated, session lifetime only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// 1-based round number
    pub round: u32,
    /// Bet kind the round was played with
    pub bet_kind: BetKind,
    /// Score earned (0 on a lost bet)
    pub score: u32,
    /// Track the round ran on
    pub track: TrackId,
    /// Full final outcome snapshot
    pub outcome: RaceOutcome,
}

/// Durable monotone counters. Survive process restarts; only an
/// explicit wipe (not modeled here) resets them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeStats {
    /// Sum of every settled score, ever
    pub total_score: u64,
    /// Rounds completed, ever
    pub rounds_played: u32,
    /// Rounds whose bet paid out
    pub wins: u32,
}

/// Durable per-competitor history: for each track, the finishing ranks
/// obtained, in the order they happened. Grows monotonically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorRecord {
    /// Rank history per track
    pub ranks_by_track: BTreeMap<TrackId, Vec<u8>>,
}

impl CompetitorRecord {
    /// Append one finishing rank under a track.
    pub fn add_rank(&mut self, track: TrackId, rank: u8) {
        self.ranks_by_track.entry(track).or_default().push(rank);
    }

    /// Total races recorded across all tracks.
    pub fn races(&self) -> usize {
        self.ranks_by_track.values().map(Vec::len).sum()
    }

    /// Races won across all tracks.
    pub fn firsts(&self) -> usize {
        self.ranks_by_track
            .values()
            .flatten()
            .filter(|r| **r == 1)
            .count()
    }
}

/// Durable per-bet-kind aggregate. Created lazily on first use.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetTypeStats {
    /// Rounds played with this kind
    pub attempts: u32,
    /// Rounds that paid out
    pub hits: u32,
    /// Total score earned with this kind
    pub total_score: u64,
}

/// One leaderboard row, persisted when a session finishes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique session id
    pub id: Uuid,
    /// When the session reached its terminal phase
    pub completed_at: DateTime<Utc>,
    /// Rounds the session played
    pub rounds_played: u32,
    /// Final session score
    pub score: u32,
}

/// The whole durable layer as one serializable document.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct DurableState {
    version: u32,
    cumulative: CumulativeStats,
    competitors: BTreeMap<CompetitorId, CompetitorRecord>,
    bet_types: BTreeMap<BetKind, BetTypeStats>,
    leaderboard: Vec<SessionSummary>,
}

impl Default for DurableState {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            cumulative: CumulativeStats::default(),
            competitors: BTreeMap::new(),
            bet_types: BTreeMap::new(),
            leaderboard: Vec::new(),
        }
    }
}

// =============================================================================
// SCORE LEDGER
// =============================================================================

/// Sole owner of session history and the durable stores, and the only
/// writer to persisted storage.
pub struct ScoreLedger {
    store: Box<dyn StatStore>,
    session: Vec<RoundRecord>,
    durable: DurableState,
}

impl ScoreLedger {
    /// Create a ledger over a store, loading any existing durable
    /// document. An unreadable or version-mismatched document is
    /// discarded with a warning and stats restart from defaults.
    pub fn new(store: Box<dyn StatStore>) -> Self {
        let durable = match store.get(STORE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<DurableState>(&raw) {
                Ok(loaded) if loaded.version == SCHEMA_VERSION => loaded,
                Ok(loaded) => {
                    warn!(
                        found = loaded.version,
                        expected = SCHEMA_VERSION,
                        "stat document schema mismatch, starting from defaults"
                    );
                    DurableState::default()
                }
                Err(e) => {
                    warn!("stat document unparseable ({}), starting from defaults", e);
                    DurableState::default()
                }
            },
            Ok(None) => DurableState::default(),
            Err(e) => {
                warn!("stat store unreadable ({}), starting from defaults", e);
                DurableState::default()
            }
        };

        Self {
            store,
            session: Vec::new(),
            durable,
        }
    }

    // -------------------------------------------------------------------------
    // Session layer
    // -------------------------------------------------------------------------

    /// Clear the session layer and nothing else. Called on new game.
    pub fn reset_session(&mut self) {
        self.session.clear();
    }

    /// The session's round history, oldest first.
    pub fn session_records(&self) -> &[RoundRecord] {
        &self.session
    }

    /// Derived: sum of every session record's score.
    pub fn session_score(&self) -> u32 {
        self.session.iter().map(|r| r.score).sum()
    }

    /// Derived: score of the most recent round, 0 before any round.
    pub fn last_round_score(&self) -> u32 {
        self.session.last().map(|r| r.score).unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Durable layer
    // -------------------------------------------------------------------------

    /// Record one completed round into both layers.
    ///
    /// Appends the session record, bumps cumulative counters, appends
    /// every ranked competitor's finishing rank under the track, bumps
    /// the bet kind's aggregate, then mirrors the durable layer to the
    /// store in a single write. With one snapshot write there is no
    /// partial durable commit to observe.
    pub fn record_round(
        &mut self,
        round: u32,
        bet_kind: BetKind,
        score: u32,
        track: TrackId,
        outcome: &RaceOutcome,
    ) {
        self.session.push(RoundRecord {
            round,
            bet_kind,
            score,
            track,
            outcome: outcome.clone(),
        });

        let cumulative = &mut self.durable.cumulative;
        cumulative.total_score += u64::from(score);
        cumulative.rounds_played += 1;
        if score > 0 {
            cumulative.wins += 1;
        }

        for (rank, id) in outcome.placings() {
            self.durable
                .competitors
                .entry(*id)
                .or_default()
                .add_rank(track, *rank);
        }

        let kind_stats = self.durable.bet_types.entry(bet_kind).or_default();
        kind_stats.attempts += 1;
        if score > 0 {
            kind_stats.hits += 1;
        }
        kind_stats.total_score += u64::from(score);

        debug!(round, score, %track, "round recorded");
        self.persist();
    }

    /// Persist a finished session to the leaderboard.
    ///
    /// Rows sort by score descending, recency breaking ties, and the
    /// board is capped.
    pub fn record_session_summary(&mut self, rounds_played: u32, score: u32) -> SessionSummary {
        let summary = SessionSummary {
            id: Uuid::new_v4(),
            completed_at: Utc::now(),
            rounds_played,
            score,
        };

        self.durable.leaderboard.push(summary.clone());
        self.durable
            .leaderboard
            .sort_by(|a, b| b.score.cmp(&a.score).then(b.completed_at.cmp(&a.completed_at)));
        self.durable.leaderboard.truncate(LEADERBOARD_CAP);

        self.persist();
        summary
    }

    /// Cumulative cross-session counters.
    pub fn cumulative(&self) -> &CumulativeStats {
        &self.durable.cumulative
    }

    /// A competitor's durable rank history, if they have ever raced.
    pub fn competitor_record(&self, id: CompetitorId) -> Option<&CompetitorRecord> {
        self.durable.competitors.get(&id)
    }

    /// A bet kind's durable aggregate, if it has ever been used.
    pub fn bet_type_stats(&self, kind: BetKind) -> Option<&BetTypeStats> {
        self.durable.bet_types.get(&kind)
    }

    /// The durable leaderboard, best first.
    pub fn leaderboard(&self) -> &[SessionSummary] {
        &self.durable.leaderboard
    }

    /// Mirror the durable layer to the store.
    ///
    /// Failure is logged, never propagated: a dropped write must not
    /// block gameplay, and the next successful write carries full
    /// state.
    fn persist(&mut self) {
        let encoded = match serde_json::to_string(&self.durable) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("could not encode stat document: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(STORE_KEY, &encoded) {
            warn!("stat store write failed, keeping in-memory state: {}", e);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use store::{MemoryStore, StoreError};
    use std::cell::RefCell;
    use std::rc::Rc;

    const TRACK: TrackId = TrackId(1);
    const OTHER_TRACK: TrackId = TrackId(2);

    fn outcome(ids: &[u8]) -> RaceOutcome {
        RaceOutcome::new(
            ids.iter()
                .enumerate()
                .map(|(i, id)| (i as u8 + 1, CompetitorId(*id)))
                .collect(),
        )
    }

    fn fresh_ledger() -> ScoreLedger {
        ScoreLedger::new(Box::new(MemoryStore::new()))
    }

    /// Store double backed by shared memory, so a "process restart"
    /// can be simulated by building a second ledger over the same map.
    #[derive(Clone, Default)]
    struct SharedStore {
        entries: Rc<RefCell<BTreeMap<String, String>>>,
    }

    impl StatStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.entries.borrow().get(key).cloned())
        }
        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.entries
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    /// Store double whose writes always fail.
    struct FailingStore;

    impl StatStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_record_round_updates_both_layers() {
        let mut ledger = fresh_ledger();
        ledger.record_round(1, BetKind::Exacta, 50, TRACK, &outcome(&[3, 1, 2]));

        assert_eq!(ledger.session_records().len(), 1);
        assert_eq!(ledger.session_score(), 50);
        assert_eq!(ledger.last_round_score(), 50);

        let cumulative = ledger.cumulative();
        assert_eq!(cumulative.total_score, 50);
        assert_eq!(cumulative.rounds_played, 1);
        assert_eq!(cumulative.wins, 1);

        let kind = ledger.bet_type_stats(BetKind::Exacta).unwrap();
        assert_eq!((kind.attempts, kind.hits, kind.total_score), (1, 1, 50));
    }

    #[test]
    fn test_lost_round_is_not_a_win() {
        let mut ledger = fresh_ledger();
        ledger.record_round(1, BetKind::Win, 0, TRACK, &outcome(&[3, 1, 2]));

        assert_eq!(ledger.cumulative().wins, 0);
        let kind = ledger.bet_type_stats(BetKind::Win).unwrap();
        assert_eq!((kind.attempts, kind.hits), (1, 0));
    }

    #[test]
    fn test_session_score_is_sum_of_records() {
        let mut ledger = fresh_ledger();
        ledger.record_round(1, BetKind::Win, 10, TRACK, &outcome(&[1, 2, 3]));
        ledger.record_round(2, BetKind::Win, 0, TRACK, &outcome(&[2, 1, 3]));
        ledger.record_round(3, BetKind::Exacta, 50, TRACK, &outcome(&[1, 2, 3]));

        let by_hand: u32 = ledger.session_records().iter().map(|r| r.score).sum();
        assert_eq!(ledger.session_score(), by_hand);
        assert_eq!(ledger.session_score(), 60);
        assert_eq!(ledger.last_round_score(), 50);
    }

    #[test]
    fn test_reset_session_spares_durable_layer() {
        let mut ledger = fresh_ledger();
        ledger.record_round(1, BetKind::Win, 10, TRACK, &outcome(&[1, 2]));

        ledger.reset_session();

        assert_eq!(ledger.session_score(), 0);
        assert!(ledger.session_records().is_empty());
        // Durable counters untouched
        assert_eq!(ledger.cumulative().total_score, 10);
        assert_eq!(ledger.cumulative().rounds_played, 1);
    }

    #[test]
    fn test_competitor_record_grows_not_overwrites() {
        let mut ledger = fresh_ledger();

        // Unseen competitor: record created with one rank entry
        ledger.record_round(1, BetKind::Win, 10, TRACK, &outcome(&[7, 3]));
        let record = ledger.competitor_record(CompetitorId(7)).unwrap();
        assert_eq!(record.ranks_by_track.get(&TRACK).unwrap(), &vec![1]);

        // Same competitor, same track: distribution grows
        ledger.record_round(2, BetKind::Win, 0, TRACK, &outcome(&[3, 7]));
        let record = ledger.competitor_record(CompetitorId(7)).unwrap();
        assert_eq!(record.ranks_by_track.get(&TRACK).unwrap(), &vec![1, 2]);

        // Different track: separate distribution
        ledger.record_round(3, BetKind::Win, 10, OTHER_TRACK, &outcome(&[7, 3]));
        let record = ledger.competitor_record(CompetitorId(7)).unwrap();
        assert_eq!(record.ranks_by_track.len(), 2);
        assert_eq!(record.races(), 3);
        assert_eq!(record.firsts(), 2);
    }

    #[test]
    fn test_store_failure_still_updates_memory() {
        let mut ledger = ScoreLedger::new(Box::new(FailingStore));
        ledger.record_round(1, BetKind::Win, 10, TRACK, &outcome(&[1, 2]));

        // The write failed but gameplay state advanced
        assert_eq!(ledger.session_score(), 10);
        assert_eq!(ledger.cumulative().total_score, 10);
    }

    #[test]
    fn test_durable_survives_reload() {
        let shared = SharedStore::default();

        {
            let mut ledger = ScoreLedger::new(Box::new(shared.clone()));
            ledger.record_round(1, BetKind::Quinella, 30, TRACK, &outcome(&[4, 2, 9]));
            ledger.record_session_summary(1, 30);
        }

        // "Restart": new ledger over the same store
        let reloaded = ScoreLedger::new(Box::new(shared));
        assert_eq!(reloaded.cumulative().total_score, 30);
        assert_eq!(reloaded.cumulative().rounds_played, 1);
        assert!(reloaded.competitor_record(CompetitorId(4)).is_some());
        assert_eq!(reloaded.bet_type_stats(BetKind::Quinella).unwrap().hits, 1);
        assert_eq!(reloaded.leaderboard().len(), 1);
        // Session layer never persists
        assert!(reloaded.session_records().is_empty());
    }

    #[test]
    fn test_schema_mismatch_starts_from_defaults() {
        let shared = SharedStore::default();
        let mut bad = DurableState::default();
        bad.version = SCHEMA_VERSION + 1;
        bad.cumulative.total_score = 999;
        shared
            .entries
            .borrow_mut()
            .insert(STORE_KEY.to_string(), serde_json::to_string(&bad).unwrap());

        let ledger = ScoreLedger::new(Box::new(shared));
        assert_eq!(ledger.cumulative().total_score, 0);
    }

    #[test]
    fn test_unparseable_document_starts_from_defaults() {
        let shared = SharedStore::default();
        shared
            .entries
            .borrow_mut()
            .insert(STORE_KEY.to_string(), "garbage".to_string());

        let ledger = ScoreLedger::new(Box::new(shared));
        assert_eq!(ledger.cumulative().rounds_played, 0);
    }

    #[test]
    fn test_leaderboard_sorted_and_capped() {
        let mut ledger = fresh_ledger();
        for score in [10, 50, 30] {
            ledger.record_session_summary(3, score);
        }

        let scores: Vec<u32> = ledger.leaderboard().iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![50, 30, 10]);

        for _ in 0..30 {
            ledger.record_session_summary(3, 1);
        }
        assert_eq!(ledger.leaderboard().len(), LEADERBOARD_CAP);
    }
}
