//! Game Session
//!
//! The root phase state machine. Owns the current phase and the active
//! bet slip, mediates between the selection provider, track provider,
//! race engine, and score ledger, and is the sole entry point for
//! presentation code.
//!
//! The machine is single-threaded cooperative: it moves only in
//! response to discrete caller-driven calls, with `advance()` invoked
//! once per fixed tick by an external scheduler during `Countdown` and
//! `Racing`. Invalid requests are silently ignored rather than
//! errored, so presentation code need not pre-validate every call.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::TICK_RATE;
use crate::core::fixed::{Fixed, DEFAULT_LUCK_AMPLITUDE};
use crate::core::rng::derive_round_seed;
use crate::game::bet::{BetKind, BetSlip};
use crate::game::competitor::{Competitor, CompetitorId, SelectionProvider};
use crate::game::events::{EventBus, GameEvent, Subscription};
use crate::game::race::{RaceEngine, RaceOutcome};
use crate::game::settle::settle;
use crate::game::track::{TrackDescriptor, TrackProvider};
use crate::ledger::{
    BetTypeStats, CompetitorRecord, CumulativeStats, RoundRecord, ScoreLedger, SessionSummary,
};

// =============================================================================
// PHASE
// =============================================================================

/// The round controller's enumerated state. Exactly one phase is
/// active at a time.
///
/// A freshly constructed session sits in `Finish` until the first
/// `new_game()`; `Finish` is also the terminal phase after the last
/// round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Filling the bet slip
    Betting,
    /// Armed, counting down to the start
    Countdown,
    /// Racers moving; engine ticking
    Racing,
    /// Round settled, awaiting "next round"
    Result,
    /// Session over (or not yet started)
    Finish,
}

// =============================================================================
// SESSION CONFIG
// =============================================================================

/// Tunables for one session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Rounds per session
    pub total_rounds: u32,
    /// Countdown length in whole seconds
    pub countdown_seconds: u32,
    /// Racers drawn per session
    pub field_size: usize,
    /// Race jitter amplitude (Fixed)
    pub luck_amplitude: Fixed,
    /// Session seed: drives the competitor draw and every round's jitter
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_rounds: 3,
            countdown_seconds: 3,
            field_size: 6,
            luck_amplitude: DEFAULT_LUCK_AMPLITUDE,
            seed: 0,
        }
    }
}

// =============================================================================
// GAME SESSION
// =============================================================================

/// The root component: phase machine plus injected collaborators.
pub struct GameSession {
    config: SessionConfig,
    phase: Phase,
    round: u32,
    bet: BetSlip,
    engine: RaceEngine,
    ledger: ScoreLedger,
    selection: Box<dyn SelectionProvider>,
    tracks: Box<dyn TrackProvider>,
    bus: EventBus,
    pending: Vec<GameEvent>,
    track: Option<TrackDescriptor>,
    competitors: Vec<Competitor>,
    countdown_ticks: u32,
}

impl GameSession {
    /// Assemble a session from its collaborators.
    ///
    /// Providers and the ledger are constructed once at startup and
    /// injected; the session never reaches for ambient globals.
    pub fn new(
        config: SessionConfig,
        selection: Box<dyn SelectionProvider>,
        tracks: Box<dyn TrackProvider>,
        ledger: ScoreLedger,
    ) -> Self {
        Self {
            engine: RaceEngine::new(config.luck_amplitude),
            config,
            phase: Phase::Finish,
            round: 0,
            bet: BetSlip::default(),
            ledger,
            selection,
            tracks,
            bus: EventBus::new(),
            pending: Vec::new(),
            track: None,
            competitors: Vec::new(),
            countdown_ticks: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Start a fresh session: reset session history, draw a new field,
    /// reset the slip to the default kind, clear the track history,
    /// and apply the round-1 track.
    ///
    /// If a collaborator comes up empty the session logs a warning and
    /// stays exactly as it was.
    pub fn new_game(&mut self) {
        let field = self.selection.select_random(self.config.field_size);
        if field.is_empty() {
            warn!("new game aborted: selection provider returned an empty field");
            return;
        }

        self.tracks.clear_history();
        let Some(track) = self.tracks.track_for_round(1) else {
            warn!("new game aborted: no track available");
            return;
        };

        let seed = derive_round_seed(self.config.seed, 1);
        if let Err(e) = self.engine.begin(track.clone(), field.clone(), seed) {
            warn!("new game aborted: {}", e);
            return;
        }

        self.ledger.reset_session();
        self.round = 1;
        self.competitors = field;
        self.bet = BetSlip::default();
        self.countdown_ticks = 0;
        self.set_phase(Phase::Betting);
        self.pending.push(GameEvent::RoundChanged { round: 1 });
        self.push_track_changed(&track);
        self.track = Some(track);
        self.flush();
    }

    /// Replace the slip with a new kind, discarding current picks.
    /// Accepted only during `Betting`.
    pub fn change_bet_kind(&mut self, kind: BetKind) {
        if self.phase != Phase::Betting {
            debug!(?kind, "bet change ignored outside betting phase");
            return;
        }
        self.bet = BetSlip::new(kind);
        self.pending.push(GameEvent::BetChanged { kind });
        self.flush();
    }

    /// Add a pick to the slip. Accepted only during `Betting` and only
    /// while the slip is incomplete; duplicates are no-ops.
    pub fn pick(&mut self, id: CompetitorId) {
        if self.phase != Phase::Betting {
            debug!(%id, "pick ignored outside betting phase");
            return;
        }
        if !self.competitors.iter().any(|c| c.id == id) {
            debug!(%id, "pick ignored: not in the current field");
            return;
        }
        self.bet.pick(id);
    }

    /// Remove a pick from the slip. Accepted only during `Betting`.
    pub fn unpick(&mut self, id: CompetitorId) {
        if self.phase != Phase::Betting {
            debug!(%id, "unpick ignored outside betting phase");
            return;
        }
        self.bet.unpick(id);
    }

    /// Arm the countdown. Accepted only during `Betting` with a
    /// complete slip; otherwise silently ignored, since callers are
    /// expected to check `bet().is_complete()` first.
    pub fn start_race(&mut self) {
        if self.phase != Phase::Betting {
            debug!("start ignored outside betting phase");
            return;
        }
        if !self.bet.is_complete() {
            debug!("start ignored: bet incomplete");
            return;
        }

        self.countdown_ticks = self.config.countdown_seconds * TICK_RATE;
        self.set_phase(Phase::Countdown);
        // The full value fires on arming; each elapsed second fires
        // the decremented value down to 1.
        self.pending.push(GameEvent::CountdownTick {
            seconds_left: self.config.countdown_seconds,
        });
        self.flush();
    }

    /// Advance the session by one fixed tick.
    ///
    /// Only `Countdown` and `Racing` consume ticks; in every other
    /// phase this is a no-op.
    pub fn advance(&mut self) {
        match self.phase {
            Phase::Countdown => self.advance_countdown(),
            Phase::Racing => self.advance_race(),
            _ => {}
        }
    }

    /// Move on from `Result`: either into the next round's `Betting`
    /// or, after the final round, into `Finish` with the session
    /// summary persisted to the leaderboard.
    pub fn next_round(&mut self) {
        if self.phase != Phase::Result {
            debug!("next round ignored outside result phase");
            return;
        }

        if self.round >= self.config.total_rounds {
            let final_score = self.ledger.session_score();
            self.ledger.record_session_summary(self.round, final_score);
            self.set_phase(Phase::Finish);
            self.pending.push(GameEvent::SessionFinished { final_score });
            self.flush();
            return;
        }

        let next = self.round + 1;
        let Some(track) = self.tracks.track_for_round(next) else {
            warn!(round = next, "next round aborted: no track available");
            return;
        };

        let seed = derive_round_seed(self.config.seed, next);
        if let Err(e) = self
            .engine
            .begin(track.clone(), self.competitors.clone(), seed)
        {
            warn!(round = next, "next round aborted: {}", e);
            return;
        }

        self.round = next;
        self.bet.clear();
        self.countdown_ticks = 0;
        self.set_phase(Phase::Betting);
        self.pending.push(GameEvent::RoundChanged { round: next });
        self.push_track_changed(&track);
        self.track = Some(track);
        self.flush();
    }

    /// Withdraw a racer mid-race. Accepted only during `Racing`.
    pub fn retire(&mut self, id: CompetitorId) {
        if self.phase != Phase::Racing {
            debug!(%id, "retire ignored outside racing phase");
            return;
        }
        self.engine.retire(id);
    }

    // -------------------------------------------------------------------------
    // Tick handlers
    // -------------------------------------------------------------------------

    fn advance_countdown(&mut self) {
        self.countdown_ticks = self.countdown_ticks.saturating_sub(1);

        if self.countdown_ticks == 0 {
            self.set_phase(Phase::Racing);
            self.pending.push(GameEvent::RaceStarted);
            self.flush();
            return;
        }

        if self.countdown_ticks % TICK_RATE == 0 {
            self.pending.push(GameEvent::CountdownTick {
                seconds_left: self.countdown_ticks / TICK_RATE,
            });
            self.flush();
        }
    }

    fn advance_race(&mut self) {
        let result = self.engine.tick();

        for (id, rank) in &result.finished {
            self.pending
                .push(GameEvent::CompetitorFinished { id: *id, rank: *rank });
        }

        if result.race_complete {
            self.pending.push(GameEvent::RaceComplete);
            self.settle_round();
            self.set_phase(Phase::Result);
        }

        self.flush();
    }

    /// Settle the finished race and record the round in the ledger.
    fn settle_round(&mut self) {
        let Some(outcome) = self.engine.final_outcome().cloned() else {
            // The engine just reported completion; a missing outcome is
            // a defect in it, not a runtime condition.
            unreachable!("race reported complete without a final outcome");
        };
        let Some(track) = &self.track else {
            unreachable!("racing phase without an active track");
        };

        let score = settle(&self.bet, &outcome);
        self.ledger
            .record_round(self.round, self.bet.kind(), score, track.id, &outcome);
        self.pending.push(GameEvent::ScoreChanged {
            delta: score,
            total: self.ledger.session_score(),
        });
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Observe session events. The handle deterministically stops
    /// delivery when passed to `unsubscribe`.
    pub fn subscribe(&mut self, callback: impl FnMut(&GameEvent) + 'static) -> Subscription {
        self.bus.subscribe(callback)
    }

    /// Dispose of a subscription.
    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        self.bus.unsubscribe(handle)
    }

    fn set_phase(&mut self, to: Phase) {
        if self.phase != to {
            self.pending.push(GameEvent::PhaseChanged {
                from: self.phase,
                to,
            });
            self.phase = to;
        }
    }

    fn push_track_changed(&mut self, track: &TrackDescriptor) {
        self.pending.push(GameEvent::TrackChanged {
            id: track.id,
            name: track.name.clone(),
            laps: track.laps,
        });
    }

    /// Deliver accumulated events after a mutation has fully applied.
    fn flush(&mut self) {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            self.bus.publish(event);
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The active phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current 1-based round number (0 before the first game).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The active bet slip.
    pub fn bet(&self) -> &BetSlip {
        &self.bet
    }

    /// The drawn field, in roster order.
    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    /// The active track, if a round is in progress.
    pub fn track(&self) -> Option<&TrackDescriptor> {
        self.track.as_ref()
    }

    /// Live total ordering of the field (engine pass-through).
    pub fn live_ranking(&self) -> Vec<CompetitorId> {
        self.engine.live_ranking()
    }

    /// The frozen final outcome of the last completed race.
    pub fn final_outcome(&self) -> Option<&RaceOutcome> {
        self.engine.final_outcome()
    }

    /// The race engine, for presentation-level queries like positions.
    pub fn engine(&self) -> &RaceEngine {
        &self.engine
    }

    /// This session's round history.
    pub fn session_records(&self) -> &[RoundRecord] {
        self.ledger.session_records()
    }

    /// Derived session total.
    pub fn session_score(&self) -> u32 {
        self.ledger.session_score()
    }

    /// Derived last-round score.
    pub fn last_round_score(&self) -> u32 {
        self.ledger.last_round_score()
    }

    /// Durable cross-session counters.
    pub fn cumulative(&self) -> &CumulativeStats {
        self.ledger.cumulative()
    }

    /// A competitor's durable rank history.
    pub fn competitor_record(&self, id: CompetitorId) -> Option<&CompetitorRecord> {
        self.ledger.competitor_record(id)
    }

    /// A bet kind's durable aggregate.
    pub fn bet_type_stats(&self, kind: BetKind) -> Option<&BetTypeStats> {
        self.ledger.bet_type_stats(kind)
    }

    /// The durable leaderboard.
    pub fn leaderboard(&self) -> &[SessionSummary] {
        self.ledger.leaderboard()
    }
}

// =============================================================================
// TESTS
// =============================================================================
