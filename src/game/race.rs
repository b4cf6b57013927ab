//! Race Engine
//!
//! Owns the active racers for one round, advances them along the
//! course, and produces a live ranking at any time plus an immutable
//! final outcome once every active racer is done.
//!
//! # Determinism
//!
//! Advancement is 100% deterministic: racers are iterated in stable
//! roster order, all math is fixed-point, and jitter comes from a
//! per-round seeded RNG. Given the same field, track, and seed, a race
//! always produces the same finish order.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{
    Fixed, FIXED_ONE, TICK_DT, FATIGUE_FLOOR, DEFAULT_LUCK_AMPLITUDE,
    fixed_mul, fixed_div, fixed_clamp, fixed_max, to_fixed,
};
use crate::core::vec2::FixedVec2;
use crate::core::rng::DeterministicRng;
use crate::game::competitor::{Competitor, CompetitorId};
use crate::game::track::TrackDescriptor;

// =============================================================================
// ERRORS
// =============================================================================

/// Why a race could not begin.
#[derive(Debug, Error)]
pub enum RaceError {
    /// No competitors supplied.
    #[error("cannot begin a race with an empty field")]
    EmptyField,

    /// The course is not a usable circuit.
    #[error("course has {0} waypoints, need at least 2")]
    DegenerateCourse(usize),
}

// =============================================================================
// RACE OUTCOME
// =============================================================================

/// The immutable final finish order: `(rank, competitor)` pairs
/// covering every racer present exactly once, ranks contiguous 1..N.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    placings: Vec<(u8, CompetitorId)>,
}

impl RaceOutcome {
    /// Build an outcome, asserting rank contiguity.
    ///
    /// A gap or duplicate in the rank sequence means a collaborator is
    /// defective; that is fatal, not recoverable.
    pub fn new(placings: Vec<(u8, CompetitorId)>) -> Self {
        for (i, (rank, _)) in placings.iter().enumerate() {
            assert_eq!(
                *rank as usize,
                i + 1,
                "ranks must be contiguous 1..N in order"
            );
        }
        Self { placings }
    }

    /// The `(rank, competitor)` pairs in rank order.
    pub fn placings(&self) -> &[(u8, CompetitorId)] {
        &self.placings
    }

    /// Number of ranked competitors.
    pub fn len(&self) -> usize {
        self.placings.len()
    }

    /// True if no competitors were ranked.
    pub fn is_empty(&self) -> bool {
        self.placings.is_empty()
    }

    /// Finishing rank of a competitor, if present.
    pub fn rank_of(&self, id: CompetitorId) -> Option<u8> {
        self.placings
            .iter()
            .find(|(_, c)| *c == id)
            .map(|(rank, _)| *rank)
    }

    /// The winner, if anyone was ranked.
    pub fn winner(&self) -> Option<CompetitorId> {
        self.placings.first().map(|(_, c)| *c)
    }
}

// =============================================================================
// RACER RUNTIME STATE
// =============================================================================

/// Per-racer runtime state for one round. Discarded on reset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RacerState {
    /// The competitor's identity and stats
    pub competitor: Competitor,
    /// Distance covered along the circuit (Fixed course units)
    pub distance: Fixed,
    /// Assigned finish rank, set at most once
    pub finish_rank: Option<u8>,
    /// Withdrawn mid-race
    pub retired: bool,
}

impl RacerState {
    fn new(competitor: Competitor) -> Self {
        Self {
            competitor,
            distance: 0,
            finish_rank: None,
            retired: false,
        }
    }

    /// Has this racer crossed the finish line?
    #[inline]
    pub fn finished(&self) -> bool {
        self.finish_rank.is_some()
    }
}

// =============================================================================
// TICK RESULT
// =============================================================================

/// What happened during one advancement tick.
#[derive(Debug, Default)]
pub struct RaceTickResult {
    /// Racers who crossed the line this tick, with their ranks
    pub finished: Vec<(CompetitorId, u8)>,
    /// True exactly once, on the tick the race completes
    pub race_complete: bool,
}

// =============================================================================
// RACE ENGINE
// =============================================================================

/// Floor for the combined jitter multiplier. Pace never reverses.
const JITTER_FLOOR: Fixed = to_fixed(0.1);

/// Drives one round's race from start to a ranked outcome.
pub struct RaceEngine {
    descriptor: Option<TrackDescriptor>,
    racers: Vec<RacerState>,
    rng: DeterministicRng,
    luck_amplitude: Fixed,
    finished_count: u8,
    complete: bool,
    outcome: Option<RaceOutcome>,
}

impl Default for RaceEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LUCK_AMPLITUDE)
    }
}

impl RaceEngine {
    /// Create an idle engine with a jitter amplitude.
    pub fn new(luck_amplitude: Fixed) -> Self {
        Self {
            descriptor: None,
            racers: Vec::new(),
            rng: DeterministicRng::default(),
            luck_amplitude,
            finished_count: 0,
            complete: false,
            outcome: None,
        }
    }

    /// Arm the engine for one round.
    ///
    /// Resets finish bookkeeping, replaces the field, and reseeds the
    /// jitter stream. Rejects an empty field or a degenerate course.
    pub fn begin(
        &mut self,
        descriptor: TrackDescriptor,
        competitors: Vec<Competitor>,
        round_seed: u64,
    ) -> Result<(), RaceError> {
        if competitors.is_empty() {
            return Err(RaceError::EmptyField);
        }
        if descriptor.course.waypoint_count() < 2 {
            return Err(RaceError::DegenerateCourse(descriptor.course.waypoint_count()));
        }

        self.racers = competitors.into_iter().map(RacerState::new).collect();
        self.descriptor = Some(descriptor);
        self.rng = DeterministicRng::new(round_seed);
        self.finished_count = 0;
        self.complete = false;
        self.outcome = None;

        Ok(())
    }

    /// Return every racer to the start line and clear finish state.
    ///
    /// Identities survive; only runtime state is discarded.
    pub fn reset(&mut self) {
        for racer in &mut self.racers {
            racer.distance = 0;
            racer.finish_rank = None;
            racer.retired = false;
        }
        self.finished_count = 0;
        self.complete = false;
        self.outcome = None;
    }

    /// Advance every unfinished racer by one fixed tick.
    ///
    /// Finish detection fires at most once per racer; the completion
    /// flag fires exactly once, on the tick the last active racer
    /// crosses the line, and freezes the final outcome.
    pub fn tick(&mut self) -> RaceTickResult {
        let mut result = RaceTickResult::default();

        if self.complete {
            return result;
        }
        let Some(descriptor) = self.descriptor.clone() else {
            return result;
        };

        let total = descriptor.total_distance();
        if total <= 0 {
            return result;
        }

        // Stable roster order: both movement and the RNG stream depend
        // on it.
        for racer in &mut self.racers {
            if racer.finished() || racer.retired {
                continue;
            }

            let step = advance_step(
                racer,
                &descriptor,
                total,
                self.luck_amplitude,
                &mut self.rng,
            );
            racer.distance = racer.distance.wrapping_add(step);

            if racer.distance >= total {
                racer.distance = total;
                self.finished_count += 1;
                let rank = self.finished_count;
                racer.finish_rank = Some(rank);
                result.finished.push((racer.competitor.id, rank));
            }
        }

        let active = self.racers.iter().filter(|r| !r.retired).count();
        if self.finished_count as usize >= active {
            self.complete = true;
            self.outcome = Some(self.synthesize_outcome());
            result.race_complete = true;
        }

        result
    }

    /// Advance the race by a number of ticks, merging the results.
    pub fn advance(&mut self, ticks: u32) -> RaceTickResult {
        let mut merged = RaceTickResult::default();
        for _ in 0..ticks {
            let step = self.tick();
            merged.finished.extend(step.finished);
            if step.race_complete {
                merged.race_complete = true;
                break;
            }
        }
        merged
    }

    /// Withdraw a racer mid-race.
    ///
    /// The identity stays in the field and is ranked by progress in the
    /// final outcome, after every genuine finisher.
    pub fn retire(&mut self, id: CompetitorId) {
        if let Some(racer) = self.racers.iter_mut().find(|r| r.competitor.id == id) {
            if !racer.finished() {
                racer.retired = true;
            }
        }
    }

    /// Total ordering of the field, available at any time.
    ///
    /// Finished racers sort first in ascending finish order, then
    /// unfinished racers by descending progress. Ties keep original
    /// roster order (stable sort).
    pub fn live_ranking(&self) -> Vec<CompetitorId> {
        let mut order: Vec<&RacerState> = self.racers.iter().collect();
        order.sort_by_key(|r| match r.finish_rank {
            Some(rank) => (0u8, rank as i64),
            None => (1u8, -(r.distance as i64)),
        });
        order.into_iter().map(|r| r.competitor.id).collect()
    }

    /// The frozen final outcome, once the race has completed.
    pub fn final_outcome(&self) -> Option<&RaceOutcome> {
        self.outcome.as_ref()
    }

    /// Has the race completed?
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The racers in roster order.
    pub fn racers(&self) -> &[RacerState] {
        &self.racers
    }

    /// A racer's progress as a fraction of the total distance.
    pub fn progress_of(&self, id: CompetitorId) -> Option<Fixed> {
        let total = self.descriptor.as_ref()?.total_distance();
        if total <= 0 {
            return None;
        }
        self.racers
            .iter()
            .find(|r| r.competitor.id == id)
            .map(|r| fixed_div(r.distance, total))
    }

    /// A racer's world position on the circuit, for presentation.
    pub fn position_of(&self, id: CompetitorId) -> Option<FixedVec2> {
        let descriptor = self.descriptor.as_ref()?;
        self.racers
            .iter()
            .find(|r| r.competitor.id == id)
            .map(|r| descriptor.course.position_at(r.distance))
    }

    /// Build the final outcome from the live ordering.
    ///
    /// With retirements the genuine finishers come first and the rest
    /// are ranked by progress; ranks stay contiguous 1..N over everyone
    /// present. Never panics: presentation always gets a full ranking.
    fn synthesize_outcome(&self) -> RaceOutcome {
        let placings = self
            .live_ranking()
            .into_iter()
            .enumerate()
            .map(|(i, id)| (i as u8 + 1, id))
            .collect();
        RaceOutcome::new(placings)
    }
}

/// One racer's distance step for one tick.
///
/// pace = base_speed x track speed x fatigue x (1 +/- luck jitter),
/// integrated over TICK_DT. Fatigue is a function of covered distance,
/// stamina, and the track's fatigue multiplier, floored so every race
/// terminates.
fn advance_step(
    racer: &RacerState,
    descriptor: &TrackDescriptor,
    total: Fixed,
    amplitude: Fixed,
    rng: &mut DeterministicRng,
) -> Fixed {
    let stats = &racer.competitor;

    let pace = fixed_mul(stats.base_speed, descriptor.speed_mult);

    // Drain grows with covered distance; stamina shields against it.
    let drain = fixed_clamp(fixed_div(racer.distance, total), 0, FIXED_ONE);
    let exposure = FIXED_ONE.wrapping_sub(stats.stamina);
    let fatigue = FIXED_ONE.wrapping_sub(fixed_mul(
        fixed_mul(drain, descriptor.fatigue_mult),
        exposure,
    ));
    let fatigue = fixed_clamp(fatigue, FATIGUE_FLOOR, FIXED_ONE);

    let jitter = rng.next_fixed_range(-amplitude, amplitude);
    let swing = fixed_mul(jitter, fixed_mul(stats.luck, descriptor.luck_mult));
    let jitter_mult = fixed_max(FIXED_ONE.wrapping_add(swing), JITTER_FLOOR);

    let tick_pace = fixed_mul(fixed_mul(pace, fatigue), jitter_mult);
    fixed_mul(tick_pace, TICK_DT)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;
    use crate::game::competitor::Roster;
    use crate::game::track::{TrackCatalog, TrackProvider};

    fn test_field(n: usize) -> Vec<Competitor> {
        let mut roster = Roster::new(42);
        use crate::game::competitor::SelectionProvider;
        roster.select_random(n)
    }

    fn test_track() -> TrackDescriptor {
        TrackCatalog::new(7).track_for_round(1).unwrap()
    }

    fn run_to_completion(engine: &mut RaceEngine) -> RaceOutcome {
        // Generous tick budget; the fatigue floor guarantees forward
        // motion, so a non-terminating race is a defect.
        for _ in 0..200_000 {
            if engine.tick().race_complete {
                return engine.final_outcome().unwrap().clone();
            }
        }
        panic!("race did not complete within the tick budget");
    }

    #[test]
    fn test_begin_rejects_empty_field() {
        let mut engine = RaceEngine::default();
        let result = engine.begin(test_track(), Vec::new(), 1);
        assert!(matches!(result, Err(RaceError::EmptyField)));
    }

    #[test]
    fn test_begin_rejects_degenerate_course() {
        use crate::game::track::{Course, TrackId};
        let descriptor = TrackDescriptor {
            id: TrackId(9),
            name: "Point".to_string(),
            laps: 1,
            speed_mult: FIXED_ONE,
            fatigue_mult: FIXED_ONE,
            luck_mult: FIXED_ONE,
            course: Course::new(vec![FixedVec2::ZERO]),
        };
        let mut engine = RaceEngine::default();
        let result = engine.begin(descriptor, test_field(4), 1);
        assert!(matches!(result, Err(RaceError::DegenerateCourse(1))));
    }

    #[test]
    fn test_race_completes_with_contiguous_ranks() {
        let mut engine = RaceEngine::default();
        let field = test_field(6);
        let ids: Vec<CompetitorId> = field.iter().map(|c| c.id).collect();
        engine.begin(test_track(), field, 12345).unwrap();

        let outcome = run_to_completion(&mut engine);

        assert_eq!(outcome.len(), 6);
        for (i, (rank, _)) in outcome.placings().iter().enumerate() {
            assert_eq!(*rank as usize, i + 1);
        }
        // Every competitor exactly once
        for id in ids {
            assert!(outcome.rank_of(id).is_some());
        }
    }

    #[test]
    fn test_finish_fires_once_per_racer() {
        let mut engine = RaceEngine::default();
        engine.begin(test_track(), test_field(5), 99).unwrap();

        let mut seen = Vec::new();
        for _ in 0..200_000 {
            let result = engine.tick();
            for (id, rank) in &result.finished {
                assert!(!seen.contains(id), "{} finished twice", id);
                assert_eq!(*rank as usize, seen.len() + 1);
                seen.push(*id);
            }
            if result.race_complete {
                break;
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_live_ranking_is_total_and_stable() {
        let mut engine = RaceEngine::default();
        let field = test_field(6);
        engine.begin(test_track(), field, 5).unwrap();

        // Before any tick everyone is tied at zero progress: the live
        // ranking must still cover the field, in roster order.
        let at_start = engine.live_ranking();
        let roster_order: Vec<CompetitorId> =
            engine.racers().iter().map(|r| r.competitor.id).collect();
        assert_eq!(at_start, roster_order);

        // Mid-race the ranking stays total
        engine.advance(500);
        let mid = engine.live_ranking();
        assert_eq!(mid.len(), 6);
    }

    #[test]
    fn test_live_ranking_finishers_first() {
        let mut engine = RaceEngine::default();
        engine.begin(test_track(), test_field(4), 333).unwrap();

        // Advance until at least one finisher
        let mut first: Option<CompetitorId> = None;
        for _ in 0..200_000 {
            let result = engine.tick();
            if let Some((id, _)) = result.finished.first() {
                first = Some(*id);
                break;
            }
        }
        let first = first.expect("someone finishes");
        assert_eq!(engine.live_ranking()[0], first);
    }

    #[test]
    fn test_retirement_still_yields_full_outcome() {
        let mut engine = RaceEngine::default();
        let field = test_field(5);
        let victim = field[2].id;
        engine.begin(test_track(), field, 2024).unwrap();

        engine.advance(200);
        engine.retire(victim);

        let outcome = run_to_completion(&mut engine);

        // Retired racer is still ranked, after every genuine finisher
        assert_eq!(outcome.len(), 5);
        assert_eq!(outcome.rank_of(victim), Some(5));
    }

    #[test]
    fn test_deterministic_outcome() {
        let track = test_track();
        let field = test_field(6);

        let mut e1 = RaceEngine::default();
        let mut e2 = RaceEngine::default();
        e1.begin(track.clone(), field.clone(), 777).unwrap();
        e2.begin(track, field, 777).unwrap();

        let o1 = run_to_completion(&mut e1);
        let o2 = run_to_completion(&mut e2);
        assert_eq!(o1, o2);
    }

    #[test]
    fn test_reset_clears_runtime_state() {
        let mut engine = RaceEngine::default();
        engine.begin(test_track(), test_field(4), 55).unwrap();
        run_to_completion(&mut engine);

        engine.reset();

        assert!(!engine.is_complete());
        assert!(engine.final_outcome().is_none());
        for racer in engine.racers() {
            assert_eq!(racer.distance, 0);
            assert!(racer.finish_rank.is_none());
            assert!(!racer.retired);
        }
    }

    #[test]
    fn test_fatigue_floor_keeps_racers_moving() {
        let mut engine = RaceEngine::default();
        // A paper-thin stamina racer on a draining track still advances.
        let sloth = Competitor::new(
            CompetitorId(1),
            "Sloth",
            to_fixed(10.0),
            to_fixed(0.01),
            to_fixed(0.1),
        );
        let mut track = test_track();
        track.fatigue_mult = to_fixed(2.0);
        engine.begin(track, vec![sloth], 1).unwrap();

        engine.advance(60);
        assert!(engine.racers()[0].distance > 0);
    }

    #[test]
    fn test_outcome_contiguity_assert() {
        let ok = RaceOutcome::new(vec![(1, CompetitorId(3)), (2, CompetitorId(1))]);
        assert_eq!(ok.winner(), Some(CompetitorId(3)));

        let bad = std::panic::catch_unwind(|| {
            RaceOutcome::new(vec![(1, CompetitorId(3)), (3, CompetitorId(1))])
        });
        assert!(bad.is_err(), "a rank gap must be fatal");
    }
}
