//! Property tests for the settlement function and the race engine's
//! ranking guarantees.

use proptest::prelude::*;
use rand::prelude::*;
use rand::Rng;

use derby_core::game::{
    bet::{BetKind, BetSlip},
    competitor::{CompetitorId, Roster, SelectionProvider},
    race::{RaceEngine, RaceOutcome},
    settle::settle,
    track::{TrackCatalog, TrackProvider},
};

/// A random finish order over a field of `n` competitors with ids 1..=n.
fn outcome_strategy() -> impl Strategy<Value = RaceOutcome> {
    (2usize..=8).prop_flat_map(|n| {
        Just((1..=n as u8).map(CompetitorId).collect::<Vec<_>>())
            .prop_shuffle()
            .prop_map(|order| {
                RaceOutcome::new(
                    order
                        .into_iter()
                        .enumerate()
                        .map(|(i, id)| (i as u8 + 1, id))
                        .collect(),
                )
            })
    })
}

/// A slip of the given kind whose picks come from ids 1..=8 (possibly
/// outside the outcome's field, which must settle to 0, not panic).
fn slip_strategy(kind: BetKind) -> impl Strategy<Value = BetSlip> {
    proptest::collection::vec(1u8..=8, 0..=kind.required_picks()).prop_map(move |raw| {
        let mut slip = BetSlip::new(kind);
        for id in raw {
            slip.pick(CompetitorId(id));
        }
        slip
    })
}

fn kind_strategy() -> impl Strategy<Value = BetKind> {
    proptest::sample::select(BetKind::ALL.to_vec())
}

proptest! {
    /// Settlement is idempotent and only ever pays 0 or the kind's
    /// fixed weight.
    #[test]
    fn settle_idempotent_and_bounded(
        kind in kind_strategy(),
        outcome in outcome_strategy(),
    ) {
        // A fixed spread of slips per outcome covers empty, partial,
        // complete, and permuted pick lists for every kind.
        for picks in [&[][..], &[1][..], &[1, 2][..], &[2, 1][..], &[1, 2, 3][..], &[3, 1, 2][..]] {
            let mut slip = BetSlip::new(kind);
            for id in picks {
                slip.pick(CompetitorId(*id));
            }

            let first = settle(&slip, &outcome);
            prop_assert_eq!(settle(&slip, &outcome), first);
            prop_assert!(first == 0 || first == kind.payout_weight());

            // An incomplete slip never pays
            if !slip.is_complete() {
                prop_assert_eq!(first, 0);
            }
        }
    }

    /// Random slips against random outcomes never panic and stay
    /// idempotent.
    #[test]
    fn settle_total_over_random_slips(
        outcome in outcome_strategy(),
        slip in kind_strategy().prop_flat_map(slip_strategy),
    ) {
        let first = settle(&slip, &outcome);
        prop_assert_eq!(settle(&slip, &outcome), first);
        prop_assert!(first == 0 || first == slip.kind().payout_weight());
    }

    /// Whatever the seed and field size, a completed race ranks every
    /// competitor exactly once with contiguous ranks.
    #[test]
    fn final_outcome_is_contiguous(
        seed in any::<u64>(),
        field_size in 2usize..=8,
    ) {
        let mut roster = Roster::new(seed);
        let mut catalog = TrackCatalog::new(seed);
        let field = roster.select_random(field_size);
        let ids: Vec<CompetitorId> = field.iter().map(|c| c.id).collect();
        let track = catalog.track_for_round(1).unwrap();

        let mut engine = RaceEngine::default();
        engine.begin(track, field, seed).unwrap();

        let mut completed = false;
        for _ in 0..400_000 {
            if engine.tick().race_complete {
                completed = true;
                break;
            }
        }
        prop_assert!(completed, "race must terminate");

        let outcome = engine.final_outcome().unwrap();
        prop_assert_eq!(outcome.len(), ids.len());
        for (i, (rank, _)) in outcome.placings().iter().enumerate() {
            prop_assert_eq!(*rank as usize, i + 1);
        }
        for id in ids {
            prop_assert!(outcome.rank_of(id).is_some());
        }
    }
}

/// Contiguity also holds when racers retire at random points mid-race.
#[test]
fn final_outcome_contiguous_under_random_retirement() {
    let mut rng = StdRng::seed_from_u64(0xDE4B);

    for _ in 0..25 {
        let seed: u64 = rng.gen();
        let field_size = rng.gen_range(3..=8);

        let mut roster = Roster::new(seed);
        let mut catalog = TrackCatalog::new(seed);
        let field = roster.select_random(field_size);
        let ids: Vec<CompetitorId> = field.iter().map(|c| c.id).collect();

        let mut engine = RaceEngine::default();
        engine
            .begin(catalog.track_for_round(1).unwrap(), field, seed)
            .unwrap();

        // Retire up to two racers at random moments
        let retire_at: Vec<(u32, CompetitorId)> = (0..rng.gen_range(0..=2))
            .map(|_| (rng.gen_range(1..2_000), *ids.choose(&mut rng).unwrap()))
            .collect();

        let mut tick: u32 = 0;
        loop {
            for (at, id) in &retire_at {
                if *at == tick {
                    engine.retire(*id);
                }
            }
            if engine.tick().race_complete {
                break;
            }
            tick += 1;
            assert!(tick < 400_000, "race must terminate");
        }

        let outcome = engine.final_outcome().unwrap();
        assert_eq!(outcome.len(), ids.len());
        for (i, (rank, _)) in outcome.placings().iter().enumerate() {
            assert_eq!(*rank as usize, i + 1);
        }
    }
}
