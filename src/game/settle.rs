//! Settlement
//!
//! Pure payout computation: `(slip, outcome) -> score`. Side-effect
//! free and idempotent, which the ledger and the test suite both rely
//! on.

use crate::game::bet::{BetKind, BetSlip};
use crate::game::race::RaceOutcome;

/// Score a completed round's bet against the final outcome.
///
/// Returns the kind's fixed payout weight iff the picked competitors
/// occupy exactly the rank pattern the kind demands, else 0. An
/// incomplete slip, or a pick missing from the outcome, scores 0 -
/// never a panic.
pub fn settle(slip: &BetSlip, outcome: &RaceOutcome) -> u32 {
    if !slip.is_complete() {
        return 0;
    }

    let mut ranks = Vec::with_capacity(slip.picks().len());
    for pick in slip.picks() {
        match outcome.rank_of(*pick) {
            Some(rank) => ranks.push(rank),
            None => return 0,
        }
    }

    let required = slip.kind().required_picks() as u8;
    let hit = if slip.kind() == BetKind::Place {
        // Place is the one kind that doesn't demand the top-N block.
        ranks[0] <= 2
    } else if slip.kind().is_ordered() {
        // Exact order: pick i must hold rank i+1.
        ranks.iter().enumerate().all(|(i, r)| *r == i as u8 + 1)
    } else {
        // Any order: picks occupy ranks 1..=required as a set. Picks
        // are unique, so checking the bound is enough.
        ranks.iter().all(|r| *r <= required)
    };

    if hit {
        slip.kind().payout_weight()
    } else {
        0
    }
}

// =============================================================================
// TESTS
// =============================================================================
