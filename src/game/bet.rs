//! Bet Kinds & Slips
//!
//! The enumerated wager patterns and the slip being filled during the
//! betting phase. The pick list is the single source of truth; the
//! first/second accessors are derived on read.

use serde::{Serialize, Deserialize};

use crate::game::competitor::CompetitorId;

// =============================================================================
// BET KIND
// =============================================================================

/// An enumerated wagering pattern with a fixed required-selection count
/// and a fixed payout weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BetKind {
    /// Pick 1: finishes 1st
    #[default]
    Win = 0,
    /// Pick 1: finishes 1st or 2nd
    Place = 1,
    /// Pick 2: first two, either order
    Quinella = 2,
    /// Pick 2: first two, exact order
    Exacta = 3,
    /// Pick 3: first three, any order
    Trio = 4,
    /// Pick 3: first three, exact order
    Trifecta = 5,
}

impl BetKind {
    /// All kinds, in menu order.
    pub const ALL: [BetKind; 6] = [
        BetKind::Win,
        BetKind::Place,
        BetKind::Quinella,
        BetKind::Exacta,
        BetKind::Trio,
        BetKind::Trifecta,
    ];

    /// Number of picks this kind requires.
    #[inline]
    pub fn required_picks(self) -> usize {
        match self {
            BetKind::Win | BetKind::Place => 1,
            BetKind::Quinella | BetKind::Exacta => 2,
            BetKind::Trio | BetKind::Trifecta => 3,
        }
    }

    /// Fixed payout weight on a hit.
    #[inline]
    pub fn payout_weight(self) -> u32 {
        match self {
            BetKind::Win => 10,
            BetKind::Place => 5,
            BetKind::Quinella => 30,
            BetKind::Exacta => 50,
            BetKind::Trio => 100,
            BetKind::Trifecta => 200,
        }
    }

    /// Whether pick order matters for settlement.
    #[inline]
    pub fn is_ordered(self) -> bool {
        matches!(self, BetKind::Exacta | BetKind::Trifecta)
    }
}

// =============================================================================
// BET SLIP
// =============================================================================

/// The active bet: a kind plus an ordered list of unique picks,
/// filled 0..N during the betting phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetSlip {
    kind: BetKind,
    picks: Vec<CompetitorId>,
}

impl Default for BetSlip {
    fn default() -> Self {
        Self::new(BetKind::default())
    }
}

impl BetSlip {
    /// Create an empty slip of the given kind.
    pub fn new(kind: BetKind) -> Self {
        Self {
            kind,
            picks: Vec::with_capacity(kind.required_picks()),
        }
    }

    /// The slip's kind.
    pub fn kind(&self) -> BetKind {
        self.kind
    }

    /// The ordered picks made so far.
    pub fn picks(&self) -> &[CompetitorId] {
        &self.picks
    }

    /// Complete iff every required slot is filled.
    pub fn is_complete(&self) -> bool {
        self.picks.len() == self.kind.required_picks()
    }

    /// Add a pick.
    ///
    /// A duplicate pick is a no-op, not an error, as is a pick on an
    /// already-complete slip. Returns true if the slip changed.
    pub fn pick(&mut self, id: CompetitorId) -> bool {
        if self.is_complete() || self.picks.contains(&id) {
            return false;
        }
        self.picks.push(id);
        true
    }

    /// Remove a pick. Returns true if the slip changed.
    pub fn unpick(&mut self, id: CompetitorId) -> bool {
        let before = self.picks.len();
        self.picks.retain(|p| *p != id);
        self.picks.len() != before
    }

    /// Discard all picks, keeping the kind.
    pub fn clear(&mut self) {
        self.picks.clear();
    }

    /// Derived accessor: the first pick, if made.
    pub fn first_pick(&self) -> Option<CompetitorId> {
        self.picks.first().copied()
    }

    /// Derived accessor: the second pick, if made.
    pub fn second_pick(&self) -> Option<CompetitorId> {
        self.picks.get(1).copied()
    }
}

// =============================================================================
// TESTS
// =============================================================================
