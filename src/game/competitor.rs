//! Competitor Identity & Roster
//!
//! Competitor identities, their racing stats, and the built-in roster
//! that supplies a random field for each session.

use serde::{Serialize, Deserialize};
use std::fmt;

use crate::core::fixed::{Fixed, to_fixed};
use crate::core::rng::DeterministicRng;

// =============================================================================
// COMPETITOR ID
// =============================================================================

/// Unique competitor identifier (saddle number).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CompetitorId(pub u8);

impl CompetitorId {
    /// Create from a raw saddle number.
    pub const fn new(n: u8) -> Self {
        Self(n)
    }

    /// Get the raw saddle number.
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// COMPETITOR
// =============================================================================

/// A competitor's identity plus racing stats.
///
/// Stats are fixed-point fractions tuned so that no single stat decides
/// a race: a fast low-stamina runner fades late, a lucky plodder spikes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    /// Saddle number
    pub id: CompetitorId,
    /// Display name
    pub name: String,
    /// Base pace in course units per second (Fixed)
    pub base_speed: Fixed,
    /// Resistance to fatigue, 0..1 (Fixed)
    pub stamina: Fixed,
    /// Susceptibility to per-tick jitter, 0..1 (Fixed)
    pub luck: Fixed,
}

impl Competitor {
    /// Create a competitor with explicit stats.
    pub fn new(id: CompetitorId, name: &str, base_speed: Fixed, stamina: Fixed, luck: Fixed) -> Self {
        Self {
            id,
            name: name.to_string(),
            base_speed,
            stamina,
            luck,
        }
    }
}

// =============================================================================
// SELECTION PROVIDER
// =============================================================================

/// Supplies the field of competitors for a session.
///
/// The session asks for a field once per `new_game`; implementations
/// must return unique competitors, at most `count` of them.
pub trait SelectionProvider {
    /// Draw `count` unique competitors.
    ///
    /// Returns fewer if the pool is smaller than `count`; returns an
    /// empty vec only if the pool itself is empty.
    fn select_random(&mut self, count: usize) -> Vec<Competitor>;
}

// =============================================================================
// BUILT-IN ROSTER
// =============================================================================

/// Name and stat sheet for the built-in pool.
/// (name, base_speed, stamina, luck)
const ROSTER_SHEET: [(&str, Fixed, Fixed, Fixed); 12] = [
    ("Ember Dash",     to_fixed(16.5), to_fixed(0.55), to_fixed(0.60)),
    ("Night Harbor",   to_fixed(15.0), to_fixed(0.85), to_fixed(0.35)),
    ("Gold Rush",      to_fixed(17.5), to_fixed(0.40), to_fixed(0.70)),
    ("Quiet Storm",    to_fixed(15.5), to_fixed(0.75), to_fixed(0.45)),
    ("Paper Moon",     to_fixed(14.5), to_fixed(0.90), to_fixed(0.25)),
    ("Red Meridian",   to_fixed(16.0), to_fixed(0.60), to_fixed(0.55)),
    ("Salt Flat",      to_fixed(15.0), to_fixed(0.70), to_fixed(0.80)),
    ("Iron Lantern",   to_fixed(14.0), to_fixed(0.95), to_fixed(0.30)),
    ("Blue Comet",     to_fixed(17.0), to_fixed(0.45), to_fixed(0.65)),
    ("Wild Almanac",   to_fixed(15.5), to_fixed(0.65), to_fixed(0.90)),
    ("Stone Parade",   to_fixed(14.5), to_fixed(0.80), to_fixed(0.40)),
    ("Last Telegram",  to_fixed(16.5), to_fixed(0.50), to_fixed(0.75)),
];

/// The built-in competitor pool with a seeded random draw.
#[derive(Clone, Debug)]
pub struct Roster {
    pool: Vec<Competitor>,
    rng: DeterministicRng,
}

impl Roster {
    /// Create the built-in roster with a draw seed.
    pub fn new(seed: u64) -> Self {
        let pool = ROSTER_SHEET
            .iter()
            .enumerate()
            .map(|(i, (name, speed, stamina, luck))| {
                Competitor::new(CompetitorId::new(i as u8 + 1), name, *speed, *stamina, *luck)
            })
            .collect();

        Self {
            pool,
            rng: DeterministicRng::new(seed),
        }
    }

    /// Number of competitors in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Look up a pool member by id.
    pub fn get(&self, id: CompetitorId) -> Option<&Competitor> {
        self.pool.iter().find(|c| c.id == id)
    }
}

impl SelectionProvider for Roster {
    fn select_random(&mut self, count: usize) -> Vec<Competitor> {
        // Fisher-Yates over indices, then truncate: uniqueness is free.
        let mut indices: Vec<usize> = (0..self.pool.len()).collect();
        self.rng.shuffle(&mut indices);
        indices.truncate(count);

        indices.into_iter().map(|i| self.pool[i].clone()).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
