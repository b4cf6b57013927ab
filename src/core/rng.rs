//! Deterministic Random Number Generator
//!
//! Xorshift128+ with SplitMix64 state initialization, plus the SHA-256
//! seed-derivation helpers that split one session seed into independent
//! streams for the competitor draw and each round's race jitter.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use super::fixed::Fixed;

/// Seeded Xorshift128+ PRNG.
///
/// Given the same seed this produces the exact same sequence on any
/// platform. Competitor draws, track picks, and race jitter all flow
/// through one of these, so a seeded session always replays to the
/// same finish orders.
///
/// # Example
///
/// ```
/// use derby_core::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// let value = rng.next_u64();
/// assert_eq!(value, 6233086606872742541); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Seed the generator. SplitMix64 spreads weak seeds over the full
    /// state space.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift state must never be all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// The next 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// A random integer in [0, max). Modulo bias is negligible for the
    /// small ranges used here (catalog and roster indices).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// A random Fixed in [0, max).
    #[inline]
    pub fn next_fixed(&mut self, max: Fixed) -> Fixed {
        if max <= 0 {
            return 0;
        }
        // Upper 32 bits, scaled: (raw * max) / 2^32
        let raw = (self.next_u64() >> 32) as u32;
        ((raw as i64 * max as i64) >> 32) as Fixed
    }

    /// A random Fixed in [min, max). Race jitter draws from a symmetric
    /// range around zero.
    #[inline]
    pub fn next_fixed_range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        if min >= max {
            return min;
        }
        let range = max.wrapping_sub(min);
        min.wrapping_add(self.next_fixed(range))
    }

    /// In-place Fisher-Yates shuffle.
    ///
    /// The roster's field draw is a shuffle plus truncate, so pick
    /// uniqueness is free.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }
}

/// SplitMix64, used only to initialize Xorshift state.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a per-round seed from the session seed and round number.
///
/// Domain-separated so round N of a session never shares a jitter
/// stream with the competitor draw or with any other round.
pub fn derive_round_seed(session_seed: u64, round: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"DERBY_ROUND_SEED_V1");
    hasher.update(session_seed.to_le_bytes());
    hasher.update(round.to_le_bytes());
    let hash = hasher.finalize();
    u64::from_le_bytes(hash[0..8].try_into().unwrap())
}

/// Derive the competitor-draw seed for a session.
pub fn derive_draw_seed(session_seed: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"DERBY_DRAW_SEED_V1");
    hasher.update(session_seed.to_le_bytes());
    let hash = hasher.finalize();
    u64::from_le_bytes(hash[0..8].try_into().unwrap())
}

// =============================================================================
// TESTS
// =============================================================================
