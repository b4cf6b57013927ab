//! # Derby Core
//!
//! Deterministic round-based race betting engine with two-tier score
//! persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        DERBY CORE                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Deterministic primitives                 │
//! │  ├── fixed.rs     - Q16.16 fixed-point arithmetic            │
//! │  ├── vec2.rs      - 2D vector with fixed-point               │
//! │  └── rng.rs       - Deterministic Xorshift128+ PRNG          │
//! │                                                              │
//! │  game/            - Game logic (deterministic)               │
//! │  ├── competitor.rs- Identities, stats, roster draw           │
//! │  ├── track.rs     - Course geometry and catalog              │
//! │  ├── bet.rs       - Bet kinds and the active slip            │
//! │  ├── race.rs      - Race engine: advancement and rankings    │
//! │  ├── settle.rs    - Pure payout computation                  │
//! │  ├── events.rs    - Typed events, subscriber bus             │
//! │  └── session.rs   - Phase state machine (root component)     │
//! │                                                              │
//! │  ledger/          - Two-tier score persistence               │
//! │  ├── mod.rs       - Session records + durable statistics     │
//! │  └── store.rs     - StatStore trait, memory/file backends    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! Given the same session seed, the competitor draw, track picks, and
//! every race's finish order replay identically on any platform.
//!
//! ## Lifetimes
//!
//! Results persist across two independent lifetimes: the session layer
//! (round history, reset by each new game) and the durable layer
//! (cumulative counters, per-competitor rank histories, per-bet-kind
//! aggregates, leaderboard), which survives process restarts through a
//! pluggable [`ledger::store::StatStore`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod ledger;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::{
    BetKind, BetSlip, Competitor, CompetitorId, GameEvent, GameSession, Phase, RaceEngine,
    RaceOutcome, SessionConfig, TrackDescriptor, TrackId,
};
pub use ledger::ScoreLedger;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
