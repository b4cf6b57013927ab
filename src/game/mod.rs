//! Game Logic Module
//!
//! All round and race logic. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `competitor`: Competitor identities, stats, roster draw
//! - `track`: Course geometry, descriptors, catalog
//! - `bet`: Bet kinds and the active slip
//! - `race`: Race advancement, live ranking, final outcome
//! - `settle`: Pure payout computation
//! - `events`: Typed events and the subscriber bus
//! - `session`: The root phase state machine

pub mod competitor;
pub mod track;
pub mod bet;
pub mod race;
pub mod settle;
pub mod events;
pub mod session;

// Re-export key types
pub use competitor::{Competitor, CompetitorId, Roster, SelectionProvider};
pub use track::{Course, TrackCatalog, TrackDescriptor, TrackId, TrackProvider};
pub use bet::{BetKind, BetSlip};
pub use race::{RaceEngine, RaceError, RaceOutcome};
pub use settle::settle;
pub use events::{EventBus, GameEvent, Subscription};
pub use session::{GameSession, Phase, SessionConfig};
