//! Game Events
//!
//! Typed events pushed to presentation code, plus the event bus with
//! disposable subscription handles. The session accumulates events
//! while it mutates and flushes them through the bus afterwards, so
//! presentation never observes a half-applied transition.

use serde::{Serialize, Deserialize};

use crate::game::bet::BetKind;
use crate::game::competitor::CompetitorId;
use crate::game::session::Phase;
use crate::game::track::TrackId;

// =============================================================================
// EVENTS
// =============================================================================

/// Everything presentation code can observe about a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The phase machine moved
    PhaseChanged {
        /// Phase left
        from: Phase,
        /// Phase entered
        to: Phase,
    },

    /// One second elapsed during the countdown
    CountdownTick {
        /// Whole seconds until the race starts
        seconds_left: u32,
    },

    /// A new round began
    RoundChanged {
        /// 1-based round number
        round: u32,
    },

    /// The active track was (re)applied
    TrackChanged {
        /// Track identity
        id: TrackId,
        /// Display name
        name: String,
        /// Lap count for the round
        laps: u32,
    },

    /// The bet slip was replaced with a new kind
    BetChanged {
        /// The new kind
        kind: BetKind,
    },

    /// The countdown expired and racers are moving
    RaceStarted,

    /// A racer crossed the finish line
    CompetitorFinished {
        /// Who finished
        id: CompetitorId,
        /// Sequential finish rank
        rank: u8,
    },

    /// Every active racer is done; the final outcome is frozen
    RaceComplete,

    /// A round settled and the session score moved
    ScoreChanged {
        /// Score earned this round (0 on a lost bet)
        delta: u32,
        /// New session total
        total: u32,
    },

    /// The session reached its terminal phase
    SessionFinished {
        /// Final session score
        final_score: u32,
    },
}

// =============================================================================
// EVENT BUS
// =============================================================================

/// Disposable handle returned by `EventBus::subscribe`.
///
/// Passing it back to `unsubscribe` deterministically stops delivery;
/// there is no way to double-subscribe or double-fire through a stale
/// handle.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Callback = Box<dyn FnMut(&GameEvent)>;

/// Typed observer registry for session events.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(u64, Callback)>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every published event.
    pub fn subscribe(&mut self, callback: impl FnMut(&GameEvent) + 'static) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        Subscription(id)
    }

    /// Remove a subscription. Returns false if already removed.
    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(id, _)| *id != handle.0);
        self.subscribers.len() != before
    }

    /// Deliver an event to every subscriber, in subscription order.
    pub fn publish(&mut self, event: &GameEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
