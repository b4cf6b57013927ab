//! Track Geometry & Catalog
//!
//! Courses are closed waypoint circuits with precomputed segment
//! lengths. The catalog applies per-round numeric modifiers and avoids
//! handing out the same course twice in a row.

use serde::{Serialize, Deserialize};
use std::fmt;

use crate::core::fixed::{Fixed, FIXED_ONE, to_fixed, fixed_mul, fixed_div};
use crate::core::vec2::FixedVec2;
use crate::core::rng::DeterministicRng;

// =============================================================================
// TRACK ID
// =============================================================================

/// Unique track identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TrackId(pub u8);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

// =============================================================================
// COURSE
// =============================================================================

/// A closed waypoint circuit with precomputed cumulative segment lengths.
///
/// The segment from the last waypoint back to the first is implicit, so
/// a course of N waypoints has N segments and racers can lap it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    waypoints: Vec<FixedVec2>,
    /// cumulative[i] = distance from start to the end of segment i
    cumulative: Vec<Fixed>,
}

impl Course {
    /// Build a course from a waypoint polyline.
    ///
    /// Degenerate inputs (fewer than 2 waypoints) are stored as-is and
    /// rejected later by `RaceEngine::begin`, so construction itself
    /// never fails.
    pub fn new(waypoints: Vec<FixedVec2>) -> Self {
        let mut cumulative = Vec::with_capacity(waypoints.len());
        let mut total: Fixed = 0;

        for i in 0..waypoints.len() {
            let a = waypoints[i];
            let b = waypoints[(i + 1) % waypoints.len()];
            total = total.wrapping_add(a.distance(b));
            cumulative.push(total);
        }

        Self { waypoints, cumulative }
    }

    /// Number of waypoints.
    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    /// The waypoints themselves.
    pub fn waypoints(&self) -> &[FixedVec2] {
        &self.waypoints
    }

    /// Length of one lap.
    pub fn lap_length(&self) -> Fixed {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// The start/finish line position.
    pub fn start(&self) -> FixedVec2 {
        self.waypoints.first().copied().unwrap_or(FixedVec2::ZERO)
    }

    /// World position at a distance along the circuit.
    ///
    /// Distance wraps modulo the lap length, so a racer on lap 3 of a
    /// 2-lap course still maps to a point on the circuit.
    pub fn position_at(&self, distance: Fixed) -> FixedVec2 {
        let lap = self.lap_length();
        if lap <= 0 || self.waypoints.len() < 2 {
            return self.start();
        }

        let d = distance.rem_euclid(lap);

        let mut seg_start: Fixed = 0;
        for (i, &seg_end) in self.cumulative.iter().enumerate() {
            if d <= seg_end {
                let a = self.waypoints[i];
                let b = self.waypoints[(i + 1) % self.waypoints.len()];
                let seg_len = seg_end.wrapping_sub(seg_start);
                if seg_len <= 0 {
                    return a;
                }
                let t = fixed_div(d.wrapping_sub(seg_start), seg_len);
                return a.lerp(b, t);
            }
            seg_start = seg_end;
        }

        self.start()
    }
}

// =============================================================================
// TRACK DESCRIPTOR
// =============================================================================

/// The active course for a round plus its numeric modifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Track identity
    pub id: TrackId,
    /// Display name
    pub name: String,
    /// Lap count for the round
    pub laps: u32,
    /// Pace multiplier applied to every racer (FIXED_ONE = neutral)
    pub speed_mult: Fixed,
    /// Fatigue multiplier: higher drains racers faster
    pub fatigue_mult: Fixed,
    /// Luck multiplier: higher widens per-tick jitter
    pub luck_mult: Fixed,
    /// The circuit geometry
    pub course: Course,
}

impl TrackDescriptor {
    /// Total race distance: lap length times lap count.
    pub fn total_distance(&self) -> Fixed {
        self.course.lap_length().wrapping_mul(self.laps.max(1) as i32)
    }
}

// =============================================================================
// TRACK PROVIDER
// =============================================================================

/// Supplies the active course for each round.
pub trait TrackProvider {
    /// Pick and configure the track for a round (1-based).
    ///
    /// Returns None only if the provider has no courses at all.
    fn track_for_round(&mut self, round: u32) -> Option<TrackDescriptor>;

    /// Forget recently-used tracks (called when a new game starts).
    fn clear_history(&mut self);
}

// =============================================================================
// BUILT-IN CATALOG
// =============================================================================

/// Pace multiplier gained per round past the first: 0.06
const ROUND_SPEED_STEP: Fixed = to_fixed(0.06);

/// Fatigue multiplier gained per round past the first: 0.15
const ROUND_FATIGUE_STEP: Fixed = to_fixed(0.15);

/// How many recent picks the catalog refuses to repeat.
const HISTORY_DEPTH: usize = 1;

struct CatalogEntry {
    id: TrackId,
    name: &'static str,
    base_laps: u32,
    luck_mult: Fixed,
    waypoints: &'static [FixedVec2],
}

/// Compact oval, one lap ~ 460 units.
const OVAL_WAYPOINTS: [FixedVec2; 8] = [
    FixedVec2::from_ints(0, 0),
    FixedVec2::from_ints(120, 0),
    FixedVec2::from_ints(150, 30),
    FixedVec2::from_ints(150, 60),
    FixedVec2::from_ints(120, 90),
    FixedVec2::from_ints(0, 90),
    FixedVec2::from_ints(-30, 60),
    FixedVec2::from_ints(-30, 30),
];

/// Long straightaways with two hairpins.
const HAIRPIN_WAYPOINTS: [FixedVec2; 6] = [
    FixedVec2::from_ints(0, 0),
    FixedVec2::from_ints(200, 0),
    FixedVec2::from_ints(220, 25),
    FixedVec2::from_ints(200, 50),
    FixedVec2::from_ints(0, 50),
    FixedVec2::from_ints(-20, 25),
];

/// Winding figure with short mixed segments.
const SERPENT_WAYPOINTS: [FixedVec2; 10] = [
    FixedVec2::from_ints(0, 0),
    FixedVec2::from_ints(60, 20),
    FixedVec2::from_ints(120, 0),
    FixedVec2::from_ints(170, 30),
    FixedVec2::from_ints(150, 80),
    FixedVec2::from_ints(90, 100),
    FixedVec2::from_ints(30, 80),
    FixedVec2::from_ints(-20, 100),
    FixedVec2::from_ints(-50, 60),
    FixedVec2::from_ints(-30, 20),
];

const CATALOG: [CatalogEntry; 3] = [
    CatalogEntry {
        id: TrackId(1),
        name: "Harborside Oval",
        base_laps: 2,
        luck_mult: FIXED_ONE,
        waypoints: &OVAL_WAYPOINTS,
    },
    CatalogEntry {
        id: TrackId(2),
        name: "Hairpin Downs",
        base_laps: 1,
        luck_mult: to_fixed(0.8),
        waypoints: &HAIRPIN_WAYPOINTS,
    },
    CatalogEntry {
        id: TrackId(3),
        name: "Serpent Run",
        base_laps: 2,
        luck_mult: to_fixed(1.3),
        waypoints: &SERPENT_WAYPOINTS,
    },
];

/// The built-in course catalog.
///
/// Picks uniformly among courses not in the recent-use history, then
/// scales the descriptor's modifiers by round number: later rounds run
/// faster and drain harder.
pub struct TrackCatalog {
    rng: DeterministicRng,
    recent: Vec<TrackId>,
}

impl TrackCatalog {
    /// Create the catalog with a pick seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(seed),
            recent: Vec::new(),
        }
    }

    fn pick(&mut self) -> &'static CatalogEntry {
        let candidates: Vec<&'static CatalogEntry> = CATALOG
            .iter()
            .filter(|e| !self.recent.contains(&e.id))
            .collect();

        // History never covers the whole catalog, but guard anyway.
        let entry = if candidates.is_empty() {
            &CATALOG[self.rng.next_int(CATALOG.len() as u32) as usize]
        } else {
            candidates[self.rng.next_int(candidates.len() as u32) as usize]
        };

        self.recent.push(entry.id);
        while self.recent.len() > HISTORY_DEPTH {
            self.recent.remove(0);
        }

        entry
    }
}

impl TrackProvider for TrackCatalog {
    fn track_for_round(&mut self, round: u32) -> Option<TrackDescriptor> {
        let entry = self.pick();
        let past = round.saturating_sub(1).min(8) as i32;

        Some(TrackDescriptor {
            id: entry.id,
            name: entry.name.to_string(),
            laps: entry.base_laps,
            speed_mult: FIXED_ONE.wrapping_add(ROUND_SPEED_STEP.wrapping_mul(past)),
            fatigue_mult: FIXED_ONE.wrapping_add(ROUND_FATIGUE_STEP.wrapping_mul(past)),
            luck_mult: entry.luck_mult,
            course: Course::new(entry.waypoints.to_vec()),
        })
    }

    fn clear_history(&mut self) {
        self.recent.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn square_course() -> Course {
        Course::new(vec![
            FixedVec2::from_ints(0, 0),
            FixedVec2::from_ints(10, 0),
            FixedVec2::from_ints(10, 10),
            FixedVec2::from_ints(0, 10),
        ])
    }

    #[test]
    fn test_course_lap_length() {
        let course = square_course();
        // 4 sides of 10 units, sqrt is approximate
        let lap = course.lap_length();
        assert!((lap - to_fixed(40.0)).abs() < 1000, "lap ~40, got {}", lap);
    }

    #[test]
    fn test_course_position_at() {
        let course = square_course();

        // Distance 0 is the start line
        assert_eq!(course.position_at(0), course.start());

        // Distance 5 is halfway down the first side
        let p = course.position_at(to_fixed(5.0));
        assert!((p.x - to_fixed(5.0)).abs() < 1000);
        assert!(p.y.abs() < 1000);

        // A full lap wraps back to the start line
        let wrapped = course.position_at(course.lap_length());
        assert!(wrapped.distance_squared(course.start()) < 1000);
    }

    #[test]
    fn test_course_degenerate() {
        let empty = Course::new(vec![]);
        assert_eq!(empty.lap_length(), 0);
        assert_eq!(empty.position_at(to_fixed(5.0)), FixedVec2::ZERO);

        let single = Course::new(vec![FixedVec2::from_ints(3, 4)]);
        assert_eq!(single.position_at(to_fixed(100.0)), single.start());
    }

    #[test]
    fn test_descriptor_total_distance() {
        let entry_laps = 2;
        let course = square_course();
        let descriptor = TrackDescriptor {
            id: TrackId(9),
            name: "Test Square".to_string(),
            laps: entry_laps,
            speed_mult: FIXED_ONE,
            fatigue_mult: FIXED_ONE,
            luck_mult: FIXED_ONE,
            course: course.clone(),
        };
        assert_eq!(descriptor.total_distance(), course.lap_length() * 2);
    }

    #[test]
    fn test_catalog_no_immediate_repeat() {
        let mut catalog = TrackCatalog::new(99);
        let mut previous: Option<TrackId> = None;

        for round in 1..=20 {
            let track = catalog.track_for_round(round).unwrap();
            if let Some(prev) = previous {
                assert_ne!(track.id, prev, "same course twice in a row");
            }
            previous = Some(track.id);
        }
    }

    #[test]
    fn test_catalog_round_modifiers_scale() {
        let mut catalog = TrackCatalog::new(7);
        let r1 = catalog.track_for_round(1).unwrap();
        let r3 = catalog.track_for_round(3).unwrap();

        assert_eq!(r1.speed_mult, FIXED_ONE);
        assert_eq!(r1.fatigue_mult, FIXED_ONE);
        assert!(r3.speed_mult > r1.speed_mult);
        assert!(r3.fatigue_mult > r1.fatigue_mult);
    }

    #[test]
    fn test_catalog_clear_history() {
        let mut catalog = TrackCatalog::new(5);
        catalog.track_for_round(1);
        assert!(!catalog.recent.is_empty());
        catalog.clear_history();
        assert!(catalog.recent.is_empty());
    }
}
