//! Fixed-Point 2D Vector
//!
//! Deterministic 2D points for course geometry: waypoints, segment
//! interpolation, and racer world positions. All arithmetic stays in
//! Q16.16.

use std::fmt;
use std::ops::{Add, Sub};
use serde::{Serialize, Deserialize};

use super::fixed::{Fixed, FIXED_ONE, FIXED_SCALE, fixed_mul, fixed_sqrt};

/// A 2D point or vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// The origin.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Build from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Build from whole-unit coordinates. Const, so waypoint tables can
    /// live in statics.
    #[inline]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self {
            x: x << FIXED_SCALE,
            y: y << FIXED_SCALE,
        }
    }

    /// Squared distance to another point. Prefer this for comparisons;
    /// it skips the sqrt.
    #[inline]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x.wrapping_sub(other.x);
        let dy = self.y.wrapping_sub(other.y);
        fixed_mul(dx, dx).wrapping_add(fixed_mul(dy, dy))
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Linear interpolation: t = 0 is self, t = FIXED_ONE is other.
    ///
    /// Segment interpolation is how a racer's world position is derived
    /// from its distance along the course.
    #[inline]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        let dx = other.x.wrapping_sub(self.x);
        let dy = other.y.wrapping_sub(self.y);
        Self {
            x: self.x.wrapping_add(fixed_mul(dx, t)),
            y: self.y.wrapping_add(fixed_mul(dy, t)),
        }
    }

    /// Float tuple for display only.
    #[inline]
    pub fn to_floats(self) -> (f32, f32) {
        (
            self.x as f32 / FIXED_ONE as f32,
            self.y as f32 / FIXED_ONE as f32,
        )
    }
}

impl Add for FixedVec2 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x.wrapping_add(rhs.x),
            y: self.y.wrapping_add(rhs.y),
        }
    }
}

impl Sub for FixedVec2 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x.wrapping_sub(rhs.x),
            y: self.y.wrapping_sub(rhs.y),
        }
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "Vec2({:.3}, {:.3})", fx, fy)
    }
}

impl fmt::Display for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fx, fy) = self.to_floats();
        write!(f, "({:.3}, {:.3})", fx, fy)
    }
}

// =============================================================================
// TESTS
// =============================================================================
