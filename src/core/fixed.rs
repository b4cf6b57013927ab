//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic math for the race simulation: an i32 with 16 integer
//! bits and 16 fractional bits. No floats ever touch game logic, so a
//! seeded race produces the same finish order on every platform.
//!
//! Range is roughly -32768.0 to +32767.99998 at a precision of
//! 1/65536, which comfortably covers course lengths (hundreds of
//! units times a handful of laps) and the sub-unit pace multipliers
//! the engine works with.

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

// =============================================================================
// RACE TUNING CONSTANTS (integer literals, no runtime float conversion)
// =============================================================================

/// Tick duration: 1/60 second = round(65536/60) = 1092
pub const TICK_DT: Fixed = 1092;

/// Pace floor for a fully drained racer: 0.45 = 29491
///
/// Fatigue can never slow a racer below this fraction of base pace,
/// so every race terminates.
pub const FATIGUE_FLOOR: Fixed = 29491;

/// Default luck jitter amplitude: 0.15 = 9830
///
/// A racer with luck 1.0 on a neutral course swings at most +/-15%
/// of its current pace per tick.
pub const DEFAULT_LUCK_AMPLITUDE: Fixed = 9830;

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// For constants and initialization only, never inside the tick loop.
///
/// # Example
/// ```
/// use derby_core::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float, for display only. The result must
/// never feed back into game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Fixed-point multiply, widening through i64 so intermediates cannot
/// overflow. Truncates toward zero.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Fixed-point divide. The numerator is pre-shifted to keep precision.
/// Divide-by-zero returns 0 rather than panicking; a deterministic
/// wrong answer beats a platform-dependent abort in the tick loop.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0;
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root via Newton-Raphson, exactly 6 iterations so every
/// platform converges identically. Non-positive input returns 0.
///
/// Course segment lengths are the only sqrt consumer; comparisons
/// should use squared distances instead.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }

    let mut guess = (x >> 1).max(1);

    for _ in 0..6 {
        let div = fixed_div(x, guess);
        guess = (guess.wrapping_add(div)) >> 1;

        // Keep the next division well-defined
        if guess == 0 {
            guess = 1;
        }
    }

    guess
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Clamp a fixed-point number to a range.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    fixed_max(min, fixed_min(max, value))
}

// =============================================================================
// TESTS
// =============================================================================
