//! Core deterministic primitives.
//!
//! All types in this module are designed for perfect cross-platform
//! determinism: no floats in simulation paths, all randomness seeded.
//! The race engine and the track geometry are built entirely on top of
//! these three modules.

pub mod fixed;
pub mod vec2;
pub mod rng;
