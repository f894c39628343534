//! Portable vector primitives used by the distance engine.
//!
//! These run once per query per centroid (table build), not once per
//! database vector, so portable scalar code is sufficient; the per-vector
//! hot path in [`crate::adc`] is pure table lookups.

/// Dot product of two vectors.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm of a vector.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Squared L2 (Euclidean) distance between two vectors.
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
