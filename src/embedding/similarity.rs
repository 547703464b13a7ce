//! Angular similarity between two embedding vectors.
//!
//! ```text
//! cos        = dot(a, b) / (|a| * |b|), clamped to [-1, 1]
//! similarity = 1 - sin(acos(cos))
//! ```
//!
//! Identical directions score 1. The score falls as the angle grows and
//! reaches 0 at orthogonality; angles past 90 degrees also score 0.
//! Degenerate input (zero norm, NaN, infinities) scores 0 instead of raising
//! a domain error.

/// Cosine of the angle between `a` and `b`, clamped to [-1, 1].
///
/// Returns `None` for degenerate input. Extra trailing elements of the longer
/// slice are ignored; callers enforce equal lengths.
pub fn cosine(a: &[f32], b: &[f32]) -> Option<f64> {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    // sqrt of the product keeps cos(v, v) at exactly 1.0
    let denom = (na * nb).sqrt();
    if denom == 0.0 || !denom.is_finite() || !dot.is_finite() {
        return None;
    }
    Some((dot / denom).clamp(-1.0, 1.0))
}

/// Bounded fidelity score in [0, 1]; symmetric in its arguments.
pub fn similarity(a: &[f32], b: &[f32]) -> f64 {
    match cosine(a, b) {
        Some(cos) if cos > 0.0 => 1.0 - cos.acos().sin(),
        _ => 0.0,
    }
}
