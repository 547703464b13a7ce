// SPDX-License-Identifier: MIT
// Per-channel linear interpolation between two equally sized RGBA8 images.

use crate::cpu::{ensure_len, ScaleError};

/// Write `round(a * (1 - alpha) + b * alpha)` for every byte into `dst`.
///
/// `a` and `b` must have the same length; `alpha` is clamped to [0, 1].
pub fn lerp_rgba(a: &[u8], b: &[u8], alpha: f32, dst: &mut [u8]) -> Result<(), ScaleError> {
    if a.len() != b.len() {
        return Err(ScaleError::LengthMismatch { left: a.len(), right: b.len() });
    }
    ensure_len(dst, a.len())?;

    let t = alpha.clamp(0.0, 1.0);
    for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
        let x = x as f32;
        let v = x + (y as f32 - x) * t;
        *d = v.round().clamp(0.0, 255.0) as u8;
    }
    Ok(())
}
