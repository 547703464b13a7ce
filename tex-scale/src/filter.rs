// SPDX-License-Identifier: MIT
//! # Fixed 3x3 Enhancement Kernels
//!
//! Two integer kernels drive candidate generation during reduction:
//!
//! | Kernel    | Weights                              | Scale |
//! |-----------|--------------------------------------|-------|
//! | `SHARPEN` | `-2 -2 -2 / -2 32 -2 / -2 -2 -2`     | 16    |
//! | `DETAIL`  | ` 0 -1  0 / -1 10 -1 /  0 -1  0`     | 6     |
//!
//! Both kernels sum to their scale, so flat regions pass through unchanged.
//! The outermost ring of pixels is copied as-is, and alpha is never filtered.

use crate::cpu::{ensure_len, ScaleError, Size};

/// A 3x3 integer convolution kernel, row-major.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Kernel3x3 {
    pub weights: [i32; 9],
    pub scale: i32,
    pub offset: i32,
}

/// Edge-sharpening kernel.
pub const SHARPEN: Kernel3x3 = Kernel3x3 {
    weights: [-2, -2, -2, -2, 32, -2, -2, -2, -2],
    scale: 16,
    offset: 0,
};

/// Detail-enhancing kernel (milder, cross-shaped).
pub const DETAIL: Kernel3x3 = Kernel3x3 {
    weights: [0, -1, 0, -1, 10, -1, 0, -1, 0],
    scale: 6,
    offset: 0,
};

/// Convolve the colour channels of a tightly packed RGBA8 image.
///
/// Alpha is copied through unfiltered, so where alpha varies the result
/// differs from a filter that convolves every band including alpha.
///
/// Images smaller than 3 pixels on either axis have no interior and are
/// copied unchanged.
pub fn convolve_3x3_rgba(
    src: &[u8],
    size: Size,
    kernel: &Kernel3x3,
    dst: &mut [u8],
) -> Result<(), ScaleError> {
    if size.is_empty() {
        return Err(ScaleError::ZeroSize);
    }
    let len = size.rgba_len();
    ensure_len(src, len)?;
    ensure_len(dst, len)?;

    dst[..len].copy_from_slice(&src[..len]);
    if size.w < 3 || size.h < 3 {
        return Ok(());
    }

    let w = size.w as usize;
    let h = size.h as usize;
    let pitch = w * 4;
    let scale = kernel.scale as f32;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let out = y * pitch + x * 4;
            for c in 0..3 {
                let mut sum = 0i32;
                for ky in 0..3 {
                    let row = (y + ky - 1) * pitch;
                    for kx in 0..3 {
                        let v = src[row + (x + kx - 1) * 4 + c] as i32;
                        sum += v * kernel.weights[ky * 3 + kx];
                    }
                }
                let v = (sum as f32 / scale).round() as i32 + kernel.offset;
                dst[out + c] = v.clamp(0, 255) as u8;
            }
        }
    }
    Ok(())
}
