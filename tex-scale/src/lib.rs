// SPDX-License-Identifier: MIT
//! # tex-scale: Pixel Kernels for Texture Reduction
//!
//! Low-level RGBA8 operations used by the texture reduction engine. Every
//! function works on tightly packed byte slices and writes into a
//! caller-provided destination, so the owner of the pixels decides when to
//! allocate.
//!
//! ## Key Components
//!
//! - [`cpu`]: bilinear resampling on top of `fast_image_resize`
//! - [`filter`]: fixed 3x3 convolution kernels (sharpen, detail)
//! - [`blend`]: per-channel linear interpolation between two images
//!
//! ## Usage Example
//!
//! ```rust
//! use tex_scale::cpu::{resize_rgba_cpu, Size};
//! use tex_scale::filter::{convolve_3x3_rgba, SHARPEN};
//!
//! let src = vec![128u8; 8 * 8 * 4];
//! let mut sharpened = vec![0u8; src.len()];
//! convolve_3x3_rgba(&src, Size { w: 8, h: 8 }, &SHARPEN, &mut sharpened).unwrap();
//!
//! let mut resizer = fast_image_resize::Resizer::new();
//! let mut half = vec![0u8; 4 * 4 * 4];
//! resize_rgba_cpu(&mut resizer, &sharpened, Size { w: 8, h: 8 }, &mut half, Size { w: 4, h: 4 }).unwrap();
//! assert!(half.iter().all(|&v| v == 128));
//! ```
//!
//! ## Future Optimizations
//!
//! TODO: Vectorize `convolve_3x3_rgba`; it is the hottest loop after resampling.

pub mod blend;
pub mod cpu;
pub mod filter;

pub use cpu::{ScaleError, Size};
