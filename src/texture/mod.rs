//! # Texture Module
//!
//! The immutable pixel buffer every other part of the crate operates on.

pub mod buffer;

pub use buffer::ImageBuffer;
