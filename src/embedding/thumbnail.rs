//! Deterministic local embedding built from a small thumbnail.
//!
//! The vector is `[1.0, luminance cells…, |laplacian| cells…]`: a bias term so
//! that all-black textures still have a direction, the luminance of every
//! thumbnail cell, and the absolute Laplacian response of every cell. The
//! Laplacian half makes sharpening and detail enhancement visible to the
//! scorer, which a luminance-only vector would mostly ignore.

use crate::embedding::{EmbeddingProvider, EmbeddingVector};
use crate::error::{ShrinkError, ShrinkResult};
use crate::texture::ImageBuffer;

pub const DEFAULT_THUMBNAIL_SIDE: u32 = 16;

#[derive(Debug, Clone)]
pub struct ThumbnailProvider {
    side: u32,
}

impl Default for ThumbnailProvider {
    fn default() -> Self {
        Self {
            side: DEFAULT_THUMBNAIL_SIDE,
        }
    }
}

impl ThumbnailProvider {
    /// # Errors
    ///
    /// Returns a validation error for `side < 2`.
    pub fn new(side: u32) -> ShrinkResult<Self> {
        if side < 2 {
            return Err(ShrinkError::validation(
                "thumbnail_side",
                "must be at least 2",
                side.to_string(),
            ));
        }
        Ok(Self { side })
    }

    /// Length of every vector this provider emits.
    pub fn dimension(&self) -> usize {
        1 + 2 * (self.side as usize).pow(2)
    }
}

impl EmbeddingProvider for ThumbnailProvider {
    fn name(&self) -> &str {
        "thumbnail"
    }

    fn embed(&self, buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector> {
        let thumb = buffer.resize(self.side, self.side).map_err(|e| {
            ShrinkError::embedding_source("thumbnail", "could not build thumbnail", e)
        })?;

        let n = self.side as usize;
        let luma: Vec<f32> = thumb
            .pixels()
            .chunks_exact(4)
            .map(|p| (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) / 255.0)
            .collect();

        let at = |x: usize, y: usize| luma[y * n + x];
        let mut features = Vec::with_capacity(self.dimension());
        features.push(1.0);
        features.extend_from_slice(&luma);
        for y in 0..n {
            for x in 0..n {
                let c = at(x, y);
                let l = at(x.saturating_sub(1), y);
                let r = at((x + 1).min(n - 1), y);
                let u = at(x, y.saturating_sub(1));
                let d = at(x, (y + 1).min(n - 1));
                features.push((4.0 * c - l - r - u - d).abs());
            }
        }
        Ok(EmbeddingVector::from(features))
    }
}
