//! # Quality-Guided Reduction Engine
//!
//! Repeatedly halves a texture's resolution while an embedding-based fidelity
//! score stays above a threshold.
//!
//! ## Search
//!
//! Each level starts from the last committed buffer `A`:
//!
//! 1. `base   = sharpen(A, 1)` resized to `A / 2` (floor)
//! 2. `detail = detail(base, 1)`
//! 3. Score `base` and `blend(base, detail, a)` for every `a` in
//!    [`BLEND_STEPS`], each after resizing back to the original dimensions
//!    and comparing embeddings with the original.
//! 4. Keep the highest score; ties keep the earlier candidate.
//!
//! That is seven embedding evaluations per level. The original's embedding
//! is memoized on the original buffer and computed at most once per call.
//!
//! ## Trailing Acceptance
//!
//! The loop always holds one uncommitted candidate. A candidate is committed
//! only when the *next* pass begins, and a pass begins only while
//!
//! ```text
//! candidate_quality > min_quality
//!     && candidate.width  > min_width
//!     && candidate.height > min_height
//! ```
//!
//! so the first candidate that fails the bounds is discarded and the previous
//! commit is returned. If the original itself fails the bounds (already small
//! enough, or `min_quality >= 1`), no level is generated at all.
//!
//! ## Parallel Scoring
//!
//! With [`EngineOptions::parallel_candidates`] the seven scorings of a level
//! run on the rayon pool. Selection still walks the scores in candidate order
//! with a strict `>`, so both paths return the same buffer.

use std::sync::Arc;

use rayon::prelude::*;

use crate::embedding::{EmbeddingProvider, EmbeddingVector, similarity};
use crate::error::{ShrinkError, ShrinkResult};
use crate::texture::ImageBuffer;

/// Blend ratios toward the detail-enhanced variant, in tie-break order.
pub const BLEND_STEPS: [f32; 6] = [0.1, 0.25, 0.5, 0.75, 0.9, 1.0];

/// Embedding evaluations per generated level (baseline plus every ratio).
pub const EVALUATIONS_PER_LEVEL: usize = 1 + BLEND_STEPS.len();

/// Stop conditions for one `reduce` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReductionBounds {
    /// A level is kept only if its width is strictly greater than this
    pub min_width: u32,
    /// A level is kept only if its height is strictly greater than this
    pub min_height: u32,
    /// A level is kept only if its quality is strictly greater than this
    pub min_quality: f64,
}

impl ReductionBounds {
    pub fn new(min_width: u32, min_height: u32, min_quality: f64) -> Self {
        Self {
            min_width,
            min_height,
            min_quality,
        }
    }

    /// Same minimum for both axes.
    pub fn square(min_dimension: u32, min_quality: f64) -> Self {
        Self::new(min_dimension, min_dimension, min_quality)
    }

    pub fn validate(&self) -> ShrinkResult<()> {
        if self.min_width == 0 || self.min_height == 0 {
            return Err(ShrinkError::validation(
                "min_dimensions",
                "must be at least 1",
                format!("{}x{}", self.min_width, self.min_height),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_quality) {
            return Err(ShrinkError::validation(
                "min_quality",
                "must be within [0, 1]",
                self.min_quality.to_string(),
            ));
        }
        Ok(())
    }

    /// True when a level of this size and quality may be committed.
    pub fn admits(&self, buffer: &ImageBuffer, quality: f64) -> bool {
        quality > self.min_quality
            && buffer.width() > self.min_width
            && buffer.height() > self.min_height
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Score the candidates of a level concurrently
    pub parallel_candidates: bool,
}

/// Size and fidelity of a reduction outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionData {
    pub width: u32,
    pub height: u32,
    pub quality: f64,
}

/// One generated level, committed or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReport {
    pub width: u32,
    pub height: u32,
    pub quality: f64,
    /// Winning blend ratio; `None` when the unblended base won
    pub blend: Option<f32>,
    pub committed: bool,
}

#[derive(Debug, Clone)]
pub struct ReductionResult {
    /// The last committed level, or the original buffer itself
    pub buffer: ImageBuffer,
    pub data: ConversionData,
    /// Every generated level in order; only the last may be uncommitted
    pub levels: Vec<LevelReport>,
}

impl ReductionResult {
    /// False when the engine handed back `original` untouched.
    pub fn is_reduced(&self, original: &ImageBuffer) -> bool {
        !self.buffer.ptr_eq(original)
    }

    /// Number of embedding evaluations spent on candidates.
    pub fn candidate_evaluations(&self) -> usize {
        self.levels.len() * EVALUATIONS_PER_LEVEL
    }
}

struct Level {
    buffer: ImageBuffer,
    quality: f64,
    blend: Option<f32>,
}

/// Greedy halving search driven by an injected embedding provider.
pub struct ReductionEngine {
    provider: Arc<dyn EmbeddingProvider>,
    options: EngineOptions,
}

impl ReductionEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_options(provider, EngineOptions::default())
    }

    pub fn with_options(provider: Arc<dyn EmbeddingProvider>, options: EngineOptions) -> Self {
        Self { provider, options }
    }

    /// Reduce `original` as far as `bounds` allow.
    ///
    /// # Errors
    ///
    /// Invalid bounds are rejected before any work. Any embedding or transform
    /// failure aborts the call; no partial result is returned.
    pub fn reduce(
        &self,
        original: &ImageBuffer,
        bounds: ReductionBounds,
    ) -> ShrinkResult<ReductionResult> {
        bounds.validate()?;

        let mut accepted = original.clone();
        let mut accepted_quality = 1.0;
        let mut candidate = original.clone();
        let mut candidate_quality = 1.0;
        let mut levels: Vec<LevelReport> = Vec::new();

        while bounds.admits(&candidate, candidate_quality) {
            if let Some(last) = levels.last_mut() {
                last.committed = true;
            }
            accepted = candidate;
            accepted_quality = candidate_quality;

            let level = self.next_level(original, &accepted)?;
            log::debug!(
                "level {}x{} quality {:.4} (blend {})",
                level.buffer.width(),
                level.buffer.height(),
                level.quality,
                level.blend.map_or_else(|| "none".to_string(), |a| a.to_string())
            );
            levels.push(LevelReport {
                width: level.buffer.width(),
                height: level.buffer.height(),
                quality: level.quality,
                blend: level.blend,
                committed: false,
            });
            candidate = level.buffer;
            candidate_quality = level.quality;
        }

        if !levels.is_empty() {
            log::debug!(
                "discarded {}x{} at quality {:.4}",
                candidate.width(),
                candidate.height(),
                candidate_quality
            );
        }

        Ok(ReductionResult {
            data: ConversionData {
                width: accepted.width(),
                height: accepted.height(),
                quality: accepted_quality,
            },
            buffer: accepted,
            levels,
        })
    }

    /// Build and score every candidate for the level below `accepted`.
    fn next_level(&self, original: &ImageBuffer, accepted: &ImageBuffer) -> ShrinkResult<Level> {
        let base = accepted
            .sharpen_filter(1)?
            .resize(accepted.width() / 2, accepted.height() / 2)?;
        let detail = base.detail_filter(1)?;

        let mut candidates = Vec::with_capacity(EVALUATIONS_PER_LEVEL);
        candidates.push((base.clone(), None));
        for alpha in BLEND_STEPS {
            candidates.push((base.blend(&detail, alpha)?, Some(alpha)));
        }

        let reference = original.embedding(self.provider.as_ref())?;
        let scores: Vec<f64> = if self.options.parallel_candidates {
            candidates
                .par_iter()
                .map(|(buffer, _)| self.fidelity(original, reference, buffer))
                .collect::<ShrinkResult<Vec<f64>>>()?
        } else {
            candidates
                .iter()
                .map(|(buffer, _)| self.fidelity(original, reference, buffer))
                .collect::<ShrinkResult<Vec<f64>>>()?
        };

        let mut best = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = i;
            }
        }
        let (buffer, blend) = candidates.swap_remove(best);
        Ok(Level {
            buffer,
            quality: scores[best],
            blend,
        })
    }

    /// Similarity between `original` and `candidate` scaled back up to the
    /// original resolution.
    fn fidelity(
        &self,
        original: &ImageBuffer,
        reference: &EmbeddingVector,
        candidate: &ImageBuffer,
    ) -> ShrinkResult<f64> {
        let restored = candidate.resize(original.width(), original.height())?;
        let embedding = restored.embedding(self.provider.as_ref())?;
        if embedding.len() != reference.len() {
            return Err(ShrinkError::embedding(
                self.provider.name(),
                format!(
                    "embedding length changed from {} to {}",
                    reference.len(),
                    embedding.len()
                ),
            ));
        }
        Ok(similarity(reference, embedding))
    }
}

/// Reduce `buffer` with a one-off engine around `provider`.
pub fn reduce(
    provider: Arc<dyn EmbeddingProvider>,
    buffer: &ImageBuffer,
    min_width: u32,
    min_height: u32,
    min_quality: f64,
) -> ShrinkResult<ReductionResult> {
    ReductionEngine::new(provider).reduce(
        buffer,
        ReductionBounds::new(min_width, min_height, min_quality),
    )
}
