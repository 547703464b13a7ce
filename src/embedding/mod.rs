//! # Embedding Module
//!
//! Perceptual fidelity is judged by comparing learned embedding vectors rather
//! than pixels. This module defines the injected capability that produces
//! those vectors and the scorer that compares them.
//!
//! ## Key Components
//!
//! - [`EmbeddingProvider`]: the capability the reduction engine consumes
//! - [`similarity`]: angular fidelity score in [0, 1]
//! - [`thumbnail::ThumbnailProvider`]: deterministic local provider
//! - [`http::HttpEmbeddingProvider`]: provider backed by a model server
//!
//! ## Provider Contract
//!
//! `embed` must be deterministic for a given buffer's content and free of
//! side effects visible to the engine; the engine memoizes results per buffer
//! and treats every call as expensive.

pub mod http;
pub mod similarity;
pub mod thumbnail;

use std::ops::Deref;
use std::sync::Arc;

use crate::error::ShrinkResult;
use crate::texture::ImageBuffer;

pub use http::{HttpEmbeddingConfig, HttpEmbeddingProvider};
pub use similarity::similarity;
pub use thumbnail::{DEFAULT_THUMBNAIL_SIDE, ThumbnailProvider};

/// Fixed-length perceptual feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Arc<[f32]>);

impl EmbeddingVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values.into())
    }
}

impl Deref for EmbeddingVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// Maps an image buffer to its embedding vector.
///
/// Implementations report failures as `ShrinkError::EmbeddingFailure`.
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Compute the embedding of `buffer`.
    fn embed(&self, buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn embed(&self, buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector> {
        (**self).embed(buffer)
    }
}
