//! # Texture Shrink Library
//!
//! Quality-guided iterative downscaling of textures. Each texture is halved
//! repeatedly while a perceptual fidelity score, computed from learned image
//! embeddings, stays above a threshold.
//!
//! ## Architecture
//!
//! - `texture`: immutable RGBA8 [`ImageBuffer`] with resize, enhancement
//!   filters, blending and a memoized embedding slot
//! - `embedding`: the [`EmbeddingProvider`] capability, shipped providers and
//!   the [`similarity`](embedding::similarity) scorer
//! - `engine`: the trailing-acceptance [`ReductionEngine`]
//! - `codec`: file load/save adapters, including `.dds` via an external tool
//! - `batch`: directory walking, per-item processing and run statistics
//! - `config`: validated run configuration
//! - `error`: [`ShrinkError`] and its classification traits
//!
//! The pixel kernels live in the `tex-scale` workspace crate.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use texture_shrink::{EmbeddingProvider, ImageBuffer, ThumbnailProvider, reduce};
//!
//! # fn main() -> Result<(), texture_shrink::ShrinkError> {
//! let provider: Arc<dyn EmbeddingProvider> = Arc::new(ThumbnailProvider::default());
//! let texture = ImageBuffer::filled(64, 64, [90, 120, 200, 255])?;
//!
//! let result = reduce(provider, &texture, 8, 8, 0.5)?;
//! assert!(result.data.width < 64);
//! assert!(result.is_reduced(&texture));
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod texture;

pub use batch::{BatchItem, BatchRunner, BatchSummary};
pub use codec::{CodecRegistry, TextureCodec};
pub use config::ShrinkConfig;
pub use embedding::{
    EmbeddingProvider, EmbeddingVector, HttpEmbeddingProvider, ThumbnailProvider, similarity,
};
pub use engine::{
    ConversionData, EngineOptions, ReductionBounds, ReductionEngine, ReductionResult, reduce,
};
pub use error::{
    ErrorSeverity, HasRecoverySuggestion, HasSeverity, Recoverable, ShrinkError, ShrinkResult,
};
pub use texture::ImageBuffer;
