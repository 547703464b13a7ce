//! Common test utilities shared by the integration tests
//!
//! Mock embedding providers with call accounting, texture builders and a few
//! custom assertions.

#![allow(dead_code)]

/// Embedding providers that need no model and record how they are called
pub mod mock_providers {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use texture_shrink::embedding::{EmbeddingProvider, EmbeddingVector};
    use texture_shrink::error::{ShrinkError, ShrinkResult};
    use texture_shrink::texture::ImageBuffer;

    /// Candidate evaluations per level, mirrored here to keep scripts readable
    pub const PER_LEVEL: usize = 7;

    /// Unit vector whose similarity to `[1, 0]` is `quality`.
    ///
    /// similarity = 1 - sin(theta), so sin(theta) = 1 - quality.
    pub fn vector_for_quality(quality: f64) -> Vec<f32> {
        let sin = 1.0 - quality;
        let cos = (1.0 - sin * sin).sqrt();
        vec![cos as f32, sin as f32]
    }

    /// Returns `[1, 0]` on the first call (the original) and then one scripted
    /// similarity per call. Calls past the script score 0.
    ///
    /// Only meaningful with sequential candidate scoring.
    pub struct ScriptedProvider {
        scores: Vec<f64>,
        calls: AtomicUsize,
        sizes: Mutex<Vec<(u32, u32)>>,
    }

    impl ScriptedProvider {
        pub fn from_scores(scores: Vec<f64>) -> Self {
            Self {
                scores,
                calls: AtomicUsize::new(0),
                sizes: Mutex::new(Vec::new()),
            }
        }

        /// Every candidate of level `i` scores `levels[i]`.
        pub fn per_level(levels: &[f64]) -> Self {
            Self::from_scores(
                levels
                    .iter()
                    .flat_map(|&q| std::iter::repeat_n(q, PER_LEVEL))
                    .collect(),
            )
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Dimensions of every buffer that was embedded, in call order
        pub fn embedded_sizes(&self) -> Vec<(u32, u32)> {
            self.sizes.lock().unwrap().clone()
        }
    }

    impl EmbeddingProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn embed(&self, buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector> {
            self.sizes.lock().unwrap().push(buffer.dimensions());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                return Ok(EmbeddingVector::from(vec![1.0, 0.0]));
            }
            let quality = self.scores.get(call - 1).copied().unwrap_or(0.0);
            Ok(EmbeddingVector::from(vector_for_quality(quality)))
        }
    }

    /// Wraps another provider and counts calls.
    pub struct CountingProvider {
        inner: Arc<dyn EmbeddingProvider>,
        calls: AtomicUsize,
    }

    impl CountingProvider {
        pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EmbeddingProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn embed(&self, buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(buffer)
        }
    }

    /// Fails on call number `fail_at` (0-based); earlier calls return `[1, 1]`.
    pub struct FailingProvider {
        fail_at: usize,
        calls: AtomicUsize,
    }

    impl FailingProvider {
        pub fn new(fail_at: usize) -> Self {
            Self {
                fail_at,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn always() -> Self {
            Self::new(0)
        }
    }

    impl EmbeddingProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn embed(&self, _buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_at {
                return Err(ShrinkError::embedding("failing", "model unavailable"));
            }
            Ok(EmbeddingVector::from(vec![1.0, 1.0]))
        }
    }

    /// Emits a 2-element vector for the original and 3 elements afterwards.
    pub struct GrowingProvider {
        calls: AtomicUsize,
    }

    impl GrowingProvider {
        pub fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EmbeddingProvider for GrowingProvider {
        fn name(&self) -> &str {
            "growing"
        }

        fn embed(&self, _buffer: &ImageBuffer) -> ShrinkResult<EmbeddingVector> {
            let len = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 { 2 } else { 3 };
            Ok(EmbeddingVector::from(vec![1.0; len]))
        }
    }
}

/// Texture builders
pub mod test_textures {
    use std::path::Path;

    use texture_shrink::texture::ImageBuffer;

    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> ImageBuffer {
        ImageBuffer::filled(width, height, rgba).unwrap()
    }

    /// Black and white squares of `cell` pixels
    pub fn checkerboard(width: u32, height: u32, cell: u32) -> ImageBuffer {
        let mut px = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = if (x / cell + y / cell) % 2 == 0 { 0 } else { 255 };
                px.extend_from_slice(&[v, v, v, 255]);
            }
        }
        ImageBuffer::from_rgba(width, height, px).unwrap()
    }

    /// Red ramps along x, green along y
    pub fn gradient(width: u32, height: u32) -> ImageBuffer {
        let mut px = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width.max(1)) as u8;
                let g = (y * 255 / height.max(1)) as u8;
                px.extend_from_slice(&[r, g, 128, 255]);
            }
        }
        ImageBuffer::from_rgba(width, height, px).unwrap()
    }

    /// Deterministic xorshift noise with opaque alpha
    pub fn noise(width: u32, height: u32, seed: u32) -> ImageBuffer {
        let mut state = seed | 1;
        let mut px = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            px.extend_from_slice(&[r, g, b, 255]);
        }
        ImageBuffer::from_rgba(width, height, px).unwrap()
    }

    /// Write `buffer` as a PNG file
    pub fn write_png(buffer: &ImageBuffer, path: &Path) {
        image::RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.pixels().to_vec())
            .unwrap()
            .save(path)
            .unwrap();
    }
}

/// Custom assertions
pub mod assertions {
    use texture_shrink::texture::ImageBuffer;

    pub fn assert_dimensions(buffer: &ImageBuffer, expected: (u32, u32)) {
        assert_eq!(
            buffer.dimensions(),
            expected,
            "size mismatch: expected {}x{}, got {}x{}",
            expected.0,
            expected.1,
            buffer.width(),
            buffer.height()
        );
    }

    pub fn assert_same_pixels(left: &ImageBuffer, right: &ImageBuffer) {
        assert_eq!(left.dimensions(), right.dimensions());
        assert!(left.pixels() == right.pixels(), "pixel data differs");
    }

    pub fn assert_quality(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "quality {} differs from {}",
            actual,
            expected
        );
    }
}
