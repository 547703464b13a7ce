//! # Immutable RGBA8 Image Buffer
//!
//! [`ImageBuffer`] is a reference-counted handle over a tightly packed RGBA8
//! grid. Buffers never change after construction: every transform returns a
//! new buffer, or the receiver's own handle when the transform is the
//! identity. That identity return is observable through [`ImageBuffer::ptr_eq`]
//! and is what lets a memoized embedding survive no-op transforms.
//!
//! ## Identity Laws
//!
//! | Call                         | Returns              |
//! |------------------------------|----------------------|
//! | `resize(w, h)` at same size  | `Ok(self)`           |
//! | `sharpen_filter(0)`          | `Ok(self)`           |
//! | `detail_filter(0)`           | `Ok(self)`           |
//! | `blend(other, 0.0)`          | `Ok(self)`           |
//! | `blend(other, 1.0)`          | `Ok(other)`          |
//!
//! ## Embedding Cache
//!
//! Each buffer owns a `OnceLock` slot for its embedding. The first call to
//! [`ImageBuffer::embedding`] asks the provider; later calls (from any clone
//! of the handle) read the slot. No invalidation exists because pixels are
//! never written after construction.

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, OnceLock};

use fast_image_resize::Resizer;
use tex_scale::blend::lerp_rgba;
use tex_scale::cpu::{Size, resize_rgba_cpu};
use tex_scale::filter::{DETAIL, Kernel3x3, SHARPEN, convolve_3x3_rgba};

use crate::embedding::{EmbeddingProvider, EmbeddingVector};
use crate::error::{ShrinkError, ShrinkResult};

thread_local! {
    // One resizer per thread; rayon workers scoring candidates each get their own.
    static RESIZER: RefCell<Resizer> = RefCell::new(Resizer::new());
}

struct BufferInner {
    size: Size,
    pixels: Vec<u8>,
    embedding: OnceLock<EmbeddingVector>,
}

/// Immutable RGBA8 pixel grid with identity-preserving transforms.
#[derive(Clone)]
pub struct ImageBuffer {
    inner: Arc<BufferInner>,
}

impl ImageBuffer {
    /// Wrap tightly packed RGBA8 pixels.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either dimension is zero or if
    /// `pixels.len() != width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> ShrinkResult<Self> {
        let size = Size { w: width, h: height };
        if size.is_empty() {
            return Err(ShrinkError::validation(
                "dimensions",
                "width and height must be non-zero",
                format!("{}x{}", width, height),
            ));
        }
        if pixels.len() != size.rgba_len() {
            return Err(ShrinkError::validation(
                "pixels",
                format!("length must be {} for {}x{} RGBA8", size.rgba_len(), width, height),
                pixels.len().to_string(),
            ));
        }
        Ok(Self::from_parts(size, pixels))
    }

    /// A buffer where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> ShrinkResult<Self> {
        let pixels = rgba.repeat((width as usize) * (height as usize));
        Self::from_rgba(width, height, pixels)
    }

    fn from_parts(size: Size, pixels: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                size,
                pixels,
                embedding: OnceLock::new(),
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.inner.size.w
    }

    pub fn height(&self) -> u32 {
        self.inner.size.h
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.size.w, self.inner.size.h)
    }

    pub fn size(&self) -> Size {
        self.inner.size
    }

    /// Raw RGBA8 bytes, row-major, no padding.
    pub fn pixels(&self) -> &[u8] {
        &self.inner.pixels
    }

    /// Reference identity: true when both handles point at the same buffer.
    pub fn ptr_eq(&self, other: &ImageBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Bilinear resampling to `width`x`height`.
    ///
    /// Resizing to the current dimensions returns the same instance, keeping
    /// any cached embedding.
    pub fn resize(&self, width: u32, height: u32) -> ShrinkResult<ImageBuffer> {
        if (width, height) == self.dimensions() {
            return Ok(self.clone());
        }
        let dst_size = Size { w: width, h: height };
        if dst_size.is_empty() {
            return Err(ShrinkError::validation(
                "resize",
                "target dimensions must be non-zero",
                format!("{}x{}", width, height),
            ));
        }

        let mut dst = vec![0u8; dst_size.rgba_len()];
        RESIZER
            .with_borrow_mut(|resizer| {
                resize_rgba_cpu(resizer, self.pixels(), self.size(), &mut dst, dst_size)
            })
            .map_err(|e| {
                ShrinkError::scale("resize", e).with_context(format!(
                    "{}x{} -> {}x{}",
                    self.width(),
                    self.height(),
                    width,
                    height
                ))
            })?;
        Ok(Self::from_parts(dst_size, dst))
    }

    /// Apply the edge-sharpening kernel `repeat` times.
    pub fn sharpen_filter(&self, repeat: u32) -> ShrinkResult<ImageBuffer> {
        self.convolve_repeated(&SHARPEN, repeat)
    }

    /// Apply the detail-enhancing kernel `repeat` times.
    pub fn detail_filter(&self, repeat: u32) -> ShrinkResult<ImageBuffer> {
        self.convolve_repeated(&DETAIL, repeat)
    }

    fn convolve_repeated(&self, kernel: &Kernel3x3, repeat: u32) -> ShrinkResult<ImageBuffer> {
        if repeat == 0 {
            return Ok(self.clone());
        }
        let size = self.size();
        let mut src = self.pixels().to_vec();
        let mut dst = vec![0u8; src.len()];
        for _ in 0..repeat {
            convolve_3x3_rgba(&src, size, kernel, &mut dst)
                .map_err(|e| ShrinkError::scale("convolve", e))?;
            std::mem::swap(&mut src, &mut dst);
        }
        Ok(Self::from_parts(size, src))
    }

    /// Per-pixel `self * (1 - alpha) + other * alpha`.
    ///
    /// `alpha == 0` returns `self` and `alpha == 1` returns `other`, both as
    /// the same instances.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` when the operands differ in width or height, and a
    /// validation error when `alpha` is outside [0, 1].
    pub fn blend(&self, other: &ImageBuffer, alpha: f32) -> ShrinkResult<ImageBuffer> {
        if self.dimensions() != other.dimensions() {
            return Err(ShrinkError::dimension_mismatch(
                "blend",
                self.dimensions(),
                other.dimensions(),
            ));
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ShrinkError::validation(
                "alpha",
                "must be within [0, 1]",
                alpha.to_string(),
            ));
        }
        if alpha == 0.0 {
            return Ok(self.clone());
        }
        if alpha == 1.0 {
            return Ok(other.clone());
        }

        let mut dst = vec![0u8; self.pixels().len()];
        lerp_rgba(self.pixels(), other.pixels(), alpha, &mut dst)
            .map_err(|e| ShrinkError::scale("blend", e))?;
        Ok(Self::from_parts(self.size(), dst))
    }

    /// Embedding of this buffer, computed by `provider` on first use and
    /// memoized for the lifetime of the buffer.
    pub fn embedding(&self, provider: &dyn EmbeddingProvider) -> ShrinkResult<&EmbeddingVector> {
        if let Some(cached) = self.inner.embedding.get() {
            return Ok(cached);
        }
        let computed = provider.embed(self)?;
        Ok(self.inner.embedding.get_or_init(|| computed))
    }

    /// The memoized embedding, if one has been computed.
    pub fn cached_embedding(&self) -> Option<&EmbeddingVector> {
        self.inner.embedding.get()
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("embedded", &self.cached_embedding().is_some())
            .finish()
    }
}
