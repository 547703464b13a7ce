// SPDX-License-Identifier: MIT
// Bilinear RGBA8 resampling for texture halving and restore-to-original
// scoring. Writes straight into the caller's destination slice.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{FilterType, ResizeAlg, ResizeOptions, Resizer};

/// Width and height of an image in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    /// Byte length of a tightly packed RGBA8 image of this size.
    pub fn rgba_len(self) -> usize {
        (self.w as usize) * (self.h as usize) * 4
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

#[derive(Debug)]
pub enum ScaleError {
    BufferTooSmall { needed: usize, got: usize },
    ZeroSize,
    LengthMismatch { left: usize, right: usize },
    Fir(fir::ResizeError),
    ImageBuf(fir::ImageBufferError),
}

impl From<fir::ResizeError> for ScaleError { fn from(e: fir::ResizeError) -> Self { Self::Fir(e) } }
impl From<fir::ImageBufferError> for ScaleError { fn from(e: fir::ImageBufferError) -> Self { Self::ImageBuf(e) } }

impl std::fmt::Display for ScaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleError::BufferTooSmall { needed, got } => {
                write!(f, "Buffer too small: need {} bytes, got {}", needed, got)
            }
            ScaleError::ZeroSize => write!(f, "Image dimensions must be non-zero"),
            ScaleError::LengthMismatch { left, right } => {
                write!(f, "Operand lengths differ: {} vs {} bytes", left, right)
            }
            ScaleError::Fir(e) => write!(f, "Fast image resize error: {}", e),
            ScaleError::ImageBuf(e) => write!(f, "Image buffer error: {}", e),
        }
    }
}

impl std::error::Error for ScaleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaleError::Fir(e) => Some(e),
            ScaleError::ImageBuf(e) => Some(e),
            _ => None,
        }
    }
}

pub(crate) fn ensure_len(buf: &[u8], needed: usize) -> Result<(), ScaleError> {
    if buf.len() < needed {
        return Err(ScaleError::BufferTooSmall { needed, got: buf.len() });
    }
    Ok(())
}

/// Bilinear resampling of a tightly packed RGBA8 image.
///
/// `dst` must hold at least `dst_size.rgba_len()` bytes. Alpha is treated as
/// an ordinary channel (no premultiplication), so uniform images stay uniform.
pub fn resize_rgba_cpu(
    resizer: &mut Resizer,
    src: &[u8],
    src_size: Size,
    dst: &mut [u8],
    dst_size: Size,
) -> Result<(), ScaleError> {
    if src_size.is_empty() || dst_size.is_empty() {
        return Err(ScaleError::ZeroSize);
    }
    let src_len = src_size.rgba_len();
    let dst_len = dst_size.rgba_len();
    ensure_len(src, src_len)?;
    ensure_len(dst, dst_len)?;

    let src_view = TypedImageRef::<U8x4>::from_buffer(src_size.w, src_size.h, &src[..src_len])?;
    let mut dst_image = TypedImage::<U8x4>::from_buffer(dst_size.w, dst_size.h, &mut dst[..dst_len])?;

    let opts = ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
        .use_alpha(false);
    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;

    Ok(())
}
