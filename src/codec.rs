//! # Texture Load/Save Adapters
//!
//! The reduction engine never touches files. Codecs convert between files on
//! disk and [`ImageBuffer`]s at the edges of a batch run, and remember enough
//! about the source to write the result back in a compatible form.
//!
//! ## Codecs
//!
//! | Codec               | Handles                                   | Backend            |
//! |---------------------|-------------------------------------------|--------------------|
//! | `ExternalToolCodec` | `.dds` containers                         | external converter |
//! | `ImageCrateCodec`   | every extension the `image` crate decodes | `image`            |
//!
//! [`CodecRegistry`] asks each codec in order and uses the first that
//! accepts the path.
//!
//! ## DDS Round Trip
//!
//! Compressed DDS textures are decoded by an external converter (ImageMagick
//! by default) into a PNG inside a scratch directory, and re-encoded the same
//! way with the compression probed at load time. If the converter is missing
//! or fails to decode, loading falls back to the `image` crate's DDS decoder
//! and the save settings default to DXT5 with 8 mipmaps.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use image::{ColorType, DynamicImage, ImageFormat, RgbaImage};

use crate::error::{ShrinkError, ShrinkResult};
use crate::texture::ImageBuffer;

/// Encoder settings carried from a DDS source to its replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsSettings {
    /// Block compression name as understood by the converter (`dxt1`, `dxt5`, …)
    pub compression: String,
    pub mipmaps: u32,
}

impl Default for DdsSettings {
    fn default() -> Self {
        Self {
            compression: "dxt5".to_string(),
            mipmaps: 8,
        }
    }
}

/// Container-specific information recorded at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerSettings {
    /// A format the `image` crate writes directly
    Plain,
    Dds(DdsSettings),
}

/// A decoded texture plus what is needed to save it back faithfully.
#[derive(Debug, Clone)]
pub struct LoadedTexture {
    pub buffer: ImageBuffer,
    /// Colour layout of the source file
    pub color_type: ColorType,
    pub container: ContainerSettings,
}

pub trait TextureCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// True if this codec reads and writes `path`.
    fn handles(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> ShrinkResult<LoadedTexture>;

    /// Write `buffer` to `path` using the settings recorded in `source`.
    fn save(&self, source: &LoadedTexture, buffer: &ImageBuffer, path: &Path) -> ShrinkResult<()>;
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(OsStr::to_str)
}

/// Codec for every format the `image` crate can decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCrateCodec {
    fn decode(path: &Path) -> ShrinkResult<(ImageBuffer, ColorType)> {
        let img = image::open(path)
            .map_err(|e| ShrinkError::codec(Some(path.display().to_string()), e))?;
        let color_type = img.color();
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let buffer = ImageBuffer::from_rgba(width, height, rgba.into_raw())
            .map_err(ShrinkError::recoverable)?;
        Ok((buffer, color_type))
    }

    fn encode(buffer: &ImageBuffer, color_type: ColorType, path: &Path) -> ShrinkResult<()> {
        let codec_err = |e| ShrinkError::codec(Some(path.display().to_string()), e);
        let format = ImageFormat::from_path(path).map_err(codec_err)?;
        let rgba = RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.pixels().to_vec())
            .ok_or_else(|| {
                ShrinkError::validation(
                    "pixels",
                    "does not match dimensions",
                    buffer.pixels().len().to_string(),
                )
            })?;
        restore_color(DynamicImage::ImageRgba8(rgba), color_type, format)
            .save_with_format(path, format)
            .map_err(codec_err)
    }
}

/// Convert the working RGBA8 image back to the source's colour layout.
///
/// JPEG has no alpha channel and is always written as RGB8. Sources wider
/// than 8 bits per channel are written as RGBA8.
fn restore_color(img: DynamicImage, color_type: ColorType, format: ImageFormat) -> DynamicImage {
    if format == ImageFormat::Jpeg {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }
    match color_type {
        ColorType::L8 => DynamicImage::ImageLuma8(img.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(img.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    }
}

impl TextureCodec for ImageCrateCodec {
    fn name(&self) -> &'static str {
        "image"
    }

    fn handles(&self, path: &Path) -> bool {
        extension(path)
            .and_then(ImageFormat::from_extension)
            .is_some_and(|format| format.reading_enabled())
    }

    fn load(&self, path: &Path) -> ShrinkResult<LoadedTexture> {
        let (buffer, color_type) = Self::decode(path)?;
        Ok(LoadedTexture {
            buffer,
            color_type,
            container: ContainerSettings::Plain,
        })
    }

    fn save(&self, source: &LoadedTexture, buffer: &ImageBuffer, path: &Path) -> ShrinkResult<()> {
        Self::encode(buffer, source.color_type, path)
    }
}

/// DDS codec that shells out to an external converter.
#[derive(Debug, Clone)]
pub struct ExternalToolCodec {
    program: String,
}

impl Default for ExternalToolCodec {
    fn default() -> Self {
        Self::new("magick")
    }
}

impl ExternalToolCodec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[&OsStr]) -> ShrinkResult<String> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                ShrinkError::tool(&self.program, None, e.to_string()).with_recovery_suggestion(
                    format!("Ensure '{}' is installed and on PATH", self.program),
                )
            })?;
        if !output.status.success() {
            return Err(ShrinkError::tool(
                &self.program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Block compression of `path` as reported by the converter.
    fn probe_compression(&self, path: &Path) -> Option<String> {
        let out = self
            .run(&[
                OsStr::new("identify"),
                OsStr::new("-format"),
                OsStr::new("%C"),
                path.as_os_str(),
            ])
            .ok()?;
        parse_compression(&out)
    }
}

/// Normalise the converter's compression name; `None` for unknown values.
pub fn parse_compression(raw: &str) -> Option<String> {
    let name = raw.trim().to_ascii_lowercase();
    match name.as_str() {
        "" | "none" | "undefined" => None,
        _ => Some(name),
    }
}

impl TextureCodec for ExternalToolCodec {
    fn name(&self) -> &'static str {
        "external-dds"
    }

    fn handles(&self, path: &Path) -> bool {
        extension(path).is_some_and(|ext| ext.eq_ignore_ascii_case("dds"))
    }

    fn load(&self, path: &Path) -> ShrinkResult<LoadedTexture> {
        let scratch =
            tempfile::tempdir().map_err(|e| ShrinkError::io("create scratch directory", e))?;
        let decoded = scratch.path().join("decoded.png");

        let (buffer, settings) = match self.run(&[path.as_os_str(), decoded.as_os_str()]) {
            Ok(_) => {
                let (buffer, _) = ImageCrateCodec::decode(&decoded)?;
                let settings = DdsSettings {
                    compression: self
                        .probe_compression(path)
                        .unwrap_or_else(|| DdsSettings::default().compression),
                    ..DdsSettings::default()
                };
                log::debug!(
                    "decoded {} with {} (compression {})",
                    path.display(),
                    self.program(),
                    settings.compression
                );
                (buffer, settings)
            }
            Err(e) => {
                log::warn!(
                    "{} could not decode {}: {}; using built-in decoder",
                    self.program(),
                    path.display(),
                    e
                );
                let (buffer, _) = ImageCrateCodec::decode(path)?;
                (buffer, DdsSettings::default())
            }
        };

        Ok(LoadedTexture {
            buffer,
            color_type: ColorType::Rgba8,
            container: ContainerSettings::Dds(settings),
        })
    }

    fn save(
        &self,
        source: &LoadedTexture,
        buffer: &ImageBuffer,
        path: &Path,
    ) -> ShrinkResult<()> {
        let settings = match &source.container {
            ContainerSettings::Dds(settings) => settings.clone(),
            ContainerSettings::Plain => DdsSettings::default(),
        };
        let scratch =
            tempfile::tempdir().map_err(|e| ShrinkError::io("create scratch directory", e))?;
        let staged = scratch.path().join("staged.png");
        ImageCrateCodec::encode(buffer, ColorType::Rgba8, &staged)?;

        let compression = format!("dds:compression={}", settings.compression);
        let mipmaps = format!("dds:mipmaps={}", settings.mipmaps);
        self.run(&[
            staged.as_os_str(),
            OsStr::new("-define"),
            OsStr::new(&compression),
            OsStr::new("-define"),
            OsStr::new(&mipmaps),
            OsStr::new("-define"),
            OsStr::new("dds:cluster-fit=false"),
            path.as_os_str(),
        ])?;
        log::debug!("encoded {} as {}", path.display(), settings.compression);
        Ok(())
    }
}

/// Ordered set of codecs; the first one that handles a path wins.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn TextureCodec>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_dds_tool("magick")
    }
}

impl CodecRegistry {
    pub fn new(codecs: Vec<Box<dyn TextureCodec>>) -> Self {
        Self { codecs }
    }

    /// External DDS codec using `program`, then the `image` crate.
    pub fn with_dds_tool(program: impl Into<String>) -> Self {
        Self::new(vec![
            Box::new(ExternalToolCodec::new(program)),
            Box::new(ImageCrateCodec),
        ])
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.codecs.iter().any(|c| c.handles(path))
    }

    pub fn for_path(&self, path: &Path) -> ShrinkResult<&dyn TextureCodec> {
        self.codecs
            .iter()
            .find(|c| c.handles(path))
            .map(|c| c.as_ref())
            .ok_or_else(|| {
                ShrinkError::validation(
                    "path",
                    "no codec handles this file type",
                    path.display().to_string(),
                )
                .recoverable()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Recoverable;
    use std::fs;

    fn gradient(w: u32, h: u32) -> ImageBuffer {
        let mut px = Vec::new();
        for y in 0..h {
            for x in 0..w {
                px.extend_from_slice(&[(x * 16) as u8, (y * 16) as u8, 90, 255]);
            }
        }
        ImageBuffer::from_rgba(w, h, px).unwrap()
    }

    #[test]
    fn registry_routes_by_extension() {
        let registry = CodecRegistry::default();
        assert_eq!(registry.for_path(Path::new("a/b.DDS")).unwrap().name(), "external-dds");
        assert_eq!(registry.for_path(Path::new("a/b.png")).unwrap().name(), "image");
        assert!(registry.is_supported(Path::new("x.jpg")));
        assert!(!registry.is_supported(Path::new("notes.txt")));
        assert!(!registry.is_supported(Path::new("no_extension")));
        let err = registry.for_path(Path::new("notes.txt")).err().unwrap();
        assert!(err.is_recoverable());
    }

    #[test]
    fn png_round_trip_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.png");
        let buffer = gradient(8, 4);
        let source = LoadedTexture {
            buffer: buffer.clone(),
            color_type: ColorType::Rgba8,
            container: ContainerSettings::Plain,
        };
        ImageCrateCodec.save(&source, &buffer, &path).unwrap();
        let loaded = ImageCrateCodec.load(&path).unwrap();
        assert_eq!(loaded.buffer.dimensions(), (8, 4));
        assert_eq!(loaded.buffer.pixels(), buffer.pixels());
        assert_eq!(loaded.color_type, ColorType::Rgba8);
    }

    #[test]
    fn grayscale_source_is_written_back_as_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(6, 6, image::Luma([120])).save(&path).unwrap();

        let loaded = ImageCrateCodec.load(&path).unwrap();
        assert_eq!(loaded.color_type, ColorType::L8);
        let half = loaded.buffer.resize(3, 3).unwrap();
        ImageCrateCodec.save(&loaded, &half, &path).unwrap();

        let reread = image::open(&path).unwrap();
        assert_eq!(reread.color(), ColorType::L8);
        assert_eq!((reread.width(), reread.height()), (3, 3));
    }

    #[test]
    fn jpeg_output_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tex.jpg");
        let buffer = gradient(8, 8);
        let source = LoadedTexture {
            buffer: buffer.clone(),
            color_type: ColorType::Rgba8,
            container: ContainerSettings::Plain,
        };
        ImageCrateCodec.save(&source, &buffer, &path).unwrap();
        assert_eq!(image::open(&path).unwrap().color(), ColorType::Rgb8);
    }

    #[test]
    fn missing_tool_is_reported() {
        let codec = ExternalToolCodec::new("definitely-not-a-converter-7f3a");
        let dir = tempfile::tempdir().unwrap();
        let buffer = gradient(4, 4);
        let source = LoadedTexture {
            buffer: buffer.clone(),
            color_type: ColorType::Rgba8,
            container: ContainerSettings::Dds(DdsSettings::default()),
        };
        match codec.save(&source, &buffer, &dir.path().join("out.dds")) {
            Err(ShrinkError::Tool { program, code, .. }) => {
                assert_eq!(program, "definitely-not-a-converter-7f3a");
                assert_eq!(code, None);
            }
            other => panic!("expected Tool error, got {:?}", other),
        }
    }

    #[test_log::test]
    fn load_falls_back_to_builtin_decoder_without_tool() {
        let codec = ExternalToolCodec::new("definitely-not-a-converter-7f3a");
        assert_eq!(codec.program(), "definitely-not-a-converter-7f3a");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.dds");
        fs::write(&path, b"not a dds").unwrap();

        let err = codec.load(&path).err().unwrap();
        assert!(matches!(err, ShrinkError::Codec { .. }), "{}", err);
        assert!(err.is_recoverable());
    }

    #[test]
    fn compression_names_are_normalised() {
        assert_eq!(parse_compression(" DXT1\n"), Some("dxt1".to_string()));
        assert_eq!(parse_compression("Undefined"), None);
        assert_eq!(parse_compression(""), None);
    }
}
