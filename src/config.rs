//! # Configuration Module
//!
//! Run configuration shared by the `texshrink` binary and library callers.
//! `ShrinkConfig` is a plain struct: the CLI fills it from parsed arguments,
//! `validate()` checks it, and the `to_*` methods hand the engine and the
//! batch runner their typed settings.
//!
//! ## Parameters
//!
//! | Parameter       | Type            | Range          | Description                               |
//! |-----------------|-----------------|----------------|-------------------------------------------|
//! | `files`         | `Vec<PathBuf>`  | existing files | Individual textures                       |
//! | `directories`   | `Vec<PathBuf>`  | existing dirs  | Walked recursively                        |
//! | `output`        | `PathBuf`       | existing dir   | Root of the mirrored output tree          |
//! | `reduce_by`     | `Option<f64>`   | [0, 1)         | Accepted quality loss; `None` = dry run   |
//! | `min_dimension` | `u32`           | > 2            | Levels must stay strictly larger than this|
//! | `embedder`      | `EmbedderKind`  | thumbnail/http | Embedding backend                         |
//!
//! ## Reduction Amount
//!
//! `--reduceby` takes a fraction (`0.25`) or a percentage (`25%`). The engine
//! keeps halving while quality stays strictly above `1 - reduce_by`.
//!
//! ```rust
//! use texture_shrink::config::{ShrinkConfig, parse_reduce_by};
//!
//! let mut config = ShrinkConfig::default();
//! config.reduce_by = Some(parse_reduce_by("25%").unwrap());
//! assert!(config.validate().is_ok());
//! assert_eq!(config.min_quality(), Some(0.75));
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::embedding::{DEFAULT_THUMBNAIL_SIDE, HttpEmbeddingConfig};
use crate::engine::{EngineOptions, ReductionBounds};
use crate::error::{ShrinkError, ShrinkResult};

/// Which embedding backend scores candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedderKind {
    /// Local deterministic thumbnail features
    #[default]
    Thumbnail,
    /// Remote model server
    Http,
}

impl FromStr for EmbedderKind {
    type Err = ShrinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "thumbnail" | "local" => Ok(Self::Thumbnail),
            "http" | "remote" => Ok(Self::Http),
            _ => Err(ShrinkError::config(
                "embedder",
                s,
                "expected 'thumbnail' or 'http'",
            )),
        }
    }
}

/// Configuration for one batch run.
#[derive(Debug, Clone)]
pub struct ShrinkConfig {
    /// Individual texture files. Each is written to `output/<file name>`.
    pub files: Vec<PathBuf>,

    /// Directories walked recursively for supported textures. Relative paths
    /// below each directory are mirrored under `output`.
    pub directories: Vec<PathBuf>,

    /// Existing directory that receives reduced textures.
    pub output: PathBuf,

    /// Accepted quality loss in [0, 1). When `None` nothing is reduced.
    pub reduce_by: Option<f64>,

    /// Both axes of an accepted level must stay strictly above this.
    /// Must be greater than 2.
    pub min_dimension: u32,

    pub verbose: bool,

    /// Print the run summary as JSON instead of text.
    pub json: bool,

    pub embedder: EmbedderKind,

    /// Thumbnail side for the local embedder.
    pub thumbnail_side: u32,

    /// Endpoint for the HTTP embedder; required when `embedder` is `Http`.
    pub embed_url: Option<String>,

    pub embed_model: Option<String>,

    pub embed_timeout: Duration,

    /// Score the candidates of each level on the rayon pool.
    pub parallel: bool,

    /// External converter used for `.dds` textures.
    pub dds_tool: String,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            directories: Vec::new(),
            output: PathBuf::from("."),
            reduce_by: None,
            min_dimension: 32,
            verbose: false,
            json: false,
            embedder: EmbedderKind::default(),
            thumbnail_side: DEFAULT_THUMBNAIL_SIDE,
            embed_url: None,
            embed_model: None,
            embed_timeout: Duration::from_secs(30),
            parallel: false,
            dds_tool: "magick".to_string(),
        }
    }
}

impl ShrinkConfig {
    /// Creates a configuration for the given inputs with every other field at
    /// its default.
    pub fn new(
        files: Vec<PathBuf>,
        directories: Vec<PathBuf>,
        output: PathBuf,
        reduce_by: Option<f64>,
        min_dimension: u32,
    ) -> Self {
        Self {
            files,
            directories,
            output,
            reduce_by,
            min_dimension,
            ..Self::default()
        }
    }

    /// Checks ranges and that every referenced path exists.
    ///
    /// # Errors
    ///
    /// Returns `ShrinkError::Config` naming the first offending field.
    pub fn validate(&self) -> ShrinkResult<()> {
        if let Some(r) = self.reduce_by {
            if !(0.0..1.0).contains(&r) {
                return Err(ShrinkError::config(
                    "reduce_by",
                    r.to_string(),
                    "must be between 0.0 (inclusive) and 1.0 (exclusive)",
                ));
            }
        }

        if self.min_dimension <= 2 {
            return Err(ShrinkError::config(
                "min_dimension",
                self.min_dimension.to_string(),
                "must be greater than 2",
            ));
        }

        if !self.output.is_dir() {
            return Err(ShrinkError::config(
                "output",
                self.output.display().to_string(),
                "is not an existing directory",
            ));
        }

        if let Some(file) = self.files.iter().find(|f| !f.is_file()) {
            return Err(ShrinkError::config(
                "file",
                file.display().to_string(),
                "is not recognized as a file",
            ));
        }

        if let Some(dir) = self.directories.iter().find(|d| !d.is_dir()) {
            return Err(ShrinkError::config(
                "directory",
                dir.display().to_string(),
                "is not recognized as a directory",
            ));
        }

        if self.thumbnail_side < 2 {
            return Err(ShrinkError::config(
                "thumbnail_side",
                self.thumbnail_side.to_string(),
                "must be at least 2",
            ));
        }

        if self.embedder == EmbedderKind::Http && self.embed_url.is_none() {
            return Err(ShrinkError::config(
                "embed_url",
                "",
                "required when the http embedder is selected",
            )
            .with_recovery_suggestion("Pass --embed-url or use --embedder thumbnail"));
        }

        if self.embed_timeout.is_zero() {
            return Err(ShrinkError::config("embed_timeout", "0", "must be positive"));
        }

        Ok(())
    }

    /// `1 - reduce_by`, or `None` when no reduction was requested.
    pub fn min_quality(&self) -> Option<f64> {
        self.reduce_by.map(|r| 1.0 - r)
    }

    /// Engine bounds for a run, if a reduction was requested.
    pub fn to_bounds(&self) -> Option<ReductionBounds> {
        self.min_quality()
            .map(|q| ReductionBounds::square(self.min_dimension, q))
    }

    pub fn to_engine_options(&self) -> EngineOptions {
        EngineOptions {
            parallel_candidates: self.parallel,
        }
    }

    /// HTTP embedder settings, if an endpoint is configured.
    pub fn to_http_config(&self) -> Option<HttpEmbeddingConfig> {
        self.embed_url.as_ref().map(|url| HttpEmbeddingConfig {
            endpoint: url.clone(),
            model: self.embed_model.clone(),
            timeout: self.embed_timeout,
        })
    }
}

/// Parse `"0.25"` or `"25%"` into a fraction.
///
/// Range checking is left to [`ShrinkConfig::validate`].
pub fn parse_reduce_by(raw: &str) -> ShrinkResult<f64> {
    let raw = raw.trim();
    let (number, factor) = match raw.strip_suffix('%') {
        Some(number) => (number.trim(), 0.01),
        None => (raw, 1.0),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| ShrinkError::config("reduce_by", raw, "not a number or percentage"))?;
    Ok(value * factor)
}
