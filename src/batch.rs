//! # Batch Driver
//!
//! Walks the configured inputs, reduces each texture and mirrors the reduced
//! ones into the output directory.
//!
//! ## Item Flow
//!
//! ```text
//! BatchItem ──► codec.load ──► engine.reduce ──┬─► reduced:   mkdir -p + codec.save
//!                                              └─► unchanged: skip
//! ```
//!
//! A recoverable failure is logged at its error's severity and the item is
//! skipped. A fatal or unrecoverable one (bad configuration, a broken
//! invariant) stops the batch and is returned to the caller.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use crate::codec::CodecRegistry;
use crate::engine::{ReductionBounds, ReductionEngine};
use crate::error::{
    HasRecoverySuggestion, HasSeverity, Recoverable, RecoveryStrategy, ShrinkError, ShrinkResult,
    classify,
};

/// One texture to process, remembered relative to the root it was found
/// under so the output tree mirrors the input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub root: PathBuf,
    pub relative: PathBuf,
}

impl BatchItem {
    /// Item for a single file; its output lands directly in the output root.
    pub fn from_file(path: &Path) -> ShrinkResult<Self> {
        let relative = path.file_name().map(PathBuf::from).ok_or_else(|| {
            ShrinkError::validation("file", "has no file name", path.display().to_string())
        })?;
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Self { root, relative })
    }

    pub fn source(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    pub fn destination(&self, output: &Path) -> PathBuf {
        output.join(&self.relative)
    }
}

/// Every supported texture below `dir`, sorted for a stable run order.
pub fn list_supported_images(dir: &Path, registry: &CodecRegistry) -> ShrinkResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries =
            fs::read_dir(&current).map_err(|e| ShrinkError::io_at("read directory", &current, e))?;
        for entry in entries {
            let path = entry
                .map_err(|e| ShrinkError::io_at("read directory entry", &current, e))?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if registry.is_supported(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Expand files and directories into batch items, files first.
pub fn collect_items(
    files: &[PathBuf],
    directories: &[PathBuf],
    registry: &CodecRegistry,
) -> ShrinkResult<Vec<BatchItem>> {
    let mut items = files
        .iter()
        .map(|f| BatchItem::from_file(f))
        .collect::<ShrinkResult<Vec<_>>>()?;

    for dir in directories {
        for path in list_supported_images(dir, registry)? {
            let relative = path
                .strip_prefix(dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));
            items.push(BatchItem {
                root: dir.clone(),
                relative,
            });
        }
    }
    Ok(items)
}

/// What happened to one successfully processed item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub source: PathBuf,
    /// Where the reduced texture was written; `None` if it could not be reduced
    pub destination: Option<PathBuf>,
    pub original: (u32, u32),
    pub reduced: (u32, u32),
    pub quality: f64,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub processed: usize,
    pub modified: usize,
    pub failed: usize,
    pub original_pixels: u64,
    pub reduced_pixels: u64,
    pub quality_sum: f64,
    pub min_quality: f64,
}

impl Default for BatchSummary {
    fn default() -> Self {
        Self {
            processed: 0,
            modified: 0,
            failed: 0,
            original_pixels: 0,
            reduced_pixels: 0,
            quality_sum: 0.0,
            min_quality: 1.0,
        }
    }
}

impl BatchSummary {
    pub fn record(&mut self, report: &ItemReport) {
        self.original_pixels += u64::from(report.original.0) * u64::from(report.original.1);
        self.reduced_pixels += u64::from(report.reduced.0) * u64::from(report.reduced.1);
        self.quality_sum += report.quality;
        self.min_quality = self.min_quality.min(report.quality);
        if report.destination.is_some() {
            self.modified += 1;
        }
    }

    /// Items that went through the engine without error.
    pub fn completed(&self) -> usize {
        self.processed - self.failed
    }

    /// Share of pixels removed, in percent.
    pub fn memory_reduction_percent(&self) -> f64 {
        if self.original_pixels == 0 {
            return 0.0;
        }
        (1.0 - self.reduced_pixels as f64 / self.original_pixels as f64) * 100.0
    }

    pub fn average_quality(&self) -> Option<f64> {
        match self.completed() {
            0 => None,
            n => Some(self.quality_sum / n as f64),
        }
    }

    /// Average quality kept per unit of remaining pixels.
    pub fn win_ratio(&self) -> Option<f64> {
        if self.reduced_pixels == 0 {
            return None;
        }
        let kept = self.reduced_pixels as f64 / self.original_pixels as f64;
        self.average_quality().map(|q| q / kept)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "processed": self.processed,
            "modified": self.modified,
            "failed": self.failed,
            "original_pixels": self.original_pixels,
            "reduced_pixels": self.reduced_pixels,
            "memory_reduction_percent": self.memory_reduction_percent(),
            "average_quality": self.average_quality(),
            "min_quality": self.min_quality,
            "win_ratio": self.win_ratio(),
        })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total memory reduced by {:.2}%", self.memory_reduction_percent())?;
        writeln!(f, "Modified {} image files", self.modified)?;
        if self.failed > 0 {
            writeln!(f, "Failed to process {} image files", self.failed)?;
        }
        if let Some(avg) = self.average_quality() {
            writeln!(f, "On average keeping {:.2}% quality", avg * 100.0)?;
            writeln!(f, "Minimum accepted quality was {:.2}%", self.min_quality * 100.0)?;
        }
        if let Some(ratio) = self.win_ratio() {
            writeln!(f, "Our win ratio is {:.2}/1.0!", ratio)?;
        }
        Ok(())
    }
}

/// Runs the engine over a list of items and writes the results.
pub struct BatchRunner {
    engine: ReductionEngine,
    registry: CodecRegistry,
    output: PathBuf,
    bounds: ReductionBounds,
}

impl BatchRunner {
    pub fn new(
        engine: ReductionEngine,
        registry: CodecRegistry,
        output: impl Into<PathBuf>,
        bounds: ReductionBounds,
    ) -> Self {
        Self {
            engine,
            registry,
            output: output.into(),
            bounds,
        }
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Load, reduce and, if reduced, save one item.
    pub fn process(&self, item: &BatchItem) -> ShrinkResult<ItemReport> {
        let source = item.source();
        let codec = self.registry.for_path(&source)?;
        let loaded = codec.load(&source)?;
        let original = loaded.buffer.dimensions();

        let result = self
            .engine
            .reduce(&loaded.buffer, self.bounds)
            .map_err(|e| e.with_context(source.display().to_string()))?;

        let destination = if result.is_reduced(&loaded.buffer) {
            let destination = item.destination(&self.output);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| ShrinkError::io_at("create output directory", parent, e))?;
            }
            codec.save(&loaded, &result.buffer, &destination)?;
            log::debug!(
                "    Reduced from {}x{} to {}x{} while keeping {:.2}% quality",
                original.0,
                original.1,
                result.data.width,
                result.data.height,
                result.data.quality * 100.0
            );
            Some(destination)
        } else {
            log::debug!("    Can't reduce, skipping.");
            None
        };

        Ok(ItemReport {
            source,
            destination,
            original,
            reduced: (result.data.width, result.data.height),
            quality: result.data.quality,
        })
    }

    /// Process every item.
    ///
    /// Recoverable failures are logged and counted. The first fatal or
    /// unrecoverable failure ends the run and is returned.
    pub fn run(&self, items: &[BatchItem]) -> ShrinkResult<BatchSummary> {
        let mut summary = BatchSummary::default();
        for (i, item) in items.iter().enumerate() {
            summary.processed += 1;
            log::debug!(
                "Handling image {}/{} {}",
                i + 1,
                items.len(),
                item.source().display()
            );
            match self.process(item) {
                Ok(report) => summary.record(&report),
                Err(e) if classify::is_fatal(&e) || !e.is_recoverable() => {
                    log::error!("Aborting batch at {}: {}", item.relative.display(), e);
                    for strategy in e.recovery_strategies() {
                        if let RecoveryStrategy::Reconfigure { field } = strategy {
                            log::error!("    fix '{}' and run again", field);
                        }
                    }
                    return Err(e);
                }
                Err(e) => {
                    summary.failed += 1;
                    log::log!(
                        e.severity().log_level(),
                        "Error processing {}: {}",
                        item.relative.display(),
                        e
                    );
                    if let Some(hint) = e.recovery_suggestion() {
                        log::info!("    hint: {}", hint);
                    }
                    for strategy in e.recovery_strategies() {
                        if let RecoveryStrategy::Skip { reason } = strategy {
                            log::debug!("    {}", reason);
                        }
                    }
                }
            }
        }
        Ok(summary)
    }
}
