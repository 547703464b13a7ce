//! # Error Handling for Texture Reduction
//!
//! Hierarchical error type shared by the buffer transforms, the embedding
//! providers, the reduction engine, the codecs and the batch driver.
//!
//! ## Architecture
//!
//! - **Error Types**: one enum, [`ShrinkError`], with a variant per failure
//!   domain. Every variant carries an [`ErrorContext`].
//! - **Error Traits**: severity, recoverability and recovery suggestions.
//! - **Error Chaining**: wrapped library errors stay reachable through
//!   [`std::error::Error::source`].
//!
//! ## Failure Semantics
//!
//! The engine never retries. An `EmbeddingFailure` or a transform failure
//! aborts the `reduce` call that raised it; the batch driver uses
//! [`Recoverable`] to decide that the item is skipped and the batch goes on.
//!
//! ## Usage
//!
//! ```rust
//! use texture_shrink::error::{HasRecoverySuggestion, ShrinkError};
//!
//! let error = ShrinkError::embedding("http", "endpoint returned 503")
//!     .with_operation("score candidate")
//!     .with_recovery_suggestion("Check that the embedding server is running");
//!
//! assert_eq!(error.category(), "embedding");
//! assert!(error.recovery_suggestion().is_some());
//! ```

use std::{error::Error as StdError, fmt, time::SystemTime};

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational errors
    Info,
    /// Warnings that may indicate potential issues
    Warning,
    /// Errors that abort one item but not the batch
    Error,
    /// Errors that make the whole run pointless
    Fatal,
}

impl ErrorSeverity {
    /// Matching `log` level, used by the batch driver when reporting.
    pub fn log_level(self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error | ErrorSeverity::Fatal => log::Level::Error,
        }
    }
}

/// Metadata about when and where an error occurred
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// When the error occurred
    pub timestamp: SystemTime,
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Suggested recovery action
    pub recovery_suggestion: Option<String>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Whether the batch can continue past this error
    pub recoverable: bool,
    /// Additional metadata as key-value pairs
    pub metadata: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::now(),
            operation: None,
            context: None,
            recovery_suggestion: None,
            severity: ErrorSeverity::Error,
            recoverable: false,
            metadata: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Base error type for texture reduction
#[derive(Debug)]
pub enum ShrinkError {
    /// Two buffers that must share dimensions do not
    DimensionMismatch {
        operation: String,
        expected: (u32, u32),
        actual: (u32, u32),
        context: ErrorContext,
    },
    /// The embedding provider could not produce a vector
    EmbeddingFailure {
        provider: String,
        reason: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
        context: ErrorContext,
    },
    /// Run configuration errors
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },
    /// Argument validation errors
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },
    /// Pixel kernel failures (resampling, filtering, blending)
    Scale {
        operation: String,
        source: tex_scale::ScaleError,
        context: ErrorContext,
    },
    /// Image decoding or encoding failures
    Codec {
        path: Option<String>,
        source: image::ImageError,
        context: ErrorContext,
    },
    /// External converter program failures
    Tool {
        program: String,
        code: Option<i32>,
        reason: String,
        context: ErrorContext,
    },
    /// I/O errors
    Io {
        operation: String,
        path: Option<String>,
        source: std::io::Error,
        context: ErrorContext,
    },
    /// External library errors
    External {
        library: String,
        source: Box<dyn StdError + Send + Sync>,
        context: ErrorContext,
    },
}

impl ShrinkError {
    /// Create a dimension mismatch error
    pub fn dimension_mismatch(
        operation: impl Into<String>,
        expected: (u32, u32),
        actual: (u32, u32),
    ) -> Self {
        Self::DimensionMismatch {
            operation: operation.into(),
            expected,
            actual,
            context: ErrorContext::new(),
        }
    }

    /// Create an embedding failure
    pub fn embedding(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EmbeddingFailure {
            provider: provider.into(),
            reason: reason.into(),
            source: None,
            context: ErrorContext::new(),
        }
    }

    /// Create an embedding failure wrapping a lower-level error
    pub fn embedding_source(
        provider: impl Into<String>,
        reason: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::EmbeddingFailure {
            provider: provider.into(),
            reason: reason.into(),
            source: Some(Box::new(source)),
            context: ErrorContext::new(),
        }
    }

    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new().with_severity(ErrorSeverity::Fatal),
        }
    }

    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a pixel kernel error
    pub fn scale(operation: impl Into<String>, source: tex_scale::ScaleError) -> Self {
        Self::Scale {
            operation: operation.into(),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create a codec error
    pub fn codec(path: Option<String>, source: image::ImageError) -> Self {
        Self::Codec {
            path,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external tool error
    pub fn tool(program: impl Into<String>, code: Option<i32>, reason: impl Into<String>) -> Self {
        Self::Tool {
            program: program.into(),
            code,
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io_at(
        operation: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: Some(path.as_ref().display().to_string()),
            source,
            context: ErrorContext::new(),
        }
    }

    /// Create an external library error
    pub fn external(
        library: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            library: library.into(),
            source: Box::new(source),
            context: ErrorContext::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add recovery suggestion
    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context_mut().recovery_suggestion = Some(suggestion.into());
        self
    }

    /// Set severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.context_mut().severity = severity;
        self
    }

    /// Mark as recoverable
    pub fn recoverable(mut self) -> Self {
        self.context_mut().recoverable = true;
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::DimensionMismatch { context, .. } => context,
            Self::EmbeddingFailure { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Scale { context, .. } => context,
            Self::Codec { context, .. } => context,
            Self::Tool { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::DimensionMismatch { context, .. } => context,
            Self::EmbeddingFailure { context, .. } => context,
            Self::Config { context, .. } => context,
            Self::Validation { context, .. } => context,
            Self::Scale { context, .. } => context,
            Self::Codec { context, .. } => context,
            Self::Tool { context, .. } => context,
            Self::Io { context, .. } => context,
            Self::External { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::EmbeddingFailure { .. } => "embedding",
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::Scale { .. } => "scale",
            Self::Codec { .. } => "codec",
            Self::Tool { .. } => "tool",
            Self::Io { .. } => "io",
            Self::External { .. } => "external",
        }
    }
}

impl fmt::Display for ShrinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShrinkError::DimensionMismatch {
                operation,
                expected,
                actual,
                ..
            } => {
                write!(
                    f,
                    "Dimension mismatch during {}: expected {}x{}, got {}x{}",
                    operation, expected.0, expected.1, actual.0, actual.1
                )
            }
            ShrinkError::EmbeddingFailure {
                provider, reason, ..
            } => {
                write!(f, "Embedding provider '{}' failed: {}", provider, reason)
            }
            ShrinkError::Config {
                field,
                value,
                reason,
                ..
            } => {
                write!(
                    f,
                    "Configuration error in '{}': {} (value: {})",
                    field, reason, value
                )
            }
            ShrinkError::Validation {
                field,
                constraint,
                value,
                ..
            } => {
                write!(
                    f,
                    "Validation failed for '{}': {} (value: {})",
                    field, constraint, value
                )
            }
            ShrinkError::Scale {
                operation, source, ..
            } => {
                write!(f, "Pixel operation {} failed: {}", operation, source)
            }
            ShrinkError::Codec { path, source, .. } => {
                if let Some(path) = path {
                    write!(f, "Image codec error on '{}': {}", path, source)
                } else {
                    write!(f, "Image codec error: {}", source)
                }
            }
            ShrinkError::Tool {
                program,
                code,
                reason,
                ..
            } => {
                if let Some(code) = code {
                    write!(f, "'{}' exited with code {}: {}", program, code, reason)
                } else {
                    write!(f, "'{}' failed: {}", program, reason)
                }
            }
            ShrinkError::Io {
                operation,
                path,
                source,
                ..
            } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "I/O error during {} on '{}': {}",
                        operation, path, source
                    )
                } else {
                    write!(f, "I/O error during {}: {}", operation, source)
                }
            }
            ShrinkError::External {
                library, source, ..
            } => {
                write!(f, "External library error in {}: {}", library, source)
            }
        }
    }
}

impl StdError for ShrinkError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::EmbeddingFailure {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            Self::Scale { source, .. } => Some(source),
            Self::Codec { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::External { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias using our custom error type
pub type ShrinkResult<T> = Result<T, ShrinkError>;

/// Trait for errors that can be recovered from
pub trait Recoverable {
    /// Check if this error can be recovered from
    fn is_recoverable(&self) -> bool;

    /// Get recovery strategies for this error
    fn recovery_strategies(&self) -> Vec<RecoveryStrategy>;
}

/// What the batch driver does with a failed item
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryStrategy {
    /// Skip the current item and continue the batch
    Skip { reason: String },
    /// Stop the run; the named setting must change first
    Reconfigure { field: String },
}

impl Recoverable for ShrinkError {
    fn is_recoverable(&self) -> bool {
        self.context().recoverable
            || matches!(
                self,
                Self::EmbeddingFailure { .. }
                    | Self::Codec { .. }
                    | Self::Tool { .. }
                    | Self::Io { .. }
                    | Self::Scale { .. }
            )
    }

    fn recovery_strategies(&self) -> Vec<RecoveryStrategy> {
        match self {
            Self::Config { field, .. } => vec![RecoveryStrategy::Reconfigure {
                field: field.clone(),
            }],
            Self::Validation { field, context, .. } if !context.recoverable => {
                vec![RecoveryStrategy::Reconfigure {
                    field: field.clone(),
                }]
            }
            Self::EmbeddingFailure { .. } => vec![RecoveryStrategy::Skip {
                reason: "Leave this texture untouched".to_string(),
            }],
            _ if self.is_recoverable() => vec![RecoveryStrategy::Skip {
                reason: "Skip current texture".to_string(),
            }],
            _ => vec![],
        }
    }
}

/// Trait for errors with severity levels
pub trait HasSeverity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

impl HasSeverity for ShrinkError {
    fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }
}

/// Trait for errors that provide recovery suggestions
pub trait HasRecoverySuggestion {
    /// Get recovery suggestion for this error
    fn recovery_suggestion(&self) -> Option<&str>;
}

impl HasRecoverySuggestion for ShrinkError {
    fn recovery_suggestion(&self) -> Option<&str> {
        self.context().recovery_suggestion.as_deref()
    }
}

/// Error classification utilities
pub mod classify {
    use super::*;

    /// Check if an error stops the whole batch
    pub fn is_fatal(error: &ShrinkError) -> bool {
        matches!(error, ShrinkError::Config { .. }) || error.severity() == ErrorSeverity::Fatal
    }
}

/// Error conversion implementations
impl From<std::io::Error> for ShrinkError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<image::ImageError> for ShrinkError {
    fn from(error: image::ImageError) -> Self {
        Self::codec(None, error)
    }
}
