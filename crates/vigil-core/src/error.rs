//! Unified error types for the vigil core library.
//!
//! [`VigilError`] covers every failure that can reach a caller. Most runtime
//! failures in the pipeline never get this far: unavailable sensors are
//! skipped, denied sources stay inert and transport failures are logged and
//! dropped. What remains is configuration, bad control input, and lookups of
//! sources that do not exist.
//!
//! Module-specific errors ([`ConfigError`](crate::config::ConfigError),
//! [`PlatformError`](crate::platform::PlatformError)) convert into
//! [`VigilError`].
//!
//! # Example
//!
//! ```rust
//! use vigil_core::error::{Result, VigilError};
//!
//! fn parse_interval(secs: f64) -> Result<f64> {
//!     if secs <= 0.0 {
//!         return Err(VigilError::InvalidInterval(secs));
//!     }
//!     Ok(secs)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all vigil operations.
#[derive(Debug, Error)]
pub enum VigilError {
    // =========================================================================
    // SOURCE ERRORS
    // =========================================================================
    /// The named source is not registered.
    #[error("Unknown source: '{0}'. Use names such as 'accelerometer' or 'beacon-ranging:<uuid>'.")]
    UnknownSource(String),

    /// The source exists but the hardware or OS feature is absent.
    #[error("Source '{0}' is not available on this device")]
    SourceUnavailable(String),

    /// The user has not granted permission for the source.
    #[error("Authorization denied for source '{0}'. Grant permission in system settings.")]
    AuthorizationDenied(String),

    /// The platform refused to start a subscription.
    #[error("Platform failure for source '{source_name}': {message}")]
    PlatformFailure {
        /// Source that failed.
        source_name: String,
        /// Platform-reported description.
        message: String,
    },

    // =========================================================================
    // CONTROL ERRORS
    // =========================================================================
    /// A sampling interval was not a positive finite number of seconds.
    #[error("Invalid sampling interval: {0}. Expected a positive number of seconds.")]
    InvalidInterval(f64),

    /// The lifecycle event name is not recognised.
    #[error("Unknown lifecycle event: '{0}'")]
    UnknownLifecycleEvent(String),

    /// The diagnostic endpoint could not be turned into a URL.
    #[error("Invalid diagnostic endpoint '{0}'")]
    InvalidEndpoint(String),

    /// The HTTP client backing the transport could not be built.
    #[error("Failed to initialise diagnostic transport: {0}")]
    TransportInit(String),

    /// No async runtime was available to drive background work.
    #[error("No tokio runtime available: {0}")]
    RuntimeUnavailable(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for vigil operations.
pub type Result<T> = std::result::Result<T, VigilError>;

impl VigilError {
    /// Returns `true` if this error is about a specific source.
    #[inline]
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSource(_)
                | Self::SourceUnavailable(_)
                | Self::AuthorizationDenied(_)
                | Self::PlatformFailure { .. }
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error represents an expected operational state.
    ///
    /// Missing hardware and refused permissions are facts about the device,
    /// not failures of the program.
    #[inline]
    #[must_use]
    pub const fn is_expected_state(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::AuthorizationDenied(_))
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidInterval(_) | Self::InvalidEndpoint(_) => 400,

            Self::AuthorizationDenied(_) => 403,

            Self::UnknownSource(_) | Self::UnknownLifecycleEvent(_) | Self::ConfigNotFound(_) => {
                404
            }

            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            Self::TransportInit(_) | Self::RuntimeUnavailable(_) | Self::IoError(_) => 500,

            Self::SourceUnavailable(_) | Self::PlatformFailure { .. } => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSource(_) => "UNKNOWN_SOURCE",
            Self::SourceUnavailable(_) => "SOURCE_UNAVAILABLE",
            Self::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            Self::PlatformFailure { .. } => "PLATFORM_FAILURE",
            Self::InvalidInterval(_) => "INVALID_INTERVAL",
            Self::UnknownLifecycleEvent(_) => "UNKNOWN_LIFECYCLE_EVENT",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::TransportInit(_) => "TRANSPORT_INIT_FAILED",
            Self::RuntimeUnavailable(_) => "RUNTIME_UNAVAILABLE",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for VigilError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::LoadError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ParseError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::platform::PlatformError> for VigilError {
    fn from(err: crate::platform::PlatformError) -> Self {
        use crate::platform::PlatformError;
        match err {
            PlatformError::Unavailable { id } => Self::SourceUnavailable(id.to_string()),
            PlatformError::AuthorizationDenied { id } => Self::AuthorizationDenied(id.to_string()),
            PlatformError::Failed { id, message } => Self::PlatformFailure {
                source_name: id.to_string(),
                message,
            },
            PlatformError::NoRuntime(message) => Self::RuntimeUnavailable(message),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
