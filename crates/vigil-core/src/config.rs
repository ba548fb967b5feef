//! Application configuration management.
//!
//! Configuration is read once at startup and injected into every component
//! that needs it. Sources, in increasing precedence:
//!
//! 1. built-in defaults
//! 2. a TOML file (`/etc/vigil/config.toml` on Linux, the platform config
//!    directory elsewhere, or an explicit path)
//! 3. `VIGIL__SECTION__KEY` environment variables
//!
//! The sampling interval is the only value that changes afterwards, and only
//! through [`SourceRegistry::set_interval`](crate::registry::SourceRegistry::set_interval).

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::types::{BeaconId, SamplingInterval, SourceId};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "VIGIL";

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Layered loading (file + environment) failed.
    #[error("failed to load configuration: {0}")]
    LoadError(#[from] ::config::ConfigError),

    /// A TOML document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Rendering the configuration as TOML failed.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field holds an invalid value.
    #[error("invalid {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// More than one field is invalid.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notifications: NotificationsConfig,
    pub sampling: SamplingConfig,
    pub location: LocationConfig,
    /// Beacon regions to monitor and range.
    pub beacons: Vec<BeaconConfig>,
    pub sources: SourcesConfig,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
}

/// Outbound diagnostic pings and local feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Master switch for outbound requests.
    pub enabled: bool,

    /// Host of the development machine listening for pings.
    pub host: String,

    pub port: u16,

    /// Play a short cue for every event.
    pub sound_on_event: bool,

    /// Show every event on the status label.
    pub label_on_event: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8000,
            sound_on_event: false,
            label_on_event: true,
        }
    }
}

impl NotificationsConfig {
    /// Base URL requests are sent to.
    ///
    /// # Errors
    ///
    /// Returns a validation error if host and port do not form a URL.
    pub fn endpoint(&self) -> ConfigResult<Url> {
        Url::parse(&format!("http://{}:{}/", self.host, self.port)).map_err(|e| {
            ConfigError::ValidationError {
                field: "notifications.host".into(),
                message: e.to_string(),
            }
        })
    }
}

/// Sampling cadence for the motion sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Initial interval in seconds.
    pub interval_secs: SamplingInterval,

    /// Interval forced when the host resigns active.
    pub resign_active_interval_secs: SamplingInterval,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: SamplingInterval::default(),
            resign_active_interval_secs: SamplingInterval::default(),
        }
    }
}

/// Location subscription knobs.
///
/// The defaults keep location alive while making updates rare: kilometre
/// accuracy and an effectively infinite distance filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub desired_accuracy_m: f64,
    pub distance_filter_m: f64,

    /// Keep sources running while the host is in the background.
    pub background_updates: bool,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            desired_accuracy_m: 1000.0,
            distance_filter_m: 99_999.0,
            background_updates: true,
        }
    }
}

/// A beacon region to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconConfig {
    pub id: BeaconId,

    #[serde(default)]
    pub name: String,
}

/// Initial per-source enablement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Sources registered but left disabled at startup.
    pub disabled: Vec<SourceId>,
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// When false no subscriber is installed at all.
    pub enabled: bool,

    /// Default filter directive when `VIGIL_LOG_LEVEL` / `RUST_LOG` are unset.
    pub level: String,

    /// JSON rolling files plus compact stdout instead of pretty stdout.
    pub production: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            production: false,
        }
    }
}

/// Local control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment cannot be parsed or the
    /// result fails validation.
    pub fn load() -> ConfigResult<Self> {
        Self::load_layered(&default_config_path(), false)
    }

    /// Load from an explicit file that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if `path` does not exist, or any
    /// parse/validation error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::load_layered(path, true)
    }

    fn load_layered(path: &Path, required: bool) -> ConfigResult<Self> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or invalid.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns every problem found, collapsed into a single error when there
    /// is exactly one.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, message: String| {
            errors.push(ConfigError::ValidationError {
                field: field.to_string(),
                message,
            });
        };

        let host = &self.notifications.host;
        if host.trim().is_empty() || host.chars().any(char::is_whitespace) {
            invalid("notifications.host", format!("'{host}' is not a host name"));
        } else if let Err(ConfigError::ValidationError { message, .. }) =
            self.notifications.endpoint()
        {
            invalid("notifications.host", message);
        }
        if self.notifications.port == 0 {
            invalid("notifications.port", "must be non-zero".into());
        }

        let accuracy = self.location.desired_accuracy_m;
        if !(accuracy.is_finite() && accuracy > 0.0) {
            invalid(
                "location.desired_accuracy_m",
                format!("{accuracy} is not a positive distance"),
            );
        }
        let filter = self.location.distance_filter_m;
        if !(filter.is_finite() && filter >= 0.0) {
            invalid(
                "location.distance_filter_m",
                format!("{filter} is not a distance"),
            );
        }

        let mut seen = HashSet::new();
        for beacon in &self.beacons {
            if !seen.insert(beacon.id) {
                invalid("beacons", format!("duplicate beacon {}", beacon.id));
            }
        }
        for source in &self.sources.disabled {
            if let Some(id) = source.beacon() {
                if !seen.contains(&id) {
                    invalid(
                        "sources.disabled",
                        format!("{source} refers to a beacon that is not configured"),
                    );
                }
            }
        }

        if self.logging.level.trim().is_empty() {
            invalid("logging.level", "must not be empty".into());
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// Every source implied by this configuration, fixed kinds first.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceId> {
        let mut sources = SourceId::FIXED.to_vec();
        for beacon in &self.beacons {
            sources.push(SourceId::BeaconRegion(beacon.id));
            sources.push(SourceId::BeaconRanging(beacon.id));
        }
        sources
    }

    /// Whether `source` starts enabled.
    #[must_use]
    pub fn starts_enabled(&self, source: SourceId) -> bool {
        !self.sources.disabled.contains(&source)
    }
}

/// Default configuration file path.
///
/// On Linux: `/etc/vigil/config.toml`. Elsewhere: the platform config
/// directory, or `./vigil.toml` if none can be determined.
#[must_use]
pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/vigil/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "vigil").map_or_else(
            || PathBuf::from("vigil.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uuid::Uuid;

    const BEACON: &str = "e2c56db5-dffb-48d2-b060-d0f5a71096e0";

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.port, 8000);
        assert_eq!(config.sampling.interval_secs.as_secs(), 10.0);
        assert_eq!(config.sampling.resign_active_interval_secs.as_secs(), 10.0);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.notifications.endpoint().unwrap().as_str(),
            "http://127.0.0.1:8000/"
        );
    }

    #[test]
    fn test_parse_full_document() {
        let config = Config::from_toml_str(&format!(
            r#"
            [notifications]
            enabled = false
            host = "192.168.1.123"
            sound_on_event = true

            [sampling]
            interval_secs = 1.0

            [[beacons]]
            id = "{BEACON}"
            name = "desk"

            [sources]
            disabled = ["gyroscope", "beacon-ranging:{BEACON}"]
            "#
        ))
        .unwrap();

        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.host, "192.168.1.123");
        assert_eq!(config.notifications.port, 8000);
        assert_eq!(config.sampling.interval_secs.as_secs(), 1.0);
        assert_eq!(config.beacons.len(), 1);
        assert!(!config.starts_enabled(SourceId::Gyroscope));
        assert!(config.starts_enabled(SourceId::Accelerometer));
        let beacon = BeaconId(Uuid::parse_str(BEACON).unwrap());
        assert!(!config.starts_enabled(SourceId::BeaconRanging(beacon)));
        assert!(config.starts_enabled(SourceId::BeaconRegion(beacon)));
    }

    #[test]
    fn test_sources_include_two_per_beacon() {
        let config = Config::from_toml_str(&format!("[[beacons]]\nid = \"{BEACON}\"\n")).unwrap();
        let sources = config.sources();
        assert_eq!(sources.len(), SourceId::FIXED.len() + 2);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = Config::from_toml_str("[sampling]\ninterval_secs = 0.0\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_multiple_validation_errors() {
        let mut config = Config::default();
        config.notifications.host = "not a host".into();
        config.notifications.port = 0;
        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_beacons_are_rejected() {
        let result = Config::from_toml_str(&format!(
            "[[beacons]]\nid = \"{BEACON}\"\n[[beacons]]\nid = \"{BEACON}\"\n"
        ));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_disabling_unconfigured_beacon_is_rejected() {
        let result = Config::from_toml_str(&format!(
            "[sources]\ndisabled = [\"beacon-region:{BEACON}\"]\n"
        ));
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "sources.disabled"
        ));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = Config::load_from(Path::new("/nonexistent/vigil.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[notifications]\nhost = \"10.0.0.2\"\nport = 8080").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.notifications.host, "10.0.0.2");
        assert_eq!(config.notifications.port, 8080);
    }

    #[test]
    fn test_toml_round_trip_preserves_values() {
        let mut config = Config::default();
        config.notifications.host = "10.1.1.1".into();
        config.sampling.interval_secs = SamplingInterval::from_secs(5.0).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&rendered).unwrap(), config);
    }
}
