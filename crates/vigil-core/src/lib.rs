//! # vigil-core
//!
//! Core event pipeline for vigil, a diagnostic harness that keeps a device's
//! sensor and location sources subscribed and reports every event to a
//! development machine as an HTTP `GET`.
//!
//! This crate provides:
//! - A registry of event sources with availability and authorization gating
//! - Formatting of readings into tagged notification events
//! - A dispatcher fanning events out to the network, a sound cue and the UI
//! - Lifecycle handling and layered configuration
//!
//! ## Architecture
//!
//! - [`platform`] - Seam to the host's sensor platform
//! - [`registry`] - Source setup, start/stop and interval propagation
//! - [`formatter`] - Pure mapping from readings to notification events
//! - [`dispatcher`] - The single sink every source feeds
//! - [`transport`] - Fire-and-forget HTTP delivery
//! - [`lifecycle`] - Host lifecycle transitions
//! - [`notifier`] - Everything above wired together
//! - [`ui`] - Marshalling display updates onto one context
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared domain types

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod feedback;
pub mod formatter;
pub mod lifecycle;
#[cfg(any(test, feature = "mock-sensors"))]
pub mod mock;
pub mod notifier;
pub mod platform;
pub mod registry;
#[cfg(feature = "simulator")]
pub mod simulator;
pub mod transport;
pub mod types;
pub mod ui;

// Re-export primary types for convenience
pub use config::{
    default_config_path, BeaconConfig, Config, ConfigError, ConfigResult, LocationConfig,
    LoggingConfig, NotificationsConfig, SamplingConfig, ServerConfig, SourcesConfig,
};
pub use dispatcher::{DispatchStats, Dispatcher, LastEvent};
pub use error::{Result, VigilError};
pub use event::NotificationEvent;
pub use feedback::{FeedbackCue, Silent, TerminalBell};
pub use lifecycle::LifecycleBridge;
#[cfg(any(test, feature = "mock-sensors"))]
pub use mock::{MockPlatform, RecordingTransport};
pub use notifier::EventNotifier;
pub use platform::{
    CallbackGate, PlatformError, PlatformResult, ReadingCallback, SensorPlatform, SourceHandle,
};
pub use registry::{SourceRegistry, SourceStatus};
#[cfg(feature = "simulator")]
pub use simulator::SimulatedPlatform;
pub use transport::{HttpTransport, Transport};
pub use types::{
    ActivityLabel, ActivitySet, Attitude, Authorization, BeaconId, Confidence, LifecycleEvent,
    Payload, Proximity, Reading, SamplingInterval, SourceId, Vector3,
};
pub use ui::{StatusBoard, StatusObserver, StatusSnapshot, UiContext, UiExecutor, UiUpdate};
