//! Source registry: which sources exist, which are available, which run.
//!
//! The registry owns one entry per source for the life of the process.
//! Entries are opened once in [`SourceRegistry::setup`] and then started
//! and stopped any number of times. All mutating operations (start, stop,
//! interval changes, toggles) run under a single lock, so a restart never
//! interleaves with an interval update.
//!
//! Unavailable sources are skipped and sources the user has not authorized
//! stay inert. Neither is reported as an error; the caller simply receives
//! no readings from them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::error::{Result, VigilError};
use crate::platform::{ReadingCallback, SensorPlatform, SourceHandle};
use crate::types::{Authorization, SamplingInterval, SourceId};

struct Entry {
    id: SourceId,
    available: bool,
    authorization: Authorization,
    enabled: bool,
    handle: Option<Box<dyn SourceHandle>>,
}

impl Entry {
    fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_active())
    }

    fn startable(&self) -> bool {
        self.enabled && self.authorization.permits() && self.handle.is_some()
    }

    fn start(&mut self, callback: &ReadingCallback) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        match handle.start(Arc::clone(callback)) {
            Ok(()) => true,
            Err(e) => {
                warn!(source = %self.id, error = %e, "failed to start source");
                false
            }
        }
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.stop();
        }
    }
}

struct RegistryState {
    entries: Vec<Entry>,
    interval: SamplingInterval,
    running: bool,
}

/// Per-source view for the inspector.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SourceStatus {
    /// Source name, e.g. `accelerometer` or `beacon-ranging:<uuid>`.
    #[schema(example = "accelerometer")]
    pub source: String,

    /// Whether the device has this capability.
    pub available: bool,

    /// Whether the user has authorized it.
    pub authorized: bool,

    pub enabled: bool,

    /// Whether readings are currently being delivered.
    pub active: bool,

    /// Effective cadence for motion sources.
    #[schema(example = 10.0)]
    pub interval_secs: Option<f64>,
}

/// Tracks and drives every source.
pub struct SourceRegistry {
    platform: Arc<dyn SensorPlatform>,
    callback: ReadingCallback,
    state: Mutex<RegistryState>,
}

impl SourceRegistry {
    /// Create an empty registry. `callback` receives every reading from every
    /// source and must not call back into the registry.
    pub fn new(
        platform: Arc<dyn SensorPlatform>,
        callback: ReadingCallback,
        interval: SamplingInterval,
    ) -> Self {
        Self {
            platform,
            callback,
            state: Mutex::new(RegistryState {
                entries: Vec::new(),
                interval,
                running: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Query availability and authorization for every configured source and
    /// open handles for the usable ones without starting them.
    ///
    /// Calling `setup` again stops and replaces all entries.
    pub fn setup(&self, config: &Config) {
        let mut state = self.lock();
        for entry in &mut state.entries {
            entry.stop();
        }
        state.running = false;
        let interval = state.interval;

        state.entries = config
            .sources()
            .into_iter()
            .map(|id| self.open_entry(id, config.starts_enabled(id), interval))
            .collect();

        let usable = state.entries.iter().filter(|e| e.handle.is_some()).count();
        info!(
            sources = state.entries.len(),
            usable,
            interval = %interval,
            "source registry set up"
        );
    }

    fn open_entry(&self, id: SourceId, enabled: bool, interval: SamplingInterval) -> Entry {
        let mut entry = Entry {
            id,
            available: true,
            authorization: Authorization::NotRequired,
            enabled,
            handle: None,
        };

        // Lifecycle transitions arrive through the lifecycle bridge, not the platform.
        if id == SourceId::Lifecycle {
            return entry;
        }

        if !self.platform.is_available(id) {
            debug!(source = %id, "source unavailable on this device, skipping");
            entry.available = false;
            return entry;
        }

        entry.authorization = self.platform.authorization(id);
        if !entry.authorization.permits() {
            warn!(source = %id, "authorization denied; no readings will arrive");
            return entry;
        }

        match self.platform.open(id, interval) {
            Ok(handle) => entry.handle = Some(handle),
            Err(e) => warn!(source = %id, error = %e, "failed to open source"),
        }
        entry
    }

    /// Start every available, authorized, enabled source.
    ///
    /// Everything is stopped first, so calling this twice never leaves two
    /// subscriptions for one source. Returns the number of sources started.
    pub fn start_all(&self) -> usize {
        let mut state = self.lock();
        for entry in &mut state.entries {
            entry.stop();
        }

        let mut started = 0;
        for entry in state.entries.iter_mut().filter(|e| e.startable()) {
            if entry.start(&self.callback) {
                started += 1;
            }
        }
        state.running = true;
        info!(started, interval = %state.interval, "sources started");
        started
    }

    /// Stop every active subscription, including beacon ranging.
    ///
    /// Safe to call before `start_all`. Once this returns no callback fires.
    pub fn stop_all(&self) {
        let mut state = self.lock();
        for entry in &mut state.entries {
            entry.stop();
        }
        state.running = false;
        info!("sources stopped");
    }

    /// Update the shared cadence of every motion source in place.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::InvalidInterval`] unless `secs` is positive and
    /// finite. Nothing changes in that case.
    pub fn set_interval(&self, secs: f64) -> Result<SamplingInterval> {
        let interval = SamplingInterval::from_secs(secs)?;
        self.apply_interval(interval);
        Ok(interval)
    }

    /// Same as [`set_interval`](Self::set_interval) for an already validated value.
    pub fn apply_interval(&self, interval: SamplingInterval) {
        let mut state = self.lock();
        state.interval = interval;
        for entry in state.entries.iter_mut().filter(|e| e.id.is_motion()) {
            if let Some(handle) = entry.handle.as_mut() {
                handle.set_interval(interval);
            }
        }
        debug!(interval = %interval, "sampling interval applied");
    }

    /// Enable or disable one source at runtime.
    ///
    /// Disabling stops it immediately; enabling starts it if the registry is
    /// running.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::UnknownSource`] if `id` was never set up.
    pub fn set_enabled(&self, id: SourceId, enabled: bool) -> Result<()> {
        let mut state = self.lock();
        let running = state.running;
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| VigilError::UnknownSource(id.to_string()))?;

        entry.enabled = enabled;
        if !enabled {
            entry.stop();
        } else if running && entry.startable() && !entry.is_active() {
            entry.start(&self.callback);
        }
        debug!(source = %id, enabled, "source toggled");
        Ok(())
    }

    /// Whether `id` is registered and enabled.
    #[must_use]
    pub fn is_enabled(&self, id: SourceId) -> bool {
        self.lock().entries.iter().any(|e| e.id == id && e.enabled)
    }

    #[must_use]
    pub fn interval(&self) -> SamplingInterval {
        self.lock().interval
    }

    /// Whether `start_all` has run more recently than `stop_all`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Current state of every source, in setup order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SourceStatus> {
        self.lock()
            .entries
            .iter()
            .map(|entry| SourceStatus {
                source: entry.id.to_string(),
                available: entry.available,
                authorized: entry.authorization.permits(),
                enabled: entry.enabled,
                active: entry.is_active(),
                interval_secs: entry
                    .handle
                    .as_ref()
                    .filter(|_| entry.id.is_motion())
                    .map(|h| h.interval().as_secs()),
            })
            .collect()
    }
}
