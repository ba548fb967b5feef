//! Host sensor platform seam.
//!
//! The registry never talks to sensor hardware directly. It asks a
//! [`SensorPlatform`] whether a source exists and is authorized, opens a
//! [`SourceHandle`] for it, and starts or stops that handle with a callback.
//!
//! Implementations must guarantee that once [`SourceHandle::stop`] returns,
//! the callback passed to the matching `start` is never invoked again.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::types::{Authorization, Reading, SamplingInterval, SourceId};

/// Callback invoked by the platform for every reading.
///
/// Runs on a platform-chosen execution context and must not block.
pub type ReadingCallback = Arc<dyn Fn(Reading) + Send + Sync>;

/// Errors reported by a platform integration.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Hardware or OS feature absent.
    #[error("source {id} is not available")]
    Unavailable { id: SourceId },

    /// Permission refused by the user.
    #[error("authorization denied for {id}")]
    AuthorizationDenied { id: SourceId },

    /// The platform rejected the request.
    #[error("platform failure for {id}: {message}")]
    Failed { id: SourceId, message: String },

    /// Background work needs a runtime that is not running.
    #[error("no async runtime: {0}")]
    NoRuntime(String),
}

/// Result type for platform operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Capability-gated access to the device's event sources.
pub trait SensorPlatform: Send + Sync {
    /// Static availability check for a source.
    fn is_available(&self, id: SourceId) -> bool;

    /// Current authorization state, requesting it if still undetermined.
    fn authorization(&self, id: SourceId) -> Authorization;

    /// Construct an inactive subscription handle for an available source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened on this platform.
    fn open(&self, id: SourceId, interval: SamplingInterval) -> PlatformResult<Box<dyn SourceHandle>>;
}

/// A subscription to one source. Created inactive.
pub trait SourceHandle: Send {
    /// Begin delivering readings to `callback`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the subscription.
    fn start(&mut self, callback: ReadingCallback) -> PlatformResult<()>;

    /// Stop delivery. Must be safe to call on an inactive handle.
    fn stop(&mut self);

    /// Change the sampling cadence in place, active or not.
    fn set_interval(&mut self, interval: SamplingInterval);

    /// Cadence the handle currently samples at.
    fn interval(&self) -> SamplingInterval;

    fn is_active(&self) -> bool;
}

/// Closable slot holding a callback.
///
/// Platform tasks deliver through [`CallbackGate::deliver`]; `close` waits
/// for any in-flight delivery, after which no delivery can happen.
#[derive(Clone, Default)]
pub struct CallbackGate {
    slot: Arc<Mutex<Option<ReadingCallback>>>,
}

impl CallbackGate {
    #[must_use]
    pub fn open(callback: ReadingCallback) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(callback))),
        }
    }

    /// Invoke the callback if the gate is still open. Returns whether it ran.
    pub fn deliver(&self, reading: Reading) -> bool {
        let guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map_or(false, |callback| {
            callback(reading);
            true
        })
    }

    pub fn close(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Payload, Vector3};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_gate_stops_delivery_after_close() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let gate = CallbackGate::open(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let reading = Reading::now(Payload::Acceleration(Vector3::default()));

        assert!(gate.deliver(reading.clone()));
        gate.close();
        assert!(!gate.deliver(reading));
        assert!(!gate.is_open());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_gate_is_closed() {
        let gate = CallbackGate::default();
        assert!(!gate.deliver(Reading::now(Payload::LocationPaused)));
    }
}
