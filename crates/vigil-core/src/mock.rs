//! In-memory platform and transport for tests and headless runs.
//!
//! [`MockPlatform`] never produces readings on its own; tests push them with
//! [`MockPlatform::emit`]. It records every start/stop so subscription
//! counts can be asserted. [`RecordingTransport`] keeps every URL it is
//! asked to send.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use url::Url;

use crate::platform::{
    CallbackGate, PlatformError, PlatformResult, ReadingCallback, SensorPlatform, SourceHandle,
};
use crate::transport::Transport;
use crate::types::{Authorization, Payload, Reading, SamplingInterval, SourceId};

#[derive(Default)]
struct Record {
    opened: bool,
    starts: usize,
    stops: usize,
    live: Vec<CallbackGate>,
    max_live: usize,
    interval: Option<SamplingInterval>,
}

#[derive(Default)]
struct MockState {
    unavailable: HashSet<SourceId>,
    denied: HashSet<SourceId>,
    failing: HashSet<SourceId>,
    records: HashMap<SourceId, Record>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> std::sync::MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable [`SensorPlatform`].
#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Shared,
}

impl MockPlatform {
    /// Every source available and authorized.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a source as absent from the device.
    #[must_use]
    pub fn without(self, id: SourceId) -> Self {
        lock(&self.state).unavailable.insert(id);
        self
    }

    /// Mark a source as refused by the user.
    #[must_use]
    pub fn deny(self, id: SourceId) -> Self {
        lock(&self.state).denied.insert(id);
        self
    }

    /// Make `start` fail for a source.
    #[must_use]
    pub fn fail_start(self, id: SourceId) -> Self {
        lock(&self.state).failing.insert(id);
        self
    }

    /// Deliver a reading to every live subscription of `id`.
    /// Returns how many callbacks ran.
    pub fn emit(&self, id: SourceId, payload: Payload) -> usize {
        let gates: Vec<CallbackGate> = lock(&self.state)
            .records
            .get(&id)
            .map(|r| r.live.clone())
            .unwrap_or_default();
        let reading = Reading::now(payload);
        gates
            .iter()
            .filter(|gate| gate.deliver(reading.clone()))
            .count()
    }

    /// Whether a handle was opened for `id`.
    #[must_use]
    pub fn opened(&self, id: SourceId) -> bool {
        lock(&self.state).records.get(&id).is_some_and(|r| r.opened)
    }

    /// Subscriptions currently delivering for `id`.
    #[must_use]
    pub fn live(&self, id: SourceId) -> usize {
        lock(&self.state).records.get(&id).map_or(0, |r| r.live.len())
    }

    /// Highest number of simultaneous subscriptions ever seen for `id`.
    #[must_use]
    pub fn max_live(&self, id: SourceId) -> usize {
        lock(&self.state).records.get(&id).map_or(0, |r| r.max_live)
    }

    #[must_use]
    pub fn starts(&self, id: SourceId) -> usize {
        lock(&self.state).records.get(&id).map_or(0, |r| r.starts)
    }

    #[must_use]
    pub fn stops(&self, id: SourceId) -> usize {
        lock(&self.state).records.get(&id).map_or(0, |r| r.stops)
    }

    /// Cadence the platform was last told for `id`.
    #[must_use]
    pub fn interval(&self, id: SourceId) -> Option<SamplingInterval> {
        lock(&self.state).records.get(&id).and_then(|r| r.interval)
    }
}

impl SensorPlatform for MockPlatform {
    fn is_available(&self, id: SourceId) -> bool {
        !lock(&self.state).unavailable.contains(&id)
    }

    fn authorization(&self, id: SourceId) -> Authorization {
        if lock(&self.state).denied.contains(&id) {
            Authorization::Denied
        } else {
            Authorization::Authorized
        }
    }

    fn open(
        &self,
        id: SourceId,
        interval: SamplingInterval,
    ) -> PlatformResult<Box<dyn SourceHandle>> {
        let mut state = lock(&self.state);
        if state.unavailable.contains(&id) {
            return Err(PlatformError::Unavailable { id });
        }
        let record = state.records.entry(id).or_default();
        record.opened = true;
        if id.is_motion() {
            record.interval = Some(interval);
        }
        Ok(Box::new(MockHandle {
            id,
            interval,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockHandle {
    id: SourceId,
    interval: SamplingInterval,
    state: Shared,
}

impl SourceHandle for MockHandle {
    fn start(&mut self, callback: ReadingCallback) -> PlatformResult<()> {
        let mut state = lock(&self.state);
        if state.failing.contains(&self.id) {
            return Err(PlatformError::Failed {
                id: self.id,
                message: "scripted failure".into(),
            });
        }
        let record = state.records.entry(self.id).or_default();
        record.starts += 1;
        record.live.push(CallbackGate::open(callback));
        record.max_live = record.max_live.max(record.live.len());
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(record) = state.records.get_mut(&self.id) {
            if !record.live.is_empty() {
                for gate in record.live.drain(..) {
                    gate.close();
                }
                record.stops += 1;
            }
        }
    }

    fn set_interval(&mut self, interval: SamplingInterval) {
        self.interval = interval;
        if let Some(record) = lock(&self.state).records.get_mut(&self.id) {
            record.interval = Some(interval);
        }
    }

    fn interval(&self) -> SamplingInterval {
        self.interval
    }

    fn is_active(&self) -> bool {
        lock(&self.state)
            .records
            .get(&self.id)
            .is_some_and(|r| !r.live.is_empty())
    }
}

/// [`Transport`] that keeps every URL instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    urls: Mutex<Vec<Url>>,
    fail: bool,
    failures: AtomicUsize,
}

impl RecordingTransport {
    /// Behaves like an unreachable endpoint: every dispatch fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Every URL dispatched so far, in call order.
    #[must_use]
    pub fn urls(&self) -> Vec<Url> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Tags (first query component) dispatched so far.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.urls()
            .iter()
            .filter_map(|url| url.query())
            .map(|q| q.split('&').next().unwrap_or_default().to_string())
            .collect()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn dispatch(&self, url: Url) {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url);
        if self.fail {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }
}
