//! Synthetic sensor platform for hosts without real hardware.
//!
//! Every started handle runs one tokio task that produces plausible readings
//! for its source. Motion sources tick at the shared sampling interval, which
//! a `watch` channel updates in place; everything else ticks at a fixed
//! cadence. Delivery goes through a [`CallbackGate`], so once `stop` returns
//! the callback is never invoked again. Location fixes closer than
//! `distance_filter_m` to the last delivered fix are dropped.

use std::collections::HashSet;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::LocationConfig;
use crate::platform::{
    CallbackGate, PlatformError, PlatformResult, ReadingCallback, SensorPlatform, SourceHandle,
};
use crate::types::{
    ActivityLabel, ActivitySet, Attitude, Authorization, Confidence, Payload, Proximity, Reading,
    SamplingInterval, SourceId, Vector3,
};

/// Fixed cadence for sources that do not follow the sampling interval.
const fn cadence(id: SourceId) -> Duration {
    match id {
        SourceId::Location => Duration::from_secs(30),
        SourceId::ActivityClassifier => Duration::from_secs(15),
        SourceId::BeaconRegion(_) => Duration::from_secs(60),
        SourceId::BeaconRanging(_) => Duration::from_secs(3),
        _ => Duration::from_secs(5),
    }
}

/// Metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// [`SensorPlatform`] backed by synthetic readings.
#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    runtime: Handle,
    location: LocationConfig,
    unavailable: HashSet<SourceId>,
    denied: HashSet<SourceId>,
}

impl SimulatedPlatform {
    /// Create a platform on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoRuntime`] when called outside a runtime.
    pub fn new(location: LocationConfig) -> PlatformResult<Self> {
        let runtime = Handle::try_current().map_err(|e| PlatformError::NoRuntime(e.to_string()))?;
        Ok(Self::with_runtime(runtime, location))
    }

    #[must_use]
    pub fn with_runtime(runtime: Handle, location: LocationConfig) -> Self {
        Self {
            runtime,
            location,
            unavailable: HashSet::new(),
            denied: HashSet::new(),
        }
    }

    /// Pretend the device lacks a source.
    #[must_use]
    pub fn without(mut self, id: SourceId) -> Self {
        self.unavailable.insert(id);
        self
    }

    /// Pretend the user refused a source.
    #[must_use]
    pub fn deny(mut self, id: SourceId) -> Self {
        self.denied.insert(id);
        self
    }
}

impl SensorPlatform for SimulatedPlatform {
    fn is_available(&self, id: SourceId) -> bool {
        !self.unavailable.contains(&id)
    }

    fn authorization(&self, id: SourceId) -> Authorization {
        if self.denied.contains(&id) {
            Authorization::Denied
        } else if id.is_motion() || id == SourceId::Lifecycle {
            Authorization::NotRequired
        } else {
            Authorization::Authorized
        }
    }

    fn open(
        &self,
        id: SourceId,
        interval: SamplingInterval,
    ) -> PlatformResult<Box<dyn SourceHandle>> {
        if !self.is_available(id) {
            return Err(PlatformError::Unavailable { id });
        }
        if id == SourceId::Lifecycle {
            return Err(PlatformError::Failed {
                id,
                message: "lifecycle events are delivered by the host".into(),
            });
        }
        let (interval_tx, _) = watch::channel(interval);
        Ok(Box::new(SimulatedHandle {
            id,
            runtime: self.runtime.clone(),
            location: self.location,
            interval_tx,
            gate: None,
            task: None,
        }))
    }
}

struct SimulatedHandle {
    id: SourceId,
    runtime: Handle,
    location: LocationConfig,
    interval_tx: watch::Sender<SamplingInterval>,
    gate: Option<CallbackGate>,
    task: Option<JoinHandle<()>>,
}

impl SourceHandle for SimulatedHandle {
    fn start(&mut self, callback: ReadingCallback) -> PlatformResult<()> {
        self.stop();
        let gate = CallbackGate::open(callback);
        let task = self.runtime.spawn(produce(
            self.id,
            self.location,
            gate.clone(),
            self.interval_tx.subscribe(),
        ));
        self.gate = Some(gate);
        self.task = Some(task);
        debug!(source = %self.id, "simulated source started");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(gate) = self.gate.take() {
            gate.close();
            debug!(source = %self.id, "simulated source stopped");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn set_interval(&mut self, interval: SamplingInterval) {
        self.interval_tx.send_replace(interval);
    }

    fn interval(&self) -> SamplingInterval {
        *self.interval_tx.borrow()
    }

    fn is_active(&self) -> bool {
        self.gate.as_ref().is_some_and(CallbackGate::is_open)
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn produce(
    id: SourceId,
    location: LocationConfig,
    gate: CallbackGate,
    mut interval_rx: watch::Receiver<SamplingInterval>,
) {
    let follows_interval = id.is_motion();
    let mut sample: u32 = 0;
    let mut filter = DistanceFilter::new(location.distance_filter_m);
    loop {
        let period = if follows_interval {
            interval_rx.borrow_and_update().as_duration()
        } else {
            cadence(id)
        };
        tokio::select! {
            () = tokio::time::sleep(period) => {
                sample = sample.wrapping_add(1);
                let payload = synthesize(id, sample, &location);
                if !filter.admit(&payload) {
                    continue;
                }
                if !gate.deliver(Reading::now(payload)) {
                    break;
                }
            }
            changed = interval_rx.changed(), if follows_interval => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

/// Approximate ground distance in metres between two `(latitude, longitude)`
/// fixes. Equirectangular, which is plenty at filter scale.
fn displacement_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let north = (to.0 - from.0) * METRES_PER_DEGREE;
    let east = (to.1 - from.1) * METRES_PER_DEGREE * from.0.to_radians().cos();
    north.hypot(east)
}

/// Drops location fixes that moved less than `filter_m` from the last
/// admitted fix. Every other payload passes.
struct DistanceFilter {
    filter_m: f64,
    last_fix: Option<(f64, f64)>,
}

impl DistanceFilter {
    const fn new(filter_m: f64) -> Self {
        Self {
            filter_m,
            last_fix: None,
        }
    }

    fn admit(&mut self, payload: &Payload) -> bool {
        let Payload::Location {
            latitude,
            longitude,
            ..
        } = payload
        else {
            return true;
        };
        let fix = (*latitude, *longitude);
        let moved = self
            .last_fix
            .map_or(true, |prev| displacement_m(prev, fix) >= self.filter_m);
        if moved {
            self.last_fix = Some(fix);
        }
        moved
    }
}

/// Deterministic synthetic payload for the `sample`-th reading of `id`.
#[must_use]
pub fn synthesize(id: SourceId, sample: u32, location: &LocationConfig) -> Payload {
    let t = f64::from(sample);
    let wobble = (t * 0.7).sin();
    match id {
        SourceId::Location => match sample % 20 {
            19 => Payload::LocationPaused,
            0 => Payload::LocationResumed,
            _ => Payload::Location {
                latitude: 0.0001f64.mul_add(wobble, 37.3349),
                longitude: 0.0001f64.mul_add((t * 0.3).cos(), -122.009),
                altitude: Some(0.5f64.mul_add(wobble, 20.0)),
                horizontal_accuracy: location.desired_accuracy_m,
            },
        },
        SourceId::Heading => {
            let magnetic = (t * 15.0) % 360.0;
            Payload::Heading {
                magnetic,
                true_heading: Some((magnetic + 13.0) % 360.0),
            }
        }
        SourceId::Altimeter => Payload::Altitude {
            relative_altitude: Some(0.3 * wobble),
            pressure: Some(0.02f64.mul_add(wobble, 101.325)),
        },
        SourceId::Accelerometer => {
            Payload::Acceleration(Vector3::new(0.01 * wobble, 0.01 * (t * 0.7).cos(), -1.0))
        }
        SourceId::Magnetometer => Payload::MagneticField(Vector3::new(
            wobble.mul_add(0.5, 22.5),
            -5.1,
            wobble.mul_add(-0.5, -40.0),
        )),
        SourceId::Gyroscope => {
            Payload::RotationRate(Vector3::new(0.002 * wobble, -0.001 * wobble, 0.0))
        }
        SourceId::DeviceMotion => Payload::DeviceMotion {
            attitude: Attitude {
                roll: 0.01 * wobble,
                pitch: 0.02 * wobble,
                yaw: (t * 0.1) % std::f64::consts::TAU,
            },
            user_acceleration: Vector3::new(0.001 * wobble, 0.0, -0.001 * wobble),
        },
        SourceId::ActivityClassifier => {
            let labels: ActivitySet = match sample % 3 {
                0 => [ActivityLabel::Stationary].into_iter().collect(),
                1 => [ActivityLabel::Walking].into_iter().collect(),
                _ => [ActivityLabel::Stationary, ActivityLabel::Driving]
                    .into_iter()
                    .collect(),
            };
            Payload::Activity {
                labels,
                confidence: Confidence::from_raw(i64::from(sample % 3)),
            }
        }
        SourceId::BeaconRegion(beacon) => {
            if sample % 2 == 1 {
                Payload::RegionEntered(beacon)
            } else {
                Payload::RegionExited(beacon)
            }
        }
        SourceId::BeaconRanging(beacon) => Payload::BeaconRanged {
            beacon,
            proximity: Proximity::from_raw(i64::from(sample % 4)),
        },
        SourceId::Lifecycle => Payload::Failure {
            source: id,
            description: "lifecycle events are delivered by the host".into(),
        },
    }
}
