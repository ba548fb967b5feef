//! Shared domain types: sources, readings and their enumerations.
//!
//! Everything a source produces is expressed here in platform-neutral form.
//! Platform integrations translate their native values into these types
//! before handing them to the pipeline.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Result, VigilError};

/// Identifier of an iBeacon region (its proximity UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeaconId(pub Uuid);

impl fmt::Display for BeaconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for BeaconId {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| VigilError::UnknownSource(s.to_string()))
    }
}

/// A sensor or event source the registry can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    /// Significant location updates (plus pause/resume notifications).
    Location,
    /// Compass heading.
    Heading,
    /// Barometric altimeter.
    Altimeter,
    /// Raw accelerometer.
    Accelerometer,
    /// Raw magnetometer.
    Magnetometer,
    /// Raw gyroscope.
    Gyroscope,
    /// Fused device motion.
    DeviceMotion,
    /// Motion activity classification.
    ActivityClassifier,
    /// Entry/exit monitoring for a beacon region.
    BeaconRegion(BeaconId),
    /// Proximity ranging for beacons in a region.
    BeaconRanging(BeaconId),
    /// Host application lifecycle transitions.
    Lifecycle,
}

impl SourceId {
    /// Sources that exist regardless of configuration.
    pub const FIXED: [Self; 9] = [
        Self::Location,
        Self::Heading,
        Self::Altimeter,
        Self::Accelerometer,
        Self::Magnetometer,
        Self::Gyroscope,
        Self::DeviceMotion,
        Self::ActivityClassifier,
        Self::Lifecycle,
    ];

    /// Returns `true` for the four sources sharing the sampling interval.
    #[must_use]
    pub const fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::Accelerometer | Self::Magnetometer | Self::Gyroscope | Self::DeviceMotion
        )
    }

    /// The beacon this source is keyed by, if any.
    #[must_use]
    pub const fn beacon(&self) -> Option<BeaconId> {
        match self {
            Self::BeaconRegion(id) | Self::BeaconRanging(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Location => f.write_str("location"),
            Self::Heading => f.write_str("heading"),
            Self::Altimeter => f.write_str("altimeter"),
            Self::Accelerometer => f.write_str("accelerometer"),
            Self::Magnetometer => f.write_str("magnetometer"),
            Self::Gyroscope => f.write_str("gyroscope"),
            Self::DeviceMotion => f.write_str("device-motion"),
            Self::ActivityClassifier => f.write_str("activity"),
            Self::BeaconRegion(id) => write!(f, "beacon-region:{id}"),
            Self::BeaconRanging(id) => write!(f, "beacon-ranging:{id}"),
            Self::Lifecycle => f.write_str("lifecycle"),
        }
    }
}

impl FromStr for SourceId {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || VigilError::UnknownSource(s.to_string());
        if let Some((kind, id)) = s.split_once(':') {
            let id: BeaconId = id.parse().map_err(|_| unknown())?;
            return match kind {
                "beacon-region" => Ok(Self::BeaconRegion(id)),
                "beacon-ranging" => Ok(Self::BeaconRanging(id)),
                _ => Err(unknown()),
            };
        }
        match s {
            "location" => Ok(Self::Location),
            "heading" => Ok(Self::Heading),
            "altimeter" => Ok(Self::Altimeter),
            "accelerometer" => Ok(Self::Accelerometer),
            "magnetometer" => Ok(Self::Magnetometer),
            "gyroscope" => Ok(Self::Gyroscope),
            "device-motion" => Ok(Self::DeviceMotion),
            "activity" => Ok(Self::ActivityClassifier),
            "lifecycle" => Ok(Self::Lifecycle),
            _ => Err(unknown()),
        }
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sampling cadence shared by the motion sources.
///
/// Always a positive, finite number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct SamplingInterval(f64);

impl SamplingInterval {
    /// Default cadence, also used when the host resigns active.
    pub const DEFAULT_SECS: f64 = 10.0;

    /// Longest period a timer is armed with; larger intervals saturate here.
    pub const MAX_PERIOD: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

    /// Build an interval from seconds.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::InvalidInterval`] for zero, negative, NaN or
    /// infinite values.
    pub fn from_secs(secs: f64) -> Result<Self> {
        if secs.is_finite() && secs > 0.0 {
            Ok(Self(secs))
        } else {
            Err(VigilError::InvalidInterval(secs))
        }
    }

    /// Interval in seconds.
    #[must_use]
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// Interval as a [`Duration`], clamped to `1ns..=MAX_PERIOD`.
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::try_from_secs_f64(self.0)
            .map_or(Self::MAX_PERIOD, |period| period.min(Self::MAX_PERIOD))
            .max(Duration::from_nanos(1))
    }
}

impl Default for SamplingInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

impl fmt::Display for SamplingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl<'de> Deserialize<'de> for SamplingInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Self::from_secs(secs).map_err(serde::de::Error::custom)
    }
}

/// Three-axis sample (acceleration in g, field in µT, rotation in rad/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Device attitude in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// An activity the classifier may report. Declaration order is the
/// canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLabel {
    Unknown,
    Stationary,
    Walking,
    Running,
    Cycling,
    Driving,
}

impl ActivityLabel {
    /// All labels in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Unknown,
        Self::Stationary,
        Self::Walking,
        Self::Running,
        Self::Cycling,
        Self::Driving,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Stationary => "stationary",
            Self::Walking => "walking",
            Self::Running => "running",
            Self::Cycling => "cycling",
            Self::Driving => "driving",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of simultaneously active activity labels.
///
/// Labels are not mutually exclusive (e.g. `stationary` and `driving` at a
/// red light). Iteration always yields canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivitySet(u8);

impl ActivitySet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, label: ActivityLabel) {
        self.0 |= label.bit();
    }

    #[must_use]
    pub const fn contains(&self, label: ActivityLabel) -> bool {
        self.0 & label.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Active labels in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = ActivityLabel> + '_ {
        ActivityLabel::ALL
            .into_iter()
            .filter(move |label| self.contains(*label))
    }
}

impl FromIterator<ActivityLabel> for ActivitySet {
    fn from_iter<I: IntoIterator<Item = ActivityLabel>>(iter: I) -> Self {
        let mut set = Self::empty();
        for label in iter {
            set.insert(label);
        }
        set
    }
}

/// Classifier confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
    Unknown,
}

impl Confidence {
    /// Map a platform confidence code (0 = low, 1 = medium, 2 = high).
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            0 => Self::Low,
            1 => Self::Medium,
            2 => Self::High,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }
}

/// Beacon proximity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proximity {
    Unknown,
    Immediate,
    Near,
    Far,
}

impl Proximity {
    /// Map a platform proximity code (0 = unknown, 1 = immediate, 2 = near, 3 = far).
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Immediate,
            2 => Self::Near,
            3 => Self::Far,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Immediate => "immediate",
            Self::Near => "near",
            Self::Far => "far",
        }
    }
}

/// Host application lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    DidFinishLaunching,
    DidBecomeActive,
    WillResignActive,
    WillEnterForeground,
    DidEnterBackground,
}

impl LifecycleEvent {
    pub const ALL: [Self; 5] = [
        Self::DidFinishLaunching,
        Self::DidBecomeActive,
        Self::WillResignActive,
        Self::WillEnterForeground,
        Self::DidEnterBackground,
    ];

    /// Kebab-case name used by the control surface.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DidFinishLaunching => "did-finish-launching",
            Self::DidBecomeActive => "did-become-active",
            Self::WillResignActive => "will-resign-active",
            Self::WillEnterForeground => "will-enter-foreground",
            Self::DidEnterBackground => "did-enter-background",
        }
    }
}

impl FromStr for LifecycleEvent {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| VigilError::UnknownLifecycleEvent(s.to_string()))
    }
}

/// Platform authorization state for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    Authorized,
    Denied,
    NotRequired,
}

impl Authorization {
    #[must_use]
    pub const fn permits(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Source-specific payload of a [`Reading`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Location {
        latitude: f64,
        longitude: f64,
        altitude: Option<f64>,
        horizontal_accuracy: f64,
    },
    LocationPaused,
    LocationResumed,
    Heading {
        magnetic: f64,
        true_heading: Option<f64>,
    },
    Altitude {
        relative_altitude: Option<f64>,
        pressure: Option<f64>,
    },
    Acceleration(Vector3),
    MagneticField(Vector3),
    RotationRate(Vector3),
    DeviceMotion {
        attitude: Attitude,
        user_acceleration: Vector3,
    },
    Activity {
        labels: ActivitySet,
        confidence: Confidence,
    },
    RegionEntered(BeaconId),
    RegionExited(BeaconId),
    BeaconRanged {
        beacon: BeaconId,
        proximity: Proximity,
    },
    Lifecycle(LifecycleEvent),
    /// Error reported by the platform in place of a reading.
    Failure {
        source: SourceId,
        description: String,
    },
}

/// One immutable observation produced by a source.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub taken_at: DateTime<Utc>,
    pub payload: Payload,
}

impl Reading {
    /// A reading stamped with the current time.
    #[must_use]
    pub fn now(payload: Payload) -> Self {
        Self {
            taken_at: Utc::now(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_round_trips_through_name() {
        let beacon = BeaconId(Uuid::nil());
        let all = SourceId::FIXED
            .into_iter()
            .chain([SourceId::BeaconRegion(beacon), SourceId::BeaconRanging(beacon)]);
        for source in all {
            let parsed: SourceId = source.to_string().parse().unwrap();
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn test_unknown_source_name_is_rejected() {
        assert!(matches!(
            "barometer".parse::<SourceId>(),
            Err(VigilError::UnknownSource(_))
        ));
        assert!("beacon-ranging:not-a-uuid".parse::<SourceId>().is_err());
        assert!("beacon-thing:00000000-0000-0000-0000-000000000000"
            .parse::<SourceId>()
            .is_err());
    }

    #[test]
    fn test_only_four_motion_sources() {
        let motion: Vec<_> = SourceId::FIXED.iter().filter(|s| s.is_motion()).collect();
        assert_eq!(motion.len(), 4);
        assert!(!SourceId::Altimeter.is_motion());
    }

    #[test]
    fn test_sampling_interval_validation() {
        assert!(SamplingInterval::from_secs(0.5).is_ok());
        assert!(SamplingInterval::from_secs(0.0).is_err());
        assert!(SamplingInterval::from_secs(-1.0).is_err());
        assert!(SamplingInterval::from_secs(f64::NAN).is_err());
        assert!(SamplingInterval::from_secs(f64::INFINITY).is_err());
        assert_eq!(SamplingInterval::default().as_secs(), 10.0);
    }

    #[test]
    fn test_sampling_interval_duration_is_clamped() {
        let huge = SamplingInterval::from_secs(1e20).unwrap();
        assert_eq!(huge.as_duration(), SamplingInterval::MAX_PERIOD);

        let tiny = SamplingInterval::from_secs(1e-12).unwrap();
        assert_eq!(tiny.as_duration(), Duration::from_nanos(1));

        let normal = SamplingInterval::from_secs(0.25).unwrap();
        assert_eq!(normal.as_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_sampling_interval_deserialize_rejects_zero() {
        let result: std::result::Result<SamplingInterval, _> = serde_json::from_str("0");
        assert!(result.is_err());
        let ok: SamplingInterval = serde_json::from_str("2.5").unwrap();
        assert_eq!(ok.as_secs(), 2.5);
    }

    #[test]
    fn test_activity_set_iterates_in_canonical_order() {
        let set: ActivitySet = [
            ActivityLabel::Driving,
            ActivityLabel::Unknown,
            ActivityLabel::Walking,
        ]
        .into_iter()
        .collect();
        let labels: Vec<_> = set.iter().collect();
        assert_eq!(
            labels,
            vec![
                ActivityLabel::Unknown,
                ActivityLabel::Walking,
                ActivityLabel::Driving
            ]
        );
    }

    #[test]
    fn test_unrecognized_raw_codes_map_to_unknown() {
        assert_eq!(Confidence::from_raw(2), Confidence::High);
        assert_eq!(Confidence::from_raw(7), Confidence::Unknown);
        assert_eq!(Confidence::from_raw(-1), Confidence::Unknown);
        assert_eq!(Proximity::from_raw(2), Proximity::Near);
        assert_eq!(Proximity::from_raw(0), Proximity::Unknown);
        assert_eq!(Proximity::from_raw(42), Proximity::Unknown);
    }

    #[test]
    fn test_lifecycle_event_names() {
        for event in LifecycleEvent::ALL {
            assert_eq!(event.as_str().parse::<LifecycleEvent>().unwrap(), event);
        }
        assert!("did-explode".parse::<LifecycleEvent>().is_err());
    }
}
