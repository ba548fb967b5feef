//! Reading to notification conversion.
//!
//! [`format`] is pure: no I/O, no clock, no shared state. Numbers are written
//! with Rust's shortest round-trip representation, so `1.0` becomes `1`.

use crate::event::NotificationEvent;
use crate::types::{ActivitySet, LifecycleEvent, Payload, Reading, Vector3};

/// Output for an activity reading with no active labels.
pub const NO_ACTIVITY: &str = "none";

/// Delimiter between activity labels.
pub const ACTIVITY_DELIMITER: &str = ",";

/// Convert a reading into the event handed to the sink.
#[must_use]
pub fn format(reading: &Reading) -> NotificationEvent {
    match &reading.payload {
        Payload::Location {
            latitude,
            longitude,
            altitude,
            horizontal_accuracy,
        } => NotificationEvent::new("didUpdateLocations")
            .with("lat", latitude)
            .with("lon", longitude)
            .with("altitude", altitude.unwrap_or(0.0))
            .with("accuracy", horizontal_accuracy),
        Payload::LocationPaused => NotificationEvent::new("DidPauseLocationUpdates"),
        Payload::LocationResumed => NotificationEvent::new("DidResumeLocationUpdates"),
        Payload::Heading {
            magnetic,
            true_heading,
        } => NotificationEvent::new("didUpdateHeading")
            .with("magnetic", magnetic)
            .with("true", true_heading.unwrap_or(0.0)),
        Payload::Altitude {
            relative_altitude,
            pressure,
        } => NotificationEvent::new("altitude")
            .with("relativeAltitude", relative_altitude.unwrap_or(0.0))
            .with("pressure", pressure.unwrap_or(0.0)),
        Payload::Acceleration(v) => axes(NotificationEvent::new("accel"), v),
        Payload::MagneticField(v) => axes(NotificationEvent::new("mag"), v),
        Payload::RotationRate(v) => axes(NotificationEvent::new("gyro"), v),
        Payload::DeviceMotion {
            attitude,
            user_acceleration,
        } => axes(
            NotificationEvent::new("device")
                .with("roll", attitude.roll)
                .with("pitch", attitude.pitch)
                .with("yaw", attitude.yaw),
            user_acceleration,
        ),
        Payload::Activity { labels, confidence } => NotificationEvent::new("activity")
            .with("activities", activity_labels(*labels))
            .with("confidence", confidence.as_str()),
        Payload::RegionEntered(beacon) => {
            NotificationEvent::new("didEnterRegion").with("beacon", beacon)
        }
        Payload::RegionExited(beacon) => {
            NotificationEvent::new("didExitRegion").with("beacon", beacon)
        }
        Payload::BeaconRanged { beacon, proximity } => NotificationEvent::new("didRangeBeacon")
            .with("beacon", beacon)
            .with("range", proximity.as_str()),
        Payload::Lifecycle(event) => NotificationEvent::new(lifecycle_tag(*event)),
        Payload::Failure {
            source,
            description,
        } => NotificationEvent::new("didFail")
            .with("source", source)
            .with("error", description),
    }
}

/// Join active labels in canonical order, or [`NO_ACTIVITY`] when empty.
#[must_use]
pub fn activity_labels(labels: ActivitySet) -> String {
    if labels.is_empty() {
        return NO_ACTIVITY.to_string();
    }
    labels
        .iter()
        .map(|label| label.as_str())
        .collect::<Vec<_>>()
        .join(ACTIVITY_DELIMITER)
}

/// Tag emitted for a lifecycle transition.
#[must_use]
pub const fn lifecycle_tag(event: LifecycleEvent) -> &'static str {
    match event {
        LifecycleEvent::DidFinishLaunching => "DID_FINISH_LAUNCHING",
        LifecycleEvent::DidBecomeActive => "DID_BECOME_ACTIVE",
        LifecycleEvent::WillResignActive => "RESIGN_ACTIVE",
        LifecycleEvent::WillEnterForeground => "WILL_ENTER_FOREGROUND",
        LifecycleEvent::DidEnterBackground => "DID_ENTER_BACKGROUND",
    }
}

fn axes(event: NotificationEvent, v: &Vector3) -> NotificationEvent {
    event.with("x", v.x).with("y", v.y).with("z", v.z)
}
