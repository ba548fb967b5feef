//! The sink every source funnels into.
//!
//! For each [`NotificationEvent`] the dispatcher:
//!
//! - sends a diagnostic `GET` through the [`Transport`] when notifications
//!   are enabled (otherwise counts it as suppressed),
//! - plays a cue when `sound_on_event` is set,
//! - posts the event summary to the UI context when `label_on_event` is set.
//!
//! None of these block, and none report failure to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::trace;
use url::Url;
use utoipa::ToSchema;

use crate::config::NotificationsConfig;
use crate::error::Result;
use crate::event::NotificationEvent;
use crate::feedback::FeedbackCue;
use crate::formatter;
use crate::platform::ReadingCallback;
use crate::transport::Transport;
use crate::types::Reading;
use crate::ui::{UiContext, UiUpdate};

/// Counters exposed to the inspector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DispatchStats {
    /// Events received from any source.
    pub events: u64,
    /// Requests handed to the transport.
    pub dispatched: u64,
    /// Events not sent because notifications are disabled.
    pub suppressed: u64,
    pub cues_played: u64,
    pub labels_posted: u64,
}

/// Most recent event seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LastEvent {
    #[schema(example = "accel x=1 y=2 z=3")]
    pub summary: String,
    pub at_utc: DateTime<Utc>,
}

#[derive(Default)]
struct Counters {
    events: AtomicU64,
    dispatched: AtomicU64,
    suppressed: AtomicU64,
    cues_played: AtomicU64,
    labels_posted: AtomicU64,
}

/// Sends events to the diagnostic endpoint and local feedback.
pub struct Dispatcher {
    settings: NotificationsConfig,
    endpoint: Url,
    transport: Arc<dyn Transport>,
    cue: Arc<dyn FeedbackCue>,
    ui: UiContext,
    counters: Counters,
    last: Mutex<Option<LastEvent>>,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a valid URL.
    pub fn new(
        settings: &NotificationsConfig,
        transport: Arc<dyn Transport>,
        cue: Arc<dyn FeedbackCue>,
        ui: UiContext,
    ) -> Result<Self> {
        let endpoint = settings.endpoint()?;
        Ok(Self {
            settings: settings.clone(),
            endpoint,
            transport,
            cue,
            ui,
            counters: Counters::default(),
            last: Mutex::new(None),
        })
    }

    /// Handle one event.
    pub fn notify(&self, event: &NotificationEvent) {
        self.counters.events.fetch_add(1, Ordering::Relaxed);
        let summary = event.summary();
        trace!(event = %summary, "notify");

        if self.settings.enabled {
            self.transport.dispatch(self.request_url(event));
            self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
        }

        if self.settings.sound_on_event {
            self.cue.play();
            self.counters.cues_played.fetch_add(1, Ordering::Relaxed);
        }

        if self.settings.label_on_event {
            self.ui.post(UiUpdate::Status(summary.clone()));
            self.counters.labels_posted.fetch_add(1, Ordering::Relaxed);
        }

        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(LastEvent {
            summary,
            at_utc: Utc::now(),
        });
    }

    /// Format a reading and handle the resulting event.
    pub fn submit(&self, reading: &Reading) {
        self.notify(&formatter::format(reading));
    }

    /// Callback for the source registry. Formats and notifies; never blocks.
    #[must_use]
    pub fn reading_callback(self: &Arc<Self>) -> ReadingCallback {
        let dispatcher = Arc::clone(self);
        Arc::new(move |reading| dispatcher.submit(&reading))
    }

    /// URL a given event is sent to.
    #[must_use]
    pub fn request_url(&self, event: &NotificationEvent) -> Url {
        request_url(&self.endpoint, event)
    }

    /// UI context the dispatcher posts labels to.
    #[must_use]
    pub const fn ui(&self) -> &UiContext {
        &self.ui
    }

    /// Base URL of the diagnostic listener.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub const fn notifications_enabled(&self) -> bool {
        self.settings.enabled
    }

    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DispatchStats {
            events: load(&self.counters.events),
            dispatched: load(&self.counters.dispatched),
            suppressed: load(&self.counters.suppressed),
            cues_played: load(&self.counters.cues_played),
            labels_posted: load(&self.counters.labels_posted),
        }
    }

    #[must_use]
    pub fn last_event(&self) -> Option<LastEvent> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Build `endpoint?<tag>[&key=value]*` with every component percent-encoded.
///
/// Spaces become `%20`, never `+`, so any listener decodes them the same way.
#[must_use]
pub fn request_url(endpoint: &Url, event: &NotificationEvent) -> Url {
    let mut query = urlencoding::encode(event.tag()).into_owned();
    for (key, value) in event.params() {
        query.push('&');
        query.push_str(&urlencoding::encode(key));
        query.push('=');
        query.push_str(&urlencoding::encode(value));
    }
    let mut url = endpoint.clone();
    url.set_query(Some(&query));
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Silent;
    use crate::mock::RecordingTransport;
    use crate::types::{Payload, Vector3};
    use crate::ui::StatusBoard;
    use crate::types::SamplingInterval;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingCue(AtomicUsize);

    impl FeedbackCue for CountingCue {
        fn play(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn settings(enabled: bool) -> NotificationsConfig {
        NotificationsConfig {
            enabled,
            host: "192.168.1.123".into(),
            ..NotificationsConfig::default()
        }
    }

    #[test]
    fn test_request_url_encodes_tag_and_params() {
        let endpoint = Url::parse("http://192.168.1.123:8000/").unwrap();
        let event = NotificationEvent::new("didFail")
            .with("source", "location")
            .with("error", "denied & gone");
        assert_eq!(
            request_url(&endpoint, &event).as_str(),
            "http://192.168.1.123:8000/?didFail&source=location&error=denied%20%26%20gone"
        );
    }

    #[test]
    fn test_request_url_uses_percent20_for_spaces() {
        let endpoint = Url::parse("http://localhost:8000/").unwrap();
        let event = NotificationEvent::new("didChangeActivity")
            .with("activities", "stationary,driving")
            .with("note", "a+b c");
        let url = request_url(&endpoint, &event);
        assert_eq!(
            url.query(),
            Some("didChangeActivity&activities=stationary%2Cdriving&note=a%2Bb%20c")
        );
        let decoded: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(decoded[2], ("note".to_string(), "a+b c".to_string()));
    }

    #[test]
    fn test_request_url_without_params() {
        let endpoint = Url::parse("http://localhost:8000/").unwrap();
        let url = request_url(&endpoint, &NotificationEvent::new("RESIGN_ACTIVE"));
        assert_eq!(url.query(), Some("RESIGN_ACTIVE"));
    }

    #[test]
    fn test_enabled_dispatches_one_request_per_event() {
        let transport = Arc::new(RecordingTransport::default());
        let board = Arc::new(StatusBoard::new(SamplingInterval::default()));
        let (ui, mut executor) = UiContext::new(board.clone());
        let dispatcher =
            Dispatcher::new(&settings(true), transport.clone(), Arc::new(Silent), ui).unwrap();

        dispatcher.submit(&Reading::now(Payload::Acceleration(Vector3::new(
            1.0, 2.0, 3.0,
        ))));

        let urls = transport.urls();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].query(), Some("accel&x=1&y=2&z=3"));
        executor.drain();
        assert_eq!(board.snapshot().status, "accel x=1 y=2 z=3");
        assert_eq!(dispatcher.stats().dispatched, 1);
        assert_eq!(
            dispatcher.last_event().unwrap().summary,
            "accel x=1 y=2 z=3"
        );
    }

    #[test]
    fn test_disabled_never_touches_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let board = Arc::new(StatusBoard::new(SamplingInterval::default()));
        let (ui, _executor) = UiContext::new(board);
        let dispatcher =
            Dispatcher::new(&settings(false), transport.clone(), Arc::new(Silent), ui).unwrap();

        for _ in 0..5 {
            dispatcher.notify(&NotificationEvent::new("gyro"));
        }

        assert!(transport.urls().is_empty());
        let stats = dispatcher.stats();
        assert_eq!(stats.events, 5);
        assert_eq!(stats.suppressed, 5);
        assert_eq!(stats.dispatched, 0);
    }

    #[test]
    fn test_sound_and_label_follow_settings() {
        let transport = Arc::new(RecordingTransport::default());
        let cue = Arc::new(CountingCue::default());
        let board = Arc::new(StatusBoard::new(SamplingInterval::default()));
        let (ui, mut executor) = UiContext::new(board.clone());
        let mut config = settings(true);
        config.sound_on_event = true;
        config.label_on_event = false;
        let dispatcher = Dispatcher::new(&config, transport, cue.clone(), ui).unwrap();

        dispatcher.notify(&NotificationEvent::new("mag"));

        assert_eq!(cue.0.load(Ordering::SeqCst), 1);
        assert_eq!(executor.drain(), 0);
        assert_eq!(board.snapshot().status, "Running");
    }

    #[test]
    fn test_failing_transport_does_not_stop_later_events() {
        let transport = Arc::new(RecordingTransport::failing());
        let board = Arc::new(StatusBoard::new(SamplingInterval::default()));
        let (ui, _executor) = UiContext::new(board);
        let dispatcher =
            Dispatcher::new(&settings(true), transport.clone(), Arc::new(Silent), ui).unwrap();

        dispatcher.notify(&NotificationEvent::new("accel"));
        dispatcher.notify(&NotificationEvent::new("gyro"));
        dispatcher.notify(&NotificationEvent::new("mag"));

        let queries: Vec<_> = transport
            .urls()
            .iter()
            .map(|u| u.query().unwrap_or_default().to_string())
            .collect();
        assert_eq!(queries, vec!["accel", "gyro", "mag"]);
        assert_eq!(transport.failures(), 3);
    }
}
