//! The event notifier: registry, dispatcher and lifecycle bridge wired
//! together, plus the user-facing control commands.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::event::NotificationEvent;
use crate::feedback::FeedbackCue;
use crate::lifecycle::LifecycleBridge;
use crate::platform::SensorPlatform;
use crate::registry::SourceRegistry;
use crate::transport::Transport;
use crate::types::{LifecycleEvent, SamplingInterval};
use crate::ui::{UiContext, UiUpdate};

/// Owns every source and the sink they feed.
pub struct EventNotifier {
    registry: Arc<SourceRegistry>,
    dispatcher: Arc<Dispatcher>,
    lifecycle: LifecycleBridge,
}

impl EventNotifier {
    /// Build the pipeline and run source setup. Nothing is started yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification endpoint is invalid.
    pub fn new(
        config: &Config,
        platform: Arc<dyn SensorPlatform>,
        transport: Arc<dyn Transport>,
        cue: Arc<dyn FeedbackCue>,
        ui: UiContext,
    ) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::new(&config.notifications, transport, cue, ui)?);
        let registry = Arc::new(SourceRegistry::new(
            platform,
            dispatcher.reading_callback(),
            config.sampling.interval_secs,
        ));
        registry.setup(config);
        let lifecycle = LifecycleBridge::new(Arc::clone(&registry), Arc::clone(&dispatcher), config);

        Ok(Self {
            registry,
            dispatcher,
            lifecycle,
        })
    }

    /// Start (or restart) every source. Returns how many started.
    pub fn start_updates(&self) -> usize {
        let started = self.registry.start_all();
        self.dispatcher.notify(&NotificationEvent::new("START_UPDATES"));
        self.dispatcher.ui().post(UiUpdate::Running(true));
        started
    }

    /// Stop every source.
    pub fn stop_updates(&self) {
        self.registry.stop_all();
        self.dispatcher.notify(&NotificationEvent::new("STOP_UPDATES"));
        self.dispatcher.ui().post(UiUpdate::Running(false));
    }

    /// Change the motion sampling interval.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::InvalidInterval`](crate::error::VigilError::InvalidInterval)
    /// for non-positive or non-finite values.
    pub fn set_interval(&self, secs: f64) -> Result<SamplingInterval> {
        let interval = self.registry.set_interval(secs)?;
        info!(interval = %interval, "sampling interval changed");
        self.dispatcher
            .notify(&NotificationEvent::new("SET_INTERVAL").with("seconds", interval.as_secs()));
        self.dispatcher.ui().post(UiUpdate::Interval(interval));
        Ok(interval)
    }

    /// Forward a host lifecycle transition.
    pub fn lifecycle(&self, event: LifecycleEvent) {
        self.lifecycle.handle(event);
    }

    #[must_use]
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
