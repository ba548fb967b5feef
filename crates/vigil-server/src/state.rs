//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;
use vigil_core::{
    Config, EventNotifier, FeedbackCue, LifecycleEvent, SensorPlatform, StatusBoard, Transport,
    UiContext, UiExecutor,
};

/// State handed to every handler.
pub type SharedState = Arc<AppState>;

/// The running pipeline plus what the control API needs to describe it.
pub struct AppState {
    config: Config,
    notifier: EventNotifier,
    board: Arc<StatusBoard>,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Assemble the pipeline for `config`.
    ///
    /// Returns the shared state and the UI executor, which the caller must
    /// drive for the status board to reflect updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification endpoint is invalid.
    pub fn build(
        config: Config,
        platform: Arc<dyn SensorPlatform>,
        transport: Arc<dyn Transport>,
        cue: Arc<dyn FeedbackCue>,
    ) -> anyhow::Result<(SharedState, UiExecutor)> {
        let board = Arc::new(StatusBoard::new(config.sampling.interval_secs));
        let (ui, executor) = UiContext::new(board.clone());
        let notifier = EventNotifier::new(&config, platform, transport, cue, ui)?;

        let state = Arc::new(Self {
            config,
            notifier,
            board,
            started_at: Utc::now(),
        });
        Ok((state, executor))
    }

    /// Effective configuration as loaded at startup.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    /// Status labels as last applied by the UI executor.
    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    pub fn uptime_secs(&self) -> u64 {
        u64::try_from((Utc::now() - self.started_at).num_seconds()).unwrap_or(0)
    }

    /// Walk the pipeline through resign, background and stop, then wait
    /// `grace` so pings already handed to the transport can leave before the
    /// runtime goes away.
    pub async fn wind_down(&self, grace: Duration) {
        self.notifier.lifecycle(LifecycleEvent::WillResignActive);
        self.notifier.lifecycle(LifecycleEvent::DidEnterBackground);
        self.notifier.stop_updates();
        info!(grace_ms = grace.as_millis(), "waiting for in-flight pings");
        tokio::time::sleep(grace).await;
    }
}
