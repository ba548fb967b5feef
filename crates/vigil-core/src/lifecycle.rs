//! Host lifecycle transitions as pipeline events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::registry::SourceRegistry;
use crate::types::{LifecycleEvent, Payload, Reading, SamplingInterval, SourceId};
use crate::ui::UiUpdate;

/// Turns lifecycle transitions into notifications and applies the resource
/// policy that goes with them.
///
/// - Every transition is sent through the dispatcher while the `lifecycle`
///   source is enabled.
/// - Resigning active forces the sampling interval back to the configured
///   conservative value.
/// - With background updates disabled, entering the background stops all
///   sources and returning to the foreground restarts them.
pub struct LifecycleBridge {
    registry: Arc<SourceRegistry>,
    dispatcher: Arc<Dispatcher>,
    resign_interval: SamplingInterval,
    background_updates: bool,
    suspended: AtomicBool,
}

impl LifecycleBridge {
    #[must_use]
    pub fn new(registry: Arc<SourceRegistry>, dispatcher: Arc<Dispatcher>, config: &Config) -> Self {
        Self {
            registry,
            dispatcher,
            resign_interval: config.sampling.resign_active_interval_secs,
            background_updates: config.location.background_updates,
            suspended: AtomicBool::new(false),
        }
    }

    pub fn handle(&self, event: LifecycleEvent) {
        info!(event = event.as_str(), "lifecycle transition");

        if self.registry.is_enabled(SourceId::Lifecycle) {
            self.dispatcher
                .submit(&Reading::now(Payload::Lifecycle(event)));
        }

        match event {
            LifecycleEvent::WillResignActive => {
                self.registry.apply_interval(self.resign_interval);
                self.dispatcher
                    .ui()
                    .post(UiUpdate::Interval(self.resign_interval));
            }
            LifecycleEvent::DidEnterBackground if !self.background_updates => {
                if self.registry.is_running() {
                    self.registry.stop_all();
                    self.suspended.store(true, Ordering::SeqCst);
                    self.dispatcher.ui().post(UiUpdate::Running(false));
                    info!("background updates disabled, sources suspended");
                }
            }
            LifecycleEvent::WillEnterForeground => {
                if self.suspended.swap(false, Ordering::SeqCst) {
                    self.registry.start_all();
                    self.dispatcher.ui().post(UiUpdate::Running(true));
                    info!("sources resumed");
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Silent;
    use crate::mock::{MockPlatform, RecordingTransport};
    use crate::ui::{StatusBoard, UiContext, UiExecutor};

    struct Fixture {
        platform: MockPlatform,
        transport: Arc<RecordingTransport>,
        registry: Arc<SourceRegistry>,
        bridge: LifecycleBridge,
        board: Arc<StatusBoard>,
        executor: UiExecutor,
    }

    fn fixture(config: &Config) -> Fixture {
        let platform = MockPlatform::new();
        let transport = Arc::new(RecordingTransport::default());
        let board = Arc::new(StatusBoard::new(config.sampling.interval_secs));
        let (ui, executor) = UiContext::new(board.clone());
        let dispatcher = Arc::new(
            Dispatcher::new(&config.notifications, transport.clone(), Arc::new(Silent), ui)
                .unwrap(),
        );
        let registry = Arc::new(SourceRegistry::new(
            Arc::new(platform.clone()),
            dispatcher.reading_callback(),
            config.sampling.interval_secs,
        ));
        registry.setup(config);
        let bridge = LifecycleBridge::new(Arc::clone(&registry), dispatcher, config);
        Fixture {
            platform,
            transport,
            registry,
            bridge,
            board,
            executor,
        }
    }

    #[test]
    fn test_transitions_are_notified() {
        let f = fixture(&Config::default());
        for event in LifecycleEvent::ALL {
            f.bridge.handle(event);
        }
        assert_eq!(
            f.transport.tags(),
            vec![
                "DID_FINISH_LAUNCHING",
                "DID_BECOME_ACTIVE",
                "RESIGN_ACTIVE",
                "WILL_ENTER_FOREGROUND",
                "DID_ENTER_BACKGROUND"
            ]
        );
    }

    #[test]
    fn test_resign_active_restores_conservative_interval() {
        let mut f = fixture(&Config::default());
        f.registry.start_all();
        f.registry.set_interval(1.0).unwrap();

        f.bridge.handle(LifecycleEvent::WillResignActive);

        assert_eq!(f.registry.interval().as_secs(), 10.0);
        assert_eq!(
            f.platform.interval(SourceId::Accelerometer).unwrap().as_secs(),
            10.0
        );
        f.executor.drain();
        assert_eq!(f.board.snapshot().interval, "10s");
    }

    #[test]
    fn test_disabled_lifecycle_source_still_applies_policy() {
        let mut config = Config::default();
        config.sources.disabled = vec![SourceId::Lifecycle];
        let f = fixture(&config);
        f.registry.set_interval(5.0).unwrap();

        f.bridge.handle(LifecycleEvent::WillResignActive);

        assert!(f.transport.urls().is_empty());
        assert_eq!(f.registry.interval().as_secs(), 10.0);
    }

    #[test]
    fn test_background_suspend_and_resume() {
        let mut config = Config::default();
        config.location.background_updates = false;
        let f = fixture(&config);
        f.registry.start_all();

        f.bridge.handle(LifecycleEvent::DidEnterBackground);
        assert!(!f.registry.is_running());
        assert_eq!(f.platform.live(SourceId::Accelerometer), 0);

        f.bridge.handle(LifecycleEvent::WillEnterForeground);
        assert!(f.registry.is_running());
        assert_eq!(f.platform.live(SourceId::Accelerometer), 1);
        assert_eq!(f.platform.max_live(SourceId::Accelerometer), 1);
    }

    #[test]
    fn test_background_updates_keep_sources_running() {
        let f = fixture(&Config::default());
        f.registry.start_all();
        f.bridge.handle(LifecycleEvent::DidEnterBackground);
        assert!(f.registry.is_running());
        assert_eq!(f.platform.live(SourceId::Gyroscope), 1);
    }

    #[test]
    fn test_foreground_without_suspend_does_not_start() {
        let mut config = Config::default();
        config.location.background_updates = false;
        let f = fixture(&config);
        f.bridge.handle(LifecycleEvent::WillEnterForeground);
        assert!(!f.registry.is_running());
    }
}
