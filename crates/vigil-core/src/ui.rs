//! Marshalling of display updates onto the single UI-capable context.
//!
//! Events are produced on whatever task the platform picked. Label changes
//! are posted through a [`UiContext`] and applied, in posting order, by the
//! one [`UiExecutor`] task. The observer that receives them is fixed when the
//! context is created.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;
use utoipa::ToSchema;

use crate::types::SamplingInterval;

/// A change to what the user sees.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// Replace the status label.
    Status(String),
    /// Replace the interval label.
    Interval(SamplingInterval),
    /// Running state of the sources changed.
    Running(bool),
}

/// Receives updates on the UI context.
pub trait StatusObserver: Send + Sync {
    fn on_update(&self, update: &UiUpdate);
}

/// Cheap handle for posting updates from any thread.
#[derive(Clone)]
pub struct UiContext {
    tx: mpsc::UnboundedSender<UiUpdate>,
}

impl UiContext {
    /// Create a context delivering to `observer`, plus the executor that
    /// must be driven on the UI task.
    #[must_use]
    pub fn new(observer: Arc<dyn StatusObserver>) -> (Self, UiExecutor) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiExecutor { rx, observer })
    }

    /// Queue an update. Never blocks; dropped once the executor is gone.
    pub fn post(&self, update: UiUpdate) {
        if self.tx.send(update).is_err() {
            trace!("ui executor gone, update dropped");
        }
    }
}

/// Owns the receiving end and applies updates to the observer.
pub struct UiExecutor {
    rx: mpsc::UnboundedReceiver<UiUpdate>,
    observer: Arc<dyn StatusObserver>,
}

impl UiExecutor {
    /// Apply updates until every [`UiContext`] has been dropped.
    pub async fn run(mut self) {
        while let Some(update) = self.rx.recv().await {
            self.observer.on_update(&update);
        }
    }

    /// Apply whatever is queued right now without waiting. Returns the count.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            self.observer.on_update(&update);
            applied += 1;
        }
        applied
    }
}

/// Current label contents.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatusSnapshot {
    /// Main status label.
    #[schema(example = "accel x=0.01 y=-0.02 z=-1")]
    pub status: String,

    /// Interval label.
    #[schema(example = "10s")]
    pub interval: String,

    /// Whether sources are currently started.
    pub running: bool,
}

/// The status screen: one label, one interval label, a running flag.
#[derive(Debug)]
pub struct StatusBoard {
    state: RwLock<StatusSnapshot>,
}

impl StatusBoard {
    #[must_use]
    pub fn new(interval: SamplingInterval) -> Self {
        Self {
            state: RwLock::new(StatusSnapshot {
                status: "Running".to_string(),
                interval: interval.to_string(),
                running: false,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatusObserver for StatusBoard {
    fn on_update(&self, update: &UiUpdate) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match update {
            UiUpdate::Status(text) => state.status.clone_from(text),
            UiUpdate::Interval(interval) => state.interval = interval.to_string(),
            UiUpdate::Running(running) => state.running = *running,
        }
    }
}
