//! # vigil-server
//!
//! Runs the vigil event pipeline on this machine.
//!
//! This binary:
//! - Loads configuration (`$VIGIL_CONFIG`, else the platform default path)
//! - Subscribes to every source of the simulated sensor platform
//! - Sends one diagnostic `GET` per event to `notifications.host:port`
//! - Serves the local control API on `server.bind`
//!
//! ## Running
//!
//! ```bash
//! # Listener on the development machine
//! python3 -m http.server 8000
//!
//! # Pipeline
//! VIGIL__NOTIFICATIONS__HOST=192.168.1.123 cargo run --package vigil-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use vigil_core::{
    Config, FeedbackCue, HttpTransport, LifecycleEvent, SensorPlatform, Silent, TerminalBell,
};
use vigil_server::{api, logging, state::AppState};

/// Environment variable naming an explicit configuration file.
const CONFIG_ENV: &str = "VIGIL_CONFIG";

/// How long shutdown pings get to reach the listener.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    logging::init(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting vigil-server");

    let platform = build_platform(&config)?;
    let transport = Arc::new(HttpTransport::new()?);
    let cue: Arc<dyn FeedbackCue> = if config.notifications.sound_on_event {
        Arc::new(TerminalBell)
    } else {
        Arc::new(Silent)
    };

    let (state, executor) = AppState::build(config.clone(), platform, transport, cue)?;
    let ui_task = tokio::spawn(executor.run());

    let notifier = state.notifier();
    notifier.lifecycle(LifecycleEvent::DidFinishLaunching);
    notifier.lifecycle(LifecycleEvent::DidBecomeActive);
    let started = notifier.start_updates();
    info!(
        started,
        endpoint = %notifier.dispatcher().endpoint(),
        notifications = notifier.dispatcher().notifications_enabled(),
        "pipeline running"
    );

    let app = api::create_router(state.clone()).layer(TraceLayer::new_for_http());
    let listener = TcpListener::bind(config.server.bind).await?;
    info!("Control API listening on {}", config.server.bind);

    let shutdown = setup_signal_handlers();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown.await;
        })
        .await?;

    state.wind_down(SHUTDOWN_GRACE).await;
    ui_task.abort();

    info!("vigil-server stopped");
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load()?,
    };
    Ok(config)
}

#[cfg(feature = "simulator")]
fn build_platform(config: &Config) -> anyhow::Result<Arc<dyn SensorPlatform>> {
    Ok(Arc::new(vigil_core::SimulatedPlatform::new(config.location)?))
}

#[cfg(all(not(feature = "simulator"), feature = "mock-sensors"))]
fn build_platform(_config: &Config) -> anyhow::Result<Arc<dyn SensorPlatform>> {
    Ok(Arc::new(vigil_core::MockPlatform::new()))
}

#[cfg(not(any(feature = "simulator", feature = "mock-sensors")))]
compile_error!("vigil-server needs the `simulator` or `mock-sensors` feature");

/// Resolves once SIGINT or SIGTERM (Ctrl+C elsewhere) arrives.
fn setup_signal_handlers() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match (
                signal(SignalKind::interrupt()),
                signal(SignalKind::terminate()),
            ) {
                (Ok(mut sigint), Ok(mut sigterm)) => {
                    tokio::select! {
                        _ = sigint.recv() => info!("Received SIGINT, initiating shutdown..."),
                        _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown..."),
                    }
                }
                _ => {
                    error!("Failed to install signal handlers, waiting for Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Received Ctrl+C, initiating shutdown...");
        }

        let _ = tx.send(());
    });

    rx
}
