//! Control API tests against a mock sensor platform.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use vigil_core::{
    Config, MockPlatform, Payload, RecordingTransport, Silent, SourceId, UiExecutor, Vector3,
};
use vigil_server::api::create_router;
use vigil_server::state::{AppState, SharedState};

struct Harness {
    server: TestServer,
    platform: MockPlatform,
    transport: Arc<RecordingTransport>,
    executor: UiExecutor,
    state: SharedState,
}

fn harness(config: Config) -> Harness {
    let platform = MockPlatform::new();
    let transport = Arc::new(RecordingTransport::default());
    let (state, executor) = AppState::build(
        config,
        Arc::new(platform.clone()),
        transport.clone(),
        Arc::new(Silent),
    )
    .unwrap();
    let server = TestServer::new(create_router(state.clone())).unwrap();
    Harness {
        server,
        platform,
        transport,
        executor,
        state,
    }
}

#[tokio::test]
async fn health_reports_running_state() {
    let h = harness(Config::default());

    let body: Value = h.server.get("/health").await.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["running"], false);

    h.server.post("/api/updates/start").await.assert_status_ok();
    let body: Value = h.server.get("/health").await.json();
    assert_eq!(body["running"], true);
}

#[tokio::test]
async fn start_and_stop_emit_control_pings() {
    let h = harness(Config::default());

    let response = h.server.post("/api/updates/start").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["running"], true);
    assert_eq!(body["sources_started"], 8);
    assert_eq!(h.platform.live(SourceId::Accelerometer), 1);

    h.server.post("/api/updates/start").await.assert_status_ok();
    assert_eq!(h.platform.max_live(SourceId::Accelerometer), 1);

    h.server.post("/api/updates/stop").await.assert_status_ok();
    assert_eq!(h.platform.live(SourceId::Accelerometer), 0);
    assert_eq!(
        h.transport.tags(),
        vec!["START_UPDATES", "START_UPDATES", "STOP_UPDATES"]
    );
}

#[tokio::test]
async fn interval_is_validated_and_propagated() {
    let h = harness(Config::default());

    let response = h
        .server
        .put("/api/interval")
        .json(&json!({ "seconds": 5.0 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["label"], "5s");
    assert_eq!(
        h.platform.interval(SourceId::Gyroscope).unwrap().as_secs(),
        5.0
    );

    let response = h
        .server
        .put("/api/interval")
        .json(&json!({ "seconds": -1.0 }))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "INVALID_INTERVAL");

    let body: Value = h.server.get("/api/interval").await.json();
    assert_eq!(body["seconds"], 5.0);
    assert_eq!(h.transport.tags(), vec!["SET_INTERVAL"]);
}

#[tokio::test]
async fn sources_can_be_toggled_at_runtime() {
    let h = harness(Config::default());
    h.server.post("/api/updates/start").await.assert_status_ok();

    let response = h
        .server
        .put("/api/sources/gyroscope")
        .json(&json!({ "enabled": false }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["enabled"], false);
    assert_eq!(body["active"], false);
    assert_eq!(
        h.platform
            .emit(SourceId::Gyroscope, Payload::RotationRate(Vector3::default())),
        0
    );

    h.server
        .put("/api/sources/gyroscope")
        .json(&json!({ "enabled": true }))
        .await
        .assert_status_ok();
    assert_eq!(h.platform.live(SourceId::Gyroscope), 1);

    h.server
        .put("/api/sources/barometer")
        .json(&json!({ "enabled": true }))
        .expect_failure()
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let body: Value = h.server.get("/api/sources").await.json();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["source"].as_str())
        .collect();
    assert!(names.contains(&"device-motion"));
    assert!(names.contains(&"lifecycle"));
}

#[tokio::test]
async fn lifecycle_resign_restores_interval() {
    let h = harness(Config::default());
    h.server
        .put("/api/interval")
        .json(&json!({ "seconds": 1.0 }))
        .await
        .assert_status_ok();

    let response = h.server.post("/api/lifecycle/will-resign-active").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["tag"], "RESIGN_ACTIVE");
    assert_eq!(h.state.notifier().registry().interval().as_secs(), 10.0);

    h.server
        .post("/api/lifecycle/did-explode")
        .expect_failure()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_and_inspector_follow_events() {
    let mut h = harness(Config::default());
    h.server.post("/api/updates/start").await.assert_status_ok();
    h.platform.emit(
        SourceId::Accelerometer,
        Payload::Acceleration(Vector3::new(1.0, 2.0, 3.0)),
    );
    h.executor.drain();

    let body: Value = h.server.get("/api/status").await.json();
    assert_eq!(body["status"], "accel x=1 y=2 z=3");
    assert_eq!(body["running"], true);
    assert_eq!(body["interval"], "10s");

    let body: Value = h.server.get("/api/inspector").await.json();
    assert_eq!(body["stats"]["dispatched"], 2);
    assert_eq!(body["last_event"]["summary"], "accel x=1 y=2 z=3");
    assert_eq!(body["endpoint"], "http://127.0.0.1:8000/");
    assert_eq!(body["config"]["notifications"]["port"], 8000);
}

#[tokio::test]
async fn disabled_notifications_never_reach_transport() {
    let mut config = Config::default();
    config.notifications.enabled = false;
    let h = harness(config);

    h.server.post("/api/updates/start").await.assert_status_ok();
    h.platform.emit(
        SourceId::Magnetometer,
        Payload::MagneticField(Vector3::new(1.0, 1.0, 1.0)),
    );
    h.server
        .post("/api/lifecycle/did-enter-background")
        .await
        .assert_status_ok();
    h.server.post("/api/updates/stop").await.assert_status_ok();

    assert!(h.transport.urls().is_empty());
    let body: Value = h.server.get("/api/inspector").await.json();
    assert_eq!(body["notifications_enabled"], false);
    assert_eq!(body["stats"]["suppressed"], 4);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let h = harness(Config::default());
    let body: Value = h.server.get("/api/openapi.json").await.json();
    assert_eq!(body["info"]["title"], "vigil API");
}

#[tokio::test]
async fn wind_down_reports_shutdown_then_waits() {
    let h = harness(Config::default());
    h.server.post("/api/updates/start").await.assert_status_ok();

    let grace = Duration::from_millis(50);
    let started = tokio::time::Instant::now();
    h.state.wind_down(grace).await;
    assert!(started.elapsed() >= grace);

    let tags = h.transport.tags();
    assert_eq!(
        tags[tags.len() - 3..],
        ["RESIGN_ACTIVE", "DID_ENTER_BACKGROUND", "STOP_UPDATES"]
    );
    assert_eq!(h.platform.live(SourceId::Accelerometer), 0);
    assert!(!h.state.notifier().registry().is_running());
}
