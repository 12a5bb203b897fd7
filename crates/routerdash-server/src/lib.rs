//! Mock router management API.
//!
//! Serves the same JSON endpoints as the device daemon from synthetic data:
//! metrics follow a bounded random walk, and the MQTT broker is a flag plus
//! counters, exactly as much state as the daemon itself keeps. Console
//! commands (`GET /?command=...`) are recorded and echoed back, never run.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use routerdash_core::{
    API_ENDPOINTS, BandwidthMetrics, CommandAck, CommandHistory, CommandOutput, CpuMetrics,
    FirmwareInfo, LinkStatus, MemoryMetrics, MetricsSnapshot, MqttStatus, NetworkInfo,
    ServerConfig, StorageMetrics, SystemInfo, normalize_command,
};

const MEMORY_TOTAL_MB: u64 = 1024;
const STORAGE_TOTAL_MB: u64 = 4096;

/// Synthetic device backing the mock API.
pub struct SyntheticDevice {
    rng: StdRng,
    cpu: f64,
    memory_used: u64,
    storage_used: u64,
    download: f64,
    upload: f64,
    mqtt: MqttStatus,
    commands: CommandHistory,
    booted: Instant,
}

impl SyntheticDevice {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            cpu: 12.0,
            memory_used: 384,
            storage_used: 1200,
            download: 120.0,
            upload: 35.0,
            mqtt: MqttStatus::default(),
            commands: CommandHistory::default(),
            booted: Instant::now(),
        }
    }

    /// Advance the random walk one step and report it.
    pub fn next_snapshot(&mut self) -> MetricsSnapshot {
        self.cpu = (self.cpu + self.rng.random_range(-8.0..8.0)).clamp(1.0, 99.0);
        self.memory_used = step(&mut self.rng, self.memory_used, 24, 64, MEMORY_TOTAL_MB - 32);
        self.storage_used = step(&mut self.rng, self.storage_used, 4, 256, STORAGE_TOTAL_MB);
        self.download = (self.download + self.rng.random_range(-40.0..40.0)).clamp(0.0, 2048.0);
        self.upload = (self.upload + self.rng.random_range(-10.0..10.0)).clamp(0.0, 512.0);

        let memory_usage = 100.0 * self.memory_used as f64 / MEMORY_TOTAL_MB as f64;
        let mut storage =
            StorageMetrics::from_megabytes(self.storage_used, STORAGE_TOTAL_MB - self.storage_used);
        storage.usage = round1(storage.usage);

        MetricsSnapshot {
            cpu: CpuMetrics {
                usage: round1(self.cpu),
            },
            memory: MemoryMetrics {
                usage: round1(memory_usage),
                used: self.memory_used,
                total: MEMORY_TOTAL_MB,
            },
            storage,
            bandwidth: BandwidthMetrics {
                download: round1(self.download),
                upload: round1(self.upload),
            },
            internet: LinkStatus {
                connected: self.rng.random_bool(0.95),
            },
            ultima_server: LinkStatus {
                connected: self.rng.random_bool(0.9),
            },
        }
    }

    pub fn mqtt_status(&self) -> MqttStatus {
        self.mqtt
    }

    /// Start the broker, resetting its counters.
    pub fn start_mqtt(&mut self) {
        self.mqtt = MqttStatus {
            running: true,
            ..MqttStatus::default()
        };
    }

    pub fn stop_mqtt(&mut self) {
        self.mqtt.running = false;
    }

    /// Record a console command and answer without running it.
    pub fn echo_command(&mut self, command: String) -> CommandOutput {
        self.commands.push(command.clone());
        CommandOutput {
            output: format!("mock device: `{command}` not executed\n"),
            command,
            exit_status: 0,
        }
    }

    pub fn command_history(&self) -> &CommandHistory {
        &self.commands
    }

    fn uptime(&self) -> String {
        let secs = self.booted.elapsed().as_secs();
        let (days, hours, mins) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60);
        if days > 0 {
            format!("up {days} days, {hours}:{mins:02}")
        } else {
            format!("up {hours}:{mins:02}")
        }
    }
}

fn step(rng: &mut StdRng, value: u64, max_delta: u64, lo: u64, hi: u64) -> u64 {
    let delta = rng.random_range(0..=2 * max_delta);
    (value + delta).saturating_sub(max_delta).clamp(lo, hi)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Shared server state.
struct AppState {
    device: Mutex<SyntheticDevice>,
}

#[derive(Deserialize)]
struct ConsoleQuery {
    command: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

async fn handle_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    let mut device = state.device.lock().await;
    Json(device.next_snapshot())
}

async fn handle_system(State(state): State<Arc<AppState>>) -> Json<SystemInfo> {
    let device = state.device.lock().await;
    Json(SystemInfo {
        os_version: "OpenWrt 23.05.2".to_string(),
        kernel_version: "5.15.137".to_string(),
        uptime: device.uptime(),
        cpu_info: "ARMv8 Processor rev 4 (v8l)".to_string(),
    })
}

async fn handle_network() -> Json<NetworkInfo> {
    Json(NetworkInfo {
        interfaces: "br-lan\neth0\nlo\nwlan0\n".to_string(),
        ip_addresses: "inet 192.168.1.1/24 brd 192.168.1.255 scope global br-lan\n\
                       inet 127.0.0.1/8 scope host lo\n"
            .to_string(),
        routing: "0.0.0.0         10.0.0.1        0.0.0.0         UG    0      0        0 eth0\n\
                  192.168.1.0     0.0.0.0         255.255.255.0   U     0      0        0 br-lan\n"
            .to_string(),
    })
}

async fn handle_firmware() -> Json<FirmwareInfo> {
    Json(FirmwareInfo {
        version: "OpenWrt 23.05.2".to_string(),
        build_date: "2024-01-15".to_string(),
        architecture: "aarch64".to_string(),
        status: "stable".to_string(),
        update_available: false,
    })
}

async fn handle_mqtt_status(State(state): State<Arc<AppState>>) -> Json<MqttStatus> {
    let device = state.device.lock().await;
    Json(device.mqtt_status())
}

async fn handle_mqtt_start(State(state): State<Arc<AppState>>) -> Json<CommandAck> {
    state.device.lock().await.start_mqtt();
    log::info!("mqtt broker started");
    Json(CommandAck { success: true })
}

async fn handle_mqtt_stop(State(state): State<Arc<AppState>>) -> Json<CommandAck> {
    state.device.lock().await.stop_mqtt();
    log::info!("mqtt broker stopped");
    Json(CommandAck { success: true })
}

async fn handle_index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConsoleQuery>,
) -> Response {
    if let Some(command) = query.command.as_deref().and_then(normalize_command) {
        log::info!("console command received: {command}");
        let output = state.device.lock().await.echo_command(command);
        return Json(output).into_response();
    }
    index().into_response()
}

fn index() -> Json<serde_json::Value> {
    let endpoints: serde_json::Map<String, serde_json::Value> = API_ENDPOINTS
        .iter()
        .filter(|e| !e.stub)
        .map(|e| {
            (
                e.path.to_string(),
                serde_json::json!({ "method": e.method, "description": e.summary }),
            )
        })
        .collect();
    Json(serde_json::json!({
        "name": "routerdash mock device",
        "version": routerdash_core::VERSION,
        "endpoints": endpoints,
    }))
}

async fn handle_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "The requested API was not found",
        }),
    )
}

/// Build the axum router.
pub fn build_router(device: SyntheticDevice) -> Router {
    let state = Arc::new(AppState {
        device: Mutex::new(device),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/api/metrics", get(handle_metrics))
        .route("/api/system", get(handle_system))
        .route("/api/network", get(handle_network))
        .route("/api/firmware", get(handle_firmware))
        .route("/api/mqtt/status", get(handle_mqtt_status))
        .route("/api/mqtt/start", post(handle_mqtt_start))
        .route("/api/mqtt/stop", post(handle_mqtt_stop))
        .fallback(handle_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the mock API on an already bound listener.
pub async fn serve(listener: TcpListener, device: SyntheticDevice) -> io::Result<()> {
    axum::serve(listener, build_router(device)).await
}

/// Bind `config` and run the mock device API until the process exits.
pub async fn run_server(config: &ServerConfig, seed: Option<u64>) -> io::Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    log::info!("mock device API listening on http://{}", listener.local_addr()?);
    serve(listener, SyntheticDevice::new(seed)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use tower::util::ServiceExt;

    fn app() -> Router {
        build_router(SyntheticDevice::new(Some(7)))
    }

    async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn metrics_body_parses_as_snapshot() {
        let (status, body) = call(app(), Method::GET, "/api/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let snapshot: MetricsSnapshot = serde_json::from_value(body).unwrap();
        assert!((0.0..=100.0).contains(&snapshot.cpu.usage));
        assert_eq!(snapshot.memory.total, MEMORY_TOTAL_MB);
        assert_eq!(
            snapshot.storage.used + snapshot.storage.free,
            snapshot.storage.total
        );
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        let (status, body) = call(app(), Method::GET, "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "The requested API was not found");
    }

    #[tokio::test]
    async fn mqtt_start_then_status() {
        let app = app();
        let (_, body) = call(app.clone(), Method::GET, "/api/mqtt/status").await;
        assert_eq!(body["running"], false);
        let (status, body) = call(app.clone(), Method::POST, "/api/mqtt/start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let (_, body) = call(app.clone(), Method::GET, "/api/mqtt/status").await;
        assert_eq!(body["running"], true);
        assert_eq!(body["clients"], 0);
        call(app.clone(), Method::POST, "/api/mqtt/stop").await;
        let (_, body) = call(app, Method::GET, "/api/mqtt/status").await;
        assert_eq!(body["running"], false);
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/firmware")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn system_info_uses_device_keys() {
        let (_, body) = call(app(), Method::GET, "/api/system").await;
        assert!(body["openwrt_version"].is_string());
        assert!(body["uptime"].as_str().unwrap().starts_with("up "));
    }

    #[tokio::test]
    async fn index_lists_live_endpoints_only() {
        let (_, body) = call(app(), Method::GET, "/").await;
        let endpoints = body["endpoints"].as_object().unwrap();
        assert!(endpoints.contains_key("/api/metrics"));
        assert!(!endpoints.contains_key("/api/system/backup"));
    }

    #[tokio::test]
    async fn console_command_is_echoed_not_run() {
        let (status, body) = call(app(), Method::GET, "/?command=uname%20-a").await;
        assert_eq!(status, StatusCode::OK);
        let out: CommandOutput = serde_json::from_value(body).unwrap();
        assert_eq!(out.command, "uname -a");
        assert!(out.output.contains("not executed"));
        assert_eq!(out.exit_status, 0);
    }

    #[tokio::test]
    async fn blank_command_serves_index() {
        let (_, body) = call(app(), Method::GET, "/?command=+").await;
        assert!(body["endpoints"].is_object());
    }

    #[test]
    fn device_keeps_bounded_command_history() {
        let mut device = SyntheticDevice::new(Some(3));
        for i in 0..12 {
            device.echo_command(format!("echo {i}"));
        }
        let history = device.command_history();
        assert_eq!(history.len(), routerdash_core::COMMAND_HISTORY_LEN);
        assert_eq!(history.recall(1), Some("echo 11"));
        assert_eq!(history.iter().next(), Some("echo 2"));
    }

    #[test]
    fn random_walk_stays_in_bounds() {
        let mut device = SyntheticDevice::new(Some(1));
        for _ in 0..1000 {
            let s = device.next_snapshot();
            assert!((1.0..=99.0).contains(&s.cpu.usage));
            assert!(s.memory.used <= MEMORY_TOTAL_MB);
            assert!(s.storage.used <= STORAGE_TOTAL_MB);
            assert!(s.bandwidth.download >= 0.0);
        }
    }
}
