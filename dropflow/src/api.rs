use crate::state::FilterStats;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dropflow_filter::{PortLookup, PortSlot};
use ipnet::IpNet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub stats: Arc<FilterStats>,
    pub slot: Arc<PortSlot>,
    pub start_time: Instant,
}

// ── Prometheus Metrics ────────────────────────────────────────────────────────

struct Metrics {
    registry: Registry,
    frames_total: Counter,
    dropped_total: Counter,
    passed_total: Counter,
    port_configured: Gauge,
}

impl Metrics {
    fn new() -> Self {
        let mut registry = Registry::default();
        let frames_total = Counter::default();
        let dropped_total = Counter::default();
        let passed_total = Counter::default();
        let port_configured = Gauge::default();

        registry.register(
            "dropflow_frames_total",
            "Total number of inspected frames",
            frames_total.clone(),
        );
        registry.register(
            "dropflow_dropped_total",
            "Frames that matched the configured port and were dropped",
            dropped_total.clone(),
        );
        registry.register(
            "dropflow_passed_total",
            "Frames handed back to normal processing",
            passed_total.clone(),
        );
        registry.register(
            "dropflow_port_configured",
            "Whether a drop port is currently configured (0 or 1)",
            port_configured.clone(),
        );

        Self {
            registry,
            frames_total,
            dropped_total,
            passed_total,
            port_configured,
        }
    }
}

// ── Request / Response Types ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    frames_total: u64,
    dropped_total: u64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    uptime_seconds: u64,
    frames_total: u64,
    passed_total: u64,
    dropped_total: u64,
    frames_per_second: f64,
    drop_rate: f64,
}

#[derive(Serialize)]
pub struct PortResponse {
    port: Option<u16>,
}

#[derive(Deserialize)]
pub struct SetPortRequest {
    port: u16,
}

#[derive(Deserialize)]
pub struct LiveParams {
    limit: Option<usize>,
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>, allowed_ips: &[String]) -> Router {
    let metrics = Arc::new(Metrics::new());

    let mut app = Router::new()
        .route("/api/health", get(get_health))
        .route("/api/stats", get(get_stats))
        .route("/api/live", get(get_live))
        .route(
            "/api/port",
            get(get_port).put(put_port).delete(delete_port),
        )
        .route("/api/stream", get(ws_handler))
        .route(
            "/metrics",
            get({
                let m = metrics.clone();
                let s = state.clone();
                move || get_metrics(s.clone(), m.clone())
            }),
        );

    // Apply IP allowlist middleware if configured. The API can rewrite the
    // drop port, so restricting who reaches it matters more here than for a
    // read-only surface.
    if !allowed_ips.is_empty() {
        let nets: Arc<Vec<IpNet>> = Arc::new(
            allowed_ips
                .iter()
                .filter_map(|s| s.parse::<IpNet>().ok())
                .collect(),
        );
        app = app.layer(middleware::from_fn(move |req, next| {
            let nets = nets.clone();
            ip_allowlist(req, next, nets)
        }));
    }

    app.with_state(state)
}

// ── IP Allowlist Middleware ───────────────────────────────────────────────────

async fn ip_allowlist(
    req: axum::extract::Request,
    next: middleware::Next,
    allowed: Arc<Vec<IpNet>>,
) -> impl IntoResponse {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        let ip = connect_info.0.ip();
        if allowed.iter().any(|net| net.contains(&ip)) {
            return next.run(req).await.into_response();
        }
        return StatusCode::FORBIDDEN.into_response();
    }
    // No ConnectInfo (should not happen with into_make_service_with_connect_info).
    next.run(req).await.into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        frames_total: state.stats.frames_total.load(Ordering::Relaxed),
        dropped_total: state.stats.dropped_total.load(Ordering::Relaxed),
    })
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    let frames_total = state.stats.frames_total.load(Ordering::Relaxed);
    let passed_total = state.stats.passed_total.load(Ordering::Relaxed);
    let dropped_total = state.stats.dropped_total.load(Ordering::Relaxed);

    let frames_per_second = if uptime > 0 {
        frames_total as f64 / uptime as f64
    } else {
        0.0
    };
    let drop_rate = if frames_total > 0 {
        dropped_total as f64 / frames_total as f64
    } else {
        0.0
    };

    Json(StatsResponse {
        uptime_seconds: uptime,
        frames_total,
        passed_total,
        dropped_total,
        frames_per_second,
        drop_rate,
    })
}

async fn get_live(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LiveParams>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(50).min(1000);

    let mut ports: Vec<_> = state
        .stats
        .drops_by_port
        .iter()
        .map(|entry| {
            serde_json::json!({
                "port": *entry.key(),
                "dropped": *entry.value(),
            })
        })
        .collect();

    ports.sort_by(|a, b| {
        let count_a = a["dropped"].as_u64().unwrap_or(0);
        let count_b = b["dropped"].as_u64().unwrap_or(0);
        count_b.cmp(&count_a)
    });

    ports.truncate(limit);

    Json(serde_json::json!({
        "configured_port": state.slot.lookup(),
        "drops_by_port": ports,
        "frames_total": state.stats.frames_total.load(Ordering::Relaxed),
        "dropped_total": state.stats.dropped_total.load(Ordering::Relaxed),
    }))
}

async fn get_port(State(state): State<Arc<AppState>>) -> Json<PortResponse> {
    Json(PortResponse {
        port: state.slot.lookup(),
    })
}

async fn put_port(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetPortRequest>,
) -> Json<PortResponse> {
    state.slot.set(body.port);
    tracing::info!("drop port set to {} via API", body.port);
    Json(PortResponse {
        port: Some(body.port),
    })
}

async fn delete_port(State(state): State<Arc<AppState>>) -> Json<PortResponse> {
    state.slot.clear();
    tracing::info!("drop port cleared via API");
    Json(PortResponse { port: None })
}

async fn get_metrics(state: Arc<AppState>, metrics: Arc<Metrics>) -> impl IntoResponse {
    // Sync the atomic stats into prometheus counters. Counters are
    // monotonic, so increment by the delta since the last scrape.
    let frames = state.stats.frames_total.load(Ordering::Relaxed);
    let dropped = state.stats.dropped_total.load(Ordering::Relaxed);
    let passed = state.stats.passed_total.load(Ordering::Relaxed);

    let current = metrics.frames_total.get();
    if frames > current {
        metrics.frames_total.inc_by(frames - current);
    }
    let current = metrics.dropped_total.get();
    if dropped > current {
        metrics.dropped_total.inc_by(dropped - current);
    }
    let current = metrics.passed_total.get();
    if passed > current {
        metrics.passed_total.inc_by(passed - current);
    }
    metrics
        .port_configured
        .set(if state.slot.lookup().is_some() { 1 } else { 0 });

    let mut buf = String::new();
    encode(&mut buf, &metrics.registry).unwrap();
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        buf,
    )
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(1));

    loop {
        interval.tick().await;

        let stats = serde_json::json!({
            "configured_port": state.slot.lookup(),
            "frames_total": state.stats.frames_total.load(Ordering::Relaxed),
            "passed_total": state.stats.passed_total.load(Ordering::Relaxed),
            "dropped_total": state.stats.dropped_total.load(Ordering::Relaxed),
        });

        if socket
            .send(Message::Text(stats.to_string().into()))
            .await
            .is_err()
        {
            break;
        }
    }
}
