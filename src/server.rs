//! HTTP server receiving sample frames from a live simulation.
//!
//! This module provides an HTTP server that:
//! - Registers one value component per probed object via POST /components
//! - Accepts raw little-endian frames via POST /components/:uid/frames
//! - Serves the shown window and latest readout of each component
//! - Trims every store on a background interval
//!
//! # Architecture
//!
//! ```text
//! Simulation ──→ POST /frames ──→ ValueComponent ──→ GET /window, /latest ──→ Renderer
//!                                      ↑
//!                              [TimeSlider + trim task]
//! ```

use crate::component::ValueComponent;
use crate::config::Config;
use crate::stats::{SharedStreamStats, StatsSnapshot, StreamStats};
use crate::store::{TimeSlider, WindowSnapshot};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: IpAddr,
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Smoothing constant for components that do not request one
    pub smoothing_constant: f64,
    pub shown_duration: f64,
    pub kept_duration: f64,
    /// Upper bound on the dimensions of a registered component
    pub max_dimensions: usize,
    /// Interval of the background trim task
    pub trim_interval: Duration,
}

impl ServerConfig {
    /// Loopback server on `port` with default window settings.
    pub fn new(port: u16) -> Self {
        let defaults = Config::default();
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port,
            smoothing_constant: defaults.smoothing_constant,
            shown_duration: defaults.shown_duration,
            kept_duration: defaults.kept_duration,
            max_dimensions: defaults.max_dimensions,
            trim_interval: defaults.trim_interval,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            host: config.host.parse()?,
            port: config.port,
            smoothing_constant: config.smoothing_constant,
            shown_duration: config.shown_duration,
            kept_duration: config.kept_duration,
            max_dimensions: config.max_dimensions,
            trim_interval: config.trim_interval,
        })
    }
}

/// Shared server state
pub struct ServerState {
    components: RwLock<HashMap<u64, ValueComponent>>,
    slider: RwLock<TimeSlider>,
    stats: SharedStreamStats,
    next_uid: AtomicU64,
    smoothing_constant: f64,
    max_dimensions: usize,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            components: RwLock::new(HashMap::new()),
            slider: RwLock::new(TimeSlider::new(config.shown_duration, config.kept_duration)),
            stats: Arc::new(StreamStats::new()),
            next_uid: AtomicU64::new(1),
            smoothing_constant: config.smoothing_constant,
            max_dimensions: config.max_dimensions,
        }
    }

    /// Trim every component against the current slider.
    pub async fn trim_all(&self) -> usize {
        let slider = self.slider.read().await.clone();
        let mut components = self.components.write().await;
        let mut removed = 0;
        for component in components.values_mut() {
            removed += component.trim(&slider);
        }
        removed
    }
}

/// POST /components request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub label: String,
    pub dimensions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_constant: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub uid: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ingested: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestResponse {
    pub values: Option<Vec<f64>>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.to_string(),
        }),
    )
}

fn unknown_component(uid: u64) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "UNKNOWN_COMPONENT",
        format!("No component with uid {uid}"),
    )
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /components
async fn register(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if request.dimensions == 0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_DIMENSIONS",
            "A component needs at least one dimension",
        ));
    }
    if request.dimensions > state.max_dimensions {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_DIMENSIONS",
            format!("A component may have at most {} dimensions", state.max_dimensions),
        ));
    }
    let smoothing = request.smoothing_constant.unwrap_or(state.smoothing_constant);
    if !smoothing.is_finite() || smoothing < 0.0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_SMOOTHING",
            "Smoothing constant must be a non-negative number",
        ));
    }

    let uid = state.next_uid.fetch_add(1, Ordering::Relaxed);
    let component = ValueComponent::new(uid, request.label.clone(), request.dimensions, smoothing)
        .with_stats(state.stats.clone());
    state.components.write().await.insert(uid, component);

    tracing::info!(uid, label = %request.label, dimensions = request.dimensions, "registered component");
    Ok((StatusCode::CREATED, Json(RegisterResponse { uid })))
}

/// DELETE /components/:uid
async fn remove(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<u64>,
) -> Result<StatusCode, ApiError> {
    match state.components.write().await.remove(&uid) {
        Some(_) => {
            tracing::info!(uid, "removed component");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(unknown_component(uid)),
    }
}

/// POST /components/:uid/frames
///
/// The body is one or more whole frames of `1 + dimensions` little-endian f32s.
async fn ingest_frames(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<u64>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    let (ingested, last_time) = {
        let mut components = state.components.write().await;
        let component = components.get_mut(&uid).ok_or_else(|| unknown_component(uid))?;
        let ingested = component
            .try_on_message(&body)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, "MALFORMED_FRAMES", e.to_string()))?;
        (ingested, component.last_time())
    };

    if let Some(time) = last_time {
        state.slider.write().await.advance(time);
    }

    Ok(Json(IngestResponse { ingested }))
}

/// GET /components/:uid/window
async fn window(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<u64>,
) -> Result<Json<WindowSnapshot>, ApiError> {
    let slider = state.slider.read().await.clone();
    let components = state.components.read().await;
    let component = components.get(&uid).ok_or_else(|| unknown_component(uid))?;
    Ok(Json(component.store().windowed_view(&slider).to_snapshot()))
}

/// GET /components/:uid/latest
async fn latest(
    State(state): State<Arc<ServerState>>,
    Path(uid): Path<u64>,
) -> Result<Json<LatestResponse>, ApiError> {
    let slider = state.slider.read().await.clone();
    let components = state.components.read().await;
    let component = components.get(&uid).ok_or_else(|| unknown_component(uid))?;
    Ok(Json(LatestResponse {
        values: component.store().latest_in_window(&slider),
    }))
}

/// GET /stats
async fn stats(State(state): State<Arc<ServerState>>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

/// Build the router over `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/components", post(register))
        .route("/components/:uid", axum::routing::delete(remove))
        .route("/components/:uid/frames", post(ingest_frames))
        .route("/components/:uid/window", get(window))
        .route("/components/:uid/latest", get(latest))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Trim every store on a fixed interval until the state is dropped.
fn spawn_trim_task(state: Weak<ServerState>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            let removed = state.trim_all().await;
            if removed > 0 {
                tracing::debug!(removed, "trim pass");
            }
        }
    });
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    spawn_trim_task(Arc::downgrade(&state), config.trim_interval);

    let app = router(state);

    let addr = SocketAddr::from((config.host, config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Frame server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
