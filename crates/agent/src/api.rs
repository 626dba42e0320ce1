//! HTTP API for carbon figures, health checks and Prometheus metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use carbon_lib::{
    health::{ComponentStatus, HealthRegistry},
    history::{HistorySnapshot, Series, SeriesPoint},
    collector::TOP_PROCESSES,
    models::{CarbonSnapshot, ProcessInfo, BYTES_PER_MB},
    observability::{AgentMetrics, StructuredLogger},
    optimization::{OptimizationAction, OptimizationRecord, SavingsEstimate, Strategy},
    pipeline::CarbonPipeline,
    CarbonError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<CarbonPipeline>,
    pub health_registry: HealthRegistry,
    pub metrics: AgentMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        pipeline: Arc<CarbonPipeline>,
        health_registry: HealthRegistry,
        metrics: AgentMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            pipeline,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Error body shared by every API route
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Maps library errors onto HTTP responses
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<CarbonError> for ApiError {
    fn from(err: CarbonError) -> Self {
        let status = match &err {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            CarbonError::SamplerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = self.status.as_u16(), error = %self.message, "API request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
pub struct NetworkView {
    pub packets: u64,
    pub bytes_sent_mb: f64,
    pub bytes_received_mb: f64,
    pub total_mb: f64,
    pub active_connections: u32,
}

#[derive(Debug, Serialize)]
pub struct CarbonView {
    pub cpu_carbon_g: f64,
    pub network_carbon_g: f64,
    pub total_carbon_g: f64,
    pub total_carbon_kg: f64,
}

#[derive(Debug, Serialize)]
pub struct EnergyView {
    pub cpu_power_w: f64,
    pub total_energy_kwh: f64,
    pub runtime_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct SystemView {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
}

/// `GET /api/stats` body
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub network: NetworkView,
    pub carbon: CarbonView,
    pub energy: EnergyView,
    pub system: SystemView,
    pub processes: Vec<ProcessInfo>,
}

impl StatsResponse {
    pub fn new(snapshot: CarbonSnapshot, processes: Vec<ProcessInfo>) -> Self {
        let reading = &snapshot.reading;
        let network = &snapshot.network;

        Self {
            success: true,
            timestamp: snapshot.sampled_at,
            network: NetworkView {
                packets: network.packets,
                bytes_sent_mb: network.bytes_sent as f64 / BYTES_PER_MB,
                bytes_received_mb: network.bytes_received as f64 / BYTES_PER_MB,
                total_mb: network.total_bytes() as f64 / BYTES_PER_MB,
                active_connections: network.active_connections,
            },
            carbon: CarbonView {
                cpu_carbon_g: reading.cpu_carbon_g(),
                network_carbon_g: reading.network_carbon_g(),
                total_carbon_g: reading.total_carbon_g(),
                total_carbon_kg: reading.total_carbon_kg(),
            },
            energy: EnergyView {
                cpu_power_w: reading.power_watts(),
                total_energy_kwh: reading.energy_kwh(),
                runtime_hours: reading.runtime_hours(),
            },
            system: SystemView {
                cpu_percent: snapshot.cpu_usage_percent,
                memory_percent: snapshot.memory.usage_percent,
                memory_used_gb: snapshot.memory.used_gb(),
                memory_total_gb: snapshot.memory.total_gb(),
            },
            processes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub history: HistorySnapshot,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub success: bool,
    pub series: Series,
    pub unit: &'static str,
    pub points: Vec<SeriesPoint>,
}

/// `POST /api/optimize` body; `type` defaults to `reduce_cpu`
#[derive(Debug, Default, Deserialize)]
pub struct OptimizeRequest {
    #[serde(rename = "type")]
    pub optimization_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub optimization_type: Strategy,
    pub actions: Vec<OptimizationAction>,
    pub estimated_reduction: String,
    pub before_carbon_g: Option<f64>,
    pub after_carbon_g: Option<f64>,
    pub reduction_g: Option<f64>,
    pub reduction_percent: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptimizationDataResponse {
    pub success: bool,
    pub optimization_data: OptimizationRecord,
}

#[derive(Debug, Serialize)]
pub struct SavingsResponse {
    pub success: bool,
    pub savings: BTreeMap<String, SavingsEstimate>,
}

async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<StatsResponse> {
    let snapshot = state.pipeline.current_reading().await?;
    state.metrics.record_snapshot(&snapshot);

    // The reading stands on its own when the process table is unreadable
    let processes = match state.pipeline.top_processes(TOP_PROCESSES).await {
        Ok(processes) => processes,
        Err(e) => {
            warn!(error = %e, "Process listing unavailable");
            Vec::new()
        }
    };
    Ok(Json(StatsResponse::new(snapshot, processes)))
}

async fn history(State(state): State<Arc<AppState>>) -> ApiResult<HistoryResponse> {
    Ok(Json(HistoryResponse {
        success: true,
        history: state.pipeline.history().await,
    }))
}

async fn history_series(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<SeriesResponse> {
    let series: Series = name
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown series: {}", name)))?;

    Ok(Json(SeriesResponse {
        success: true,
        series,
        unit: series.unit(),
        points: state.pipeline.history_series(series).await,
    }))
}

async fn optimize(
    State(state): State<Arc<AppState>>,
    body: Option<Json<OptimizeRequest>>,
) -> ApiResult<OptimizeResponse> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let strategy = match request.optimization_type.as_deref() {
        Some(id) => id.parse::<Strategy>()?,
        None => Strategy::default(),
    };

    let outcome = state.pipeline.apply_strategy(strategy).await?;
    state.metrics.inc_optimizations_applied();
    state.logger.log_optimization(&outcome);

    let record = outcome.record;
    Ok(Json(OptimizeResponse {
        success: outcome.action_error.is_none(),
        optimization_type: strategy,
        actions: outcome.actions,
        estimated_reduction: format!("{}%", strategy.reduction_percent()),
        before_carbon_g: record.before_carbon_g,
        after_carbon_g: record.after_carbon_g,
        reduction_g: record.reduction_g,
        reduction_percent: record.reduction_percent,
        error: outcome.action_error,
    }))
}

async fn optimization_data(State(state): State<Arc<AppState>>) -> ApiResult<OptimizationDataResponse> {
    Ok(Json(OptimizationDataResponse {
        success: true,
        optimization_data: state.pipeline.optimization_record().await,
    }))
}

async fn savings(State(state): State<Arc<AppState>>) -> ApiResult<SavingsResponse> {
    let savings = state
        .pipeline
        .estimate_savings()
        .await?
        .into_iter()
        .map(|estimate| (estimate.strategy.id().to_string(), estimate))
        .collect();

    Ok(Json(SavingsResponse {
        success: true,
        savings,
    }))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/stats", get(stats))
        .route("/api/history", get(history))
        .route("/api/history/:series", get(history_series))
        .route("/api/optimize", post(optimize))
        .route("/api/optimization-data", get(optimization_data))
        .route("/api/savings", get(savings))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
