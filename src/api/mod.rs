use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::monitor::{MonitorHandle, MonitorStopped};
use crate::state::MAX_HISTORY;

mod export;
mod ws;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_ALERTS_LISTED: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorHandle,
}

impl AppState {
    pub fn new(monitor: MonitorHandle) -> Self {
        Self { monitor }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Unavailable(#[from] MonitorStopped),
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!("request failed: {}", self);
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn sample_now(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.monitor.run_round().await?))
}

// Query values stay strings so a malformed value falls back instead of a 400.
#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<String>,
}

impl HistoryParams {
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<usize>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(MAX_HISTORY)
    }
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.monitor.history(params.limit()).await?))
}

async fn performance(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.monitor.performance().await?))
}

#[derive(Deserialize)]
struct AlertParams {
    unacknowledged: Option<String>,
}

impl AlertParams {
    fn unacknowledged_only(&self) -> bool {
        self.unacknowledged.as_deref() == Some("true")
    }
}

async fn alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertParams>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state
            .monitor
            .alerts(params.unacknowledged_only(), MAX_ALERTS_LISTED)
            .await?,
    ))
}

#[derive(Serialize)]
struct AckResponse {
    success: bool,
}

async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if state.monitor.acknowledge(id).await? {
        Ok(Json(AckResponse { success: true }))
    } else {
        Err(ApiError::NotFound("Alert not found"))
    }
}

async fn topology(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.monitor.topology().await?))
}

#[derive(Deserialize)]
struct ExportParams {
    format: Option<String>,
}

async fn export(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let data = state.monitor.export().await?;
    let response = match params.format.as_deref() {
        Some("csv") => (
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=da-watchdog-export.csv",
                ),
            ],
            export::history_csv(&data.historical_data)?,
        )
            .into_response(),
        _ => (
            [(
                header::CONTENT_DISPOSITION,
                "attachment; filename=da-watchdog-export.json",
            )],
            Json(data),
        )
            .into_response(),
    };
    Ok(response)
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/da", get(sample_now))
        .route("/api/history", get(history))
        .route("/api/performance", get(performance))
        .route("/api/alerts", get(alerts))
        .route("/api/alerts/:id/acknowledge", post(acknowledge_alert))
        .route("/api/topology", get(topology))
        .route("/api/export", get(export))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("DA watchdog API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_params(limit: Option<&str>) -> HistoryParams {
        HistoryParams {
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn history_limit_falls_back_on_bad_input() {
        assert_eq!(history_params(None).limit(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history_params(Some("abc")).limit(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history_params(Some("0")).limit(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history_params(Some("-3")).limit(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history_params(Some("25")).limit(), 25);
        assert_eq!(history_params(Some("5000")).limit(), MAX_HISTORY);
    }

    #[test]
    fn only_literal_true_filters_alerts() {
        let with = |v: Option<&str>| AlertParams {
            unacknowledged: v.map(str::to_string),
        };
        assert!(with(Some("true")).unacknowledged_only());
        assert!(!with(Some("yes")).unacknowledged_only());
        assert!(!with(Some("1")).unacknowledged_only());
        assert!(!with(None).unacknowledged_only());
    }
}
