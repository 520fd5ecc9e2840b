use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::engine::core::{EngineHandle, ParamPatch};
use crate::sensitivity::SensitivitySnapshot;
use crate::sensor::SensorSample;
use crate::telemetry::{self, TelemetrySnapshot};

use super::sse;

/// Most rows a single `/readings` call returns.
const READINGS_BATCH_MAX: usize = 100;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct DebugHttpState {
    pub handle: &'static EngineHandle,
    token: Arc<String>,
    readings_rx: Arc<Mutex<Option<broadcast::Receiver<SensorSample>>>>,
}

impl DebugHttpState {
    pub fn new(handle: &'static EngineHandle, token: String) -> Self {
        Self {
            handle,
            token: Arc::new(token),
            readings_rx: Arc::new(Mutex::new(None)),
        }
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<(), HttpServerError> {
        let provided = extract_token(headers, query_token);
        match provided {
            Some(value) if value == *self.token => Ok(()),
            _ => Err(HttpServerError::Unauthorized),
        }
    }
}

/// Query payload for extracting token from URL.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    Unauthorized,
    BadRequest(&'static str),
    Validation(String),
    ServiceUnavailable(&'static str),
    Internal(String),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid token".into()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.into()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub monitoring: bool,
    pub uptime_ms: u64,
}

/// Parameter description payload.
#[derive(Debug, Serialize)]
pub struct ParamDescriptor {
    pub supported: &'static [&'static str],
    pub sensitivity: SensitivitySnapshot,
    pub cue_enabled: bool,
}

/// Command acknowledgement payload.
#[derive(Debug, Serialize)]
pub struct ParamAck {
    pub accepted: bool,
    pub sensitivity: SensitivitySnapshot,
}

/// Recent-readings payload.
#[derive(Debug, Serialize)]
pub struct ReadingsResponse {
    pub count: usize,
    pub readings: Vec<SensorSample>,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: DebugHttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/shake-stream", get(shake_stream_handler))
        .route("/readings", get(recent_readings))
        .route("/params", get(list_params).post(apply_params))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: DebugHttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding debug HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .context("serving debug HTTP router")?;
    Ok(())
}

pub async fn health(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<HealthResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    Ok(Json(HealthResponse {
        status: "ok",
        monitoring: state.handle.is_monitoring(),
        uptime_ms: state.handle.uptime_ms(),
    }))
}

pub async fn metrics(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<TelemetrySnapshot>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    Ok(Json(telemetry::hub().snapshot()))
}

pub async fn shake_stream_handler(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<sse::ShakeStream, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    sse::shake_stream(state.handle)
}

/// Drain samples that arrived since the previous call.
///
/// The broadcast receiver is kept in the handler state across calls, so each
/// call returns only the rows the caller has not seen yet. The first call
/// subscribes and therefore usually returns an empty batch.
pub async fn recent_readings(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<ReadingsResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    let mut slot = state
        .readings_rx
        .lock()
        .map_err(|_| HttpServerError::Internal("readings receiver lock poisoned".into()))?;

    if slot.is_none() {
        *slot = state.handle.readings_receiver();
    }

    let rx = slot.as_mut().ok_or(HttpServerError::ServiceUnavailable(
        "readings channel not initialized",
    ))?;

    let readings = drain_readings(rx, READINGS_BATCH_MAX);
    Ok(Json(ReadingsResponse {
        count: readings.len(),
        readings,
    }))
}

pub async fn list_params(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<ParamDescriptor>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    Ok(Json(ParamDescriptor {
        supported: &["control_input", "threshold", "cue_enabled"],
        sensitivity: state.handle.sensitivity_snapshot(),
        cue_enabled: state.handle.cue_enabled(),
    }))
}

pub async fn apply_params(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    Json(patch): Json<ParamPatch>,
) -> Result<Json<ParamAck>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    if patch.control_input.is_none() && patch.threshold.is_none() && patch.cue_enabled.is_none() {
        return Err(HttpServerError::BadRequest(
            "at least one parameter must be provided",
        ));
    }

    let sensitivity = state
        .handle
        .apply_params(&patch)
        .map_err(|err| HttpServerError::Validation(err.to_string()))?;

    Ok(Json(ParamAck {
        accepted: true,
        sensitivity,
    }))
}

fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    if let Some(token) = query_token {
        return Some(token.to_string());
    }

    headers
        .get("x-debug-token")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.strip_prefix("Bearer ").map(|v| v.to_string()))
        })
}

fn drain_readings(rx: &mut broadcast::Receiver<SensorSample>, cap: usize) -> Vec<SensorSample> {
    let mut rows = Vec::new();
    while rows.len() < cap {
        match rx.try_recv() {
            Ok(sample) => rows.push(sample),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
    rows
}
