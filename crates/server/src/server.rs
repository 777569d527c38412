// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface.
//!
//! Hook capture, the notification stream, event queries and debug logs.
//! Store reads and writes are file I/O and run on the blocking pool.

use std::convert::Infallible;
use std::future::Future;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use cage_core::store::DEFAULT_PAGE_LIMIT;
use cage_core::{DebugLogEntry, EventStore, EventType, ListQuery, LogLevel};

use crate::hub::{ChannelSink, ConnectionGuard};
use crate::log_buffer::{LogQuery, DEFAULT_LOG_LIMIT};
use crate::state::AppState;

/// Largest page or tail a single request may ask for.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// Builds the router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/claude/hooks/:hook_type", post(capture_hook))
        .route("/events/stream", get(stream_events))
        .route("/events/list", get(list_events))
        .route("/events/tail", get(tail_events))
        .route("/events/stats", get(event_stats))
        .route("/debug/logs", get(query_logs).post(ingest_logs))
        .with_state(state)
}

/// Serves on `listener` until `shutdown` resolves.
///
/// Open streams are closed once shutdown begins so graceful shutdown does
/// not wait on them.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!("listening on {}", listener.local_addr()?);
    let forwarder = state.start_forwarder();
    let hub = state.hub().clone();

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            let closed = hub.close_all();
            info!("shutting down, closed {} streams", closed);
        })
        .await?;

    forwarder.abort();
    Ok(())
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Runs a store query on the blocking pool.
async fn read_store<T, F>(state: &AppState, query: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&EventStore) -> T + Send + 'static,
{
    let store = state.store().clone();
    tokio::task::spawn_blocking(move || query(&store))
        .await
        .map_err(|e| ApiError::Internal(format!("store query failed: {e}")))
}

/// Parses an optional numeric parameter. Unparseable values read as 0,
/// which every query treats as "nothing".
fn count_param(raw: Option<&str>, default: usize) -> usize {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or(0),
    }
}

async fn capture_hook(
    State(state): State<AppState>,
    Path(hook_type): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event_type = EventType::from_route(&hook_type)
        .ok_or_else(|| ApiError::NotFound(format!("unknown hook type: {hook_type}")))?;

    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!("unparseable {} payload kept as text: {}", hook_type, e);
            Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };

    let ack = state.capture().handle(event_type, payload).await;
    Ok(Json(ack).into_response())
}

async fn stream_events(State(state): State<AppState>) -> Result<Response, ApiError> {
    let (sink, rx) = ChannelSink::channel(state.config().stream_buffer);
    let hub = state.hub().clone();
    let id = hub
        .subscribe(Box::new(sink))
        .map_err(|e| ApiError::Internal(format!("stream setup failed: {e}")))?;
    let guard = ConnectionGuard::new(hub, id);

    // The guard rides along with the stream; dropping the response body
    // deregisters the connection.
    let frames = futures_util::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let frame = rx.recv().await?;
        Some((
            Ok::<_, Infallible>(SseEvent::default().data(frame)),
            (rx, guard),
        ))
    });

    Ok(Sse::new(frames).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    date: Option<String>,
    session_id: Option<String>,
    since: Option<String>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    if let Some(since) = params.since {
        let session_id = params.session_id;
        let events = read_store(&state, move |store| {
            let mut events = store.since(&since);
            if let Some(session_id) = &session_id {
                events.retain(|e| &e.session_id == session_id);
            }
            events
        })
        .await?;
        debug!("incremental list returned {} events", events.len());
        return Ok(Json(json!({ "events": events })).into_response());
    }

    let query = ListQuery {
        page: count_param(params.page.as_deref(), 1),
        limit: count_param(params.limit.as_deref(), DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        date: params.date,
        session_id: params.session_id,
    };
    let page = read_store(&state, move |store| store.list(&query)).await?;
    Ok(Json(page).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct TailParams {
    count: Option<String>,
}

async fn tail_events(
    State(state): State<AppState>,
    Query(params): Query<TailParams>,
) -> Result<Response, ApiError> {
    let count = count_param(params.count.as_deref(), DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
    let events = read_store(&state, move |store| store.tail(count)).await?;
    Ok(Json(json!({ "events": events })).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct StatsParams {
    date: Option<String>,
}

async fn event_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Response, ApiError> {
    let stats = read_store(&state, move |store| store.stats(params.date.as_deref())).await?;
    Ok(Json(stats).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct LogParams {
    level: Option<String>,
    component: Option<String>,
    limit: Option<String>,
    since: Option<String>,
}

async fn query_logs(
    State(state): State<AppState>,
    Query(params): Query<LogParams>,
) -> Result<Response, ApiError> {
    let level = params
        .level
        .as_deref()
        .map(LogLevel::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let query = LogQuery {
        level,
        component: params.component,
        limit: count_param(params.limit.as_deref(), DEFAULT_LOG_LIMIT),
        since: params.since,
    };
    let logs = state.logs().query(&query);
    Ok(Json(json!({ "logs": logs })).into_response())
}

#[derive(Debug, Deserialize)]
struct IngestBody {
    logs: Vec<DebugLogEntry>,
}

async fn ingest_logs(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> Result<Response, ApiError> {
    let received = state.capture().ingest_logs(body.logs);
    debug!("ingested {} debug log entries", received);
    Ok(Json(json!({ "received": received })).into_response())
}
