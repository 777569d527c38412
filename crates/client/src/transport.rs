// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for talking to a cage server.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP and Server-Sent-Events connections for production
//! - Mock sources for unit testing

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use cage_core::{DebugLogEntry, Event, EventPage, Notification};

use crate::error::{TransportError, TransportResult};

/// Boxed future returned by [`EventSource`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Notifications pushed by the server, in arrival order.
pub type NotificationStream = Pin<Box<dyn Stream<Item = TransportResult<Notification>> + Send>>;

/// Remote query and subscription capability.
///
/// Methods take `&self` so several fetches can be in flight at once.
pub trait EventSource: Send + Sync {
    /// One page of events, newest first.
    fn list(&self, page: usize, limit: usize) -> BoxFuture<'_, TransportResult<EventPage>>;

    /// Events at or after `since`, oldest first.
    fn events_since(&self, since: &str) -> BoxFuture<'_, TransportResult<Vec<Event>>>;

    /// Up to `limit` of the newest debug log entries at or after `since`,
    /// oldest first.
    fn debug_logs_since(
        &self,
        since: &str,
        limit: usize,
    ) -> BoxFuture<'_, TransportResult<Vec<DebugLogEntry>>>;

    /// The newest `limit` debug log entries, newest first.
    fn recent_debug_logs(&self, limit: usize)
        -> BoxFuture<'_, TransportResult<Vec<DebugLogEntry>>>;

    /// Opens the notification stream.
    fn subscribe(&self) -> BoxFuture<'_, TransportResult<NotificationStream>>;
}

#[derive(Deserialize)]
struct EventsBody {
    events: Vec<Event>,
}

#[derive(Deserialize)]
struct LogsBody {
    logs: Vec<DebugLogEntry>,
}

/// HTTP transport using reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> TransportResult<reqwest::Url> {
        let base = format!("{}{}", self.base_url, path);
        reqwest::Url::parse_with_params(&base, params)
            .map_err(|e| TransportError::ConnectionFailed(format!("invalid url {base}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> TransportResult<T> {
        let url = self.url(path, params)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|e| TransportError::SerializationError(e.to_string()))
    }
}

impl EventSource for HttpTransport {
    fn list(&self, page: usize, limit: usize) -> BoxFuture<'_, TransportResult<EventPage>> {
        Box::pin(async move {
            self.get_json(
                "/events/list",
                &[("page", page.to_string()), ("limit", limit.to_string())],
            )
            .await
        })
    }

    fn events_since(&self, since: &str) -> BoxFuture<'_, TransportResult<Vec<Event>>> {
        let since = since.to_string();
        Box::pin(async move {
            let body: EventsBody = self.get_json("/events/list", &[("since", since)]).await?;
            Ok(body.events)
        })
    }

    fn debug_logs_since(
        &self,
        since: &str,
        limit: usize,
    ) -> BoxFuture<'_, TransportResult<Vec<DebugLogEntry>>> {
        let since = since.to_string();
        Box::pin(async move {
            let body: LogsBody = self
                .get_json(
                    "/debug/logs",
                    &[("since", since), ("limit", limit.to_string())],
                )
                .await?;
            Ok(body.logs)
        })
    }

    fn recent_debug_logs(
        &self,
        limit: usize,
    ) -> BoxFuture<'_, TransportResult<Vec<DebugLogEntry>>> {
        Box::pin(async move {
            let body: LogsBody = self
                .get_json("/debug/logs", &[("limit", limit.to_string())])
                .await?;
            Ok(body.logs)
        })
    }

    fn subscribe(&self) -> BoxFuture<'_, TransportResult<NotificationStream>> {
        Box::pin(async move {
            let url = self.url("/events/stream", &[])?;
            let response = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send()
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }
            let stream: NotificationStream = Box::pin(parse_sse_stream(response.bytes_stream()));
            Ok(stream)
        })
    }
}

/// Internal state for the SSE byte stream parser.
struct SseParserState<S> {
    inner: Pin<Box<S>>,
    buffer: String,
    pending: VecDeque<TransportResult<Notification>>,
}

/// Turns a Server-Sent-Events byte stream into notifications.
///
/// Frames carry one JSON object per `data:` line. Chunks may split a line
/// anywhere; partial lines wait in the buffer for the rest.
pub fn parse_sse_stream<S, E>(bytes: S) -> impl Stream<Item = TransportResult<Notification>> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseParserState {
        inner: Box::pin(bytes),
        buffer: String::new(),
        pending: VecDeque::new(),
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(pos) = state.buffer.find('\n') {
                        let line: String = state.buffer.drain(..=pos).collect();
                        if let Some(item) = parse_sse_line(&line) {
                            state.pending.push_back(item);
                        }
                    }
                }
                Some(Err(e)) => {
                    let err = TransportError::ReceiveFailed(e.to_string());
                    return Some((Err(err), state));
                }
                None => {
                    let rest = std::mem::take(&mut state.buffer);
                    return parse_sse_line(&rest).map(|item| (item, state));
                }
            }
        }
    })
}

/// Parses one SSE line. Returns `None` for blank lines, comments and
/// non-data fields.
fn parse_sse_line(line: &str) -> Option<TransportResult<Notification>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed.strip_prefix("data:")?.trim_start();
    Some(
        Notification::from_json(data)
            .map_err(|e| TransportError::SerializationError(format!("{e} (data: {data})"))),
    )
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
