// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request was sent but did not complete.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Error type for sync engine operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Max retries exceeded.
    #[error("max reconnection retries exceeded\n  hint: is cage-server running at the configured URL?")]
    MaxRetriesExceeded,
}

/// Result type for sync engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
