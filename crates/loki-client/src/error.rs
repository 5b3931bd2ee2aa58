// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors returned to the caller of [`LokiClient::write`](crate::client::LokiClient::write)
/// when a record cannot be turned into an entry.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Missing {0} field")]
    MissingField(&'static str),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Message field is not a string")]
    InvalidMessageType,
}

/// Errors raised while building a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Client must be created from within a tokio runtime")]
    NoRuntime,
}

/// Failure of a single push attempt, or of the batch before any attempt.
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("Failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned status {0}")]
    Status(StatusCode),
}

impl FlushError {
    /// Serialization failures are fatal to the batch; retrying cannot help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FlushError::Serialize(_))
    }
}
