// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP transport for the flusher.
//!
//! A caller-supplied `reqwest::Client` is used as-is. Otherwise a client is
//! built with connection pooling and TCP keep-alive; TLS comes from the
//! `reqwest/rustls-tls` feature. Per-request timeouts are applied by the
//! flusher, not here, so an overriding client keeps its own settings for
//! everything else.

use std::time::Duration;

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ConfigError;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(270);
const TCP_KEEPALIVE: Duration = Duration::from_secs(120);

/// Returns the transport override from `config`, or builds the default one.
pub fn resolve_client(config: &ClientConfig) -> Result<reqwest::Client, ConfigError> {
    if let Some(client) = &config.http_client {
        debug!("LOKI | Using caller-supplied HTTP client");
        return Ok(client.clone());
    }
    Ok(build_client()?)
}

fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
        .build()
}
