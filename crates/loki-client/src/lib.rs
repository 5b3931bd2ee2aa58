// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batching push client for Loki-compatible log aggregation endpoints.
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!                     │   Producers  │  (upstream structured-log formatter)
//!                     └──────┬───────┘
//!                            │ write(record)
//!                            v
//!                     ┌──────────────┐
//!                     │  Normalizer  │  (time / msg / metadata)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                  ┌─────────────────┐
//!                  │ Ingestion Queue │  (bounded, drop after write timeout)
//!                  └─────────┬───────┘
//!                            │
//!                            v
//!                  ┌─────────────────┐
//!                  │   Aggregator    │  (batch by size or period)
//!                  └─────────┬───────┘
//!                            │
//!                            v
//!                     ┌──────────────┐
//!                     │   Flusher    │  (POST with retry and jitter)
//!                     └──────┬───────┘
//!                            │
//!                            v
//!                 ┌───────────────────┐
//!                 │ /loki/api/v1/push │
//!                 └───────────────────┘
//! ```
//!
//! Delivery is best effort: entries are dropped when the queue stays full
//! and batches are discarded once their attempts run out. Every such loss
//! is reported through `tracing` and counted in [`StatsSnapshot`], never
//! returned to the producer.
//!
//! # Example
//!
//! ```rust,ignore
//! use loki_client::{ClientConfig, LokiClient};
//!
//! let config = ClientConfig::builder("localhost", 3100)
//!     .label("app", "my_app")
//!     .basic_auth("johnDoe", "12345")
//!     .build()?;
//! let (client, shutdown) = LokiClient::new(config)?;
//!
//! client
//!     .write(br#"{"time":"2024-01-02T03:04:05.123Z","msg":"started"}"#)
//!     .await?;
//!
//! shutdown.shutdown().await;
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod aggregator;
pub mod client;
pub mod config;
pub mod constants;
pub mod entry;
pub mod error;
pub mod flusher;
pub mod http;
pub mod payload;
pub mod queue;
pub mod retry;
pub mod stats;

pub use client::{LokiClient, ShutdownHandle};
pub use config::{Auth, ClientConfig, ClientConfigBuilder, Scheme};
pub use entry::{LogEntry, TimestampPrecision};
pub use error::{ConfigError, EntryError, FlushError};
pub use queue::EnqueueOutcome;
pub use retry::RetryStrategy;
pub use stats::StatsSnapshot;
