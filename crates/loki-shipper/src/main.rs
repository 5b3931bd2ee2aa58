// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Forwards newline-delimited JSON log records from stdin to Loki.
//!
//! Each line must carry an RFC 3339 `time` with fractional seconds and a
//! string `msg`. Malformed lines are reported and skipped. The shipper
//! drains and stops on end of input or Ctrl-C.

mod config;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use loki_client::LokiClient;

use crate::config::ShipperConfig;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let config = ShipperConfig::from_env().context("invalid shipper configuration")?;

    let env_filter = format!(
        "h2=off,hyper=off,rustls=off,reqwest=off,{}",
        config.log_level
    );
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).context("could not parse log level in configuration")?,
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    debug!("Logging subsystem enabled");
    debug!("Loaded configuration: {config:?}");

    let client_config = config.client_config()?;
    let push_url = client_config.push_url();
    let (client, shutdown) = LokiClient::new(client_config)?;
    info!("Shipping stdin to {push_url}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(e) = client.write(line.as_bytes()).await {
                        warn!("Skipping malformed record: {e}");
                    }
                }
                Ok(None) => {
                    debug!("Reached end of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("Received interrupt, shutting down");
                break;
            }
        }
    }

    shutdown.shutdown().await;

    let stats = client.stats();
    info!(
        "Shipped {} entries in {} batches ({} dropped, {} rejected, {} batches failed)",
        stats.entries_sent,
        stats.batches_sent,
        stats.dropped,
        stats.rejected,
        stats.batches_failed
    );
    Ok(())
}
