// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use loki_client::{ClientConfig, ConfigError};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Shipper settings, read from `LOKI_*` environment variables.
#[derive(Clone, PartialEq)]
pub struct ShipperConfig {
    pub host: String,
    pub port: u16,
    pub https: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bearer_token: Option<String>,
    /// Static stream labels, from `LOKI_LABELS=k=v,k2=v2`
    pub labels: BTreeMap<String, String>,
    pub batch_size: usize,
    pub buffer_size: usize,
    pub period: Duration,
    pub write_timeout: Duration,
    pub send_timeout: Duration,
    pub shutdown_grace: Duration,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl std::fmt::Debug for ShipperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipperConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("https", &self.https)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .field("labels", &self.labels)
            .field("batch_size", &self.batch_size)
            .field("buffer_size", &self.buffer_size)
            .field("period", &self.period)
            .field("write_timeout", &self.write_timeout)
            .field("send_timeout", &self.send_timeout)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for ShipperConfig {
    fn default() -> Self {
        let client = ClientConfig::new("localhost", 3100);
        Self {
            host: client.host,
            port: client.port,
            https: false,
            username: None,
            password: None,
            bearer_token: None,
            labels: BTreeMap::new(),
            batch_size: client.batch_size,
            buffer_size: client.buffer_size,
            period: client.period,
            write_timeout: client.write_timeout,
            send_timeout: client.send_timeout,
            shutdown_grace: client.shutdown_grace,
            log_level: "info".to_string(),
        }
    }
}

impl ShipperConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ShipperConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|val| !val.is_empty());

        let config = Self {
            host: non_empty("LOKI_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "LOKI_PORT")?.unwrap_or(defaults.port),
            https: lookup("LOKI_HTTPS")
                .map(|val| val.eq_ignore_ascii_case("true") || val == "1")
                .unwrap_or(defaults.https),
            username: non_empty("LOKI_USERNAME"),
            password: non_empty("LOKI_PASSWORD"),
            bearer_token: non_empty("LOKI_BEARER_TOKEN"),
            labels: match lookup("LOKI_LABELS") {
                Some(raw) => parse_labels(&raw)?,
                None => defaults.labels,
            },
            batch_size: parse_var(&lookup, "LOKI_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            buffer_size: parse_var(&lookup, "LOKI_BUFFER_SIZE")?.unwrap_or(defaults.buffer_size),
            period: parse_var(&lookup, "LOKI_PERIOD_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.period),
            write_timeout: parse_var(&lookup, "LOKI_WRITE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.write_timeout),
            send_timeout: parse_var(&lookup, "LOKI_SEND_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.send_timeout),
            shutdown_grace: parse_var(&lookup, "LOKI_SHUTDOWN_GRACE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_grace),
            log_level: lookup("LOKI_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            bail!("LOKI_HOST cannot be empty");
        }

        if self.port == 0 {
            bail!("LOKI_PORT must be greater than 0");
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    /// Client settings for these values. Sizes and timeouts are checked here.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut builder = ClientConfig::builder(self.host.clone(), self.port)
            .use_https(self.https)
            .labels(self.labels.clone())
            .batch_size(self.batch_size)
            .buffer_size(self.buffer_size)
            .period(self.period)
            .write_timeout(self.write_timeout)
            .send_timeout(self.send_timeout)
            .shutdown_grace(self.shutdown_grace)
            .user_agent(concat!("loki-shipper/", env!("CARGO_PKG_VERSION")));

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            builder = builder.basic_auth(username.clone(), password.clone());
        }
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_token(token.clone());
        }

        builder.build()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|val| {
            val.trim()
                .parse::<T>()
                .with_context(|| format!("{key} has an invalid value '{val}'"))
        })
        .transpose()
}

/// Parses `k=v,k2=v2`. Blank items are skipped.
pub fn parse_labels(raw: &str) -> anyhow::Result<BTreeMap<String, String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| -> anyhow::Result<(String, String)> {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| anyhow!("LOKI_LABELS item '{item}' is not key=value"))?;
            let key = key.trim();
            if key.is_empty() {
                bail!("LOKI_LABELS item '{item}' has an empty key");
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
