// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_BUFFER_SIZE, DEFAULT_PERIOD, DEFAULT_SEND_TIMEOUT,
    DEFAULT_USER_AGENT, DEFAULT_WRITE_TIMEOUT, PUSH_PATH,
};
use crate::entry::TimestampPrecision;
use crate::error::ConfigError;
use crate::retry::RetryStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Authentication applied to every push request.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Basic { username, .. } => write!(f, "Basic({username}:***)"),
            Auth::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

/// Configuration of a [`LokiClient`](crate::client::LokiClient).
///
/// Fields are plain data so the struct can also be written as a literal
/// starting from [`ClientConfig::new`]; [`ClientConfig::builder`] covers the
/// common case.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    /// Stream labels, identical for every batch.
    pub labels: BTreeMap<String, String>,
    pub auth: Auth,
    /// Number of entries that triggers an immediate flush.
    pub batch_size: usize,
    /// Capacity of the ingestion queue.
    pub buffer_size: usize,
    /// Interval of the periodic flush.
    pub period: Duration,
    /// How long a producer waits for queue space.
    pub write_timeout: Duration,
    /// Bound on a single HTTP attempt.
    pub send_timeout: Duration,
    pub retry_strategy: RetryStrategy,
    pub timestamp_precision: TimestampPrecision,
    pub user_agent: String,
    /// Delay between a shutdown request and closing the queue.
    pub shutdown_grace: Duration,
    /// Transport override. When `None`, one is built from this config.
    pub http_client: Option<reqwest::Client>,
}

impl ClientConfig {
    /// Config with every option at its default.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: Scheme::default(),
            labels: BTreeMap::new(),
            auth: Auth::None,
            batch_size: DEFAULT_BATCH_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            period: DEFAULT_PERIOD,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            retry_strategy: RetryStrategy::default(),
            timestamp_precision: TimestampPrecision::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            shutdown_grace: Duration::ZERO,
            http_client: None,
        }
    }

    #[must_use]
    pub fn builder(host: impl Into<String>, port: u16) -> ClientConfigBuilder {
        ClientConfigBuilder::new(host, port)
    }

    /// Full URL of the push endpoint.
    #[must_use]
    pub fn push_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme.as_str(),
            self.host,
            self.port,
            PUSH_PATH
        )
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host cannot be empty".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("period", self.period),
            ("write_timeout", self.write_timeout),
            ("send_timeout", self.send_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        if reqwest::header::HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ConfigError::Invalid(
                "user_agent is not a valid header value".to_string(),
            ));
        }
        if self.retry_strategy.attempts() == 0 {
            return Err(ConfigError::Invalid(
                "retry strategy must allow at least one attempt".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ClientConfig`].
///
/// Options apply in call order: the last call wins for every field except
/// labels, which merge.
#[derive(Debug, Clone)]
#[must_use]
pub struct ClientConfigBuilder {
    config: ClientConfig,
    basic: Option<(String, String)>,
    bearer: Option<String>,
}

impl ClientConfigBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            config: ClientConfig::new(host, port),
            basic: None,
            bearer: None,
        }
    }

    pub fn labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.labels.insert(key.into(), value.into());
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.config.period = period;
        self
    }

    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.config.send_timeout = timeout;
        self
    }

    pub fn use_https(mut self, https: bool) -> Self {
        self.config.scheme = if https { Scheme::Https } else { Scheme::Http };
        self
    }

    /// Basic auth is only applied when both values are non-empty, and then
    /// takes precedence over a bearer token.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic = Some((username.into(), password.into()));
        self
    }

    /// Ignored when empty.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.config.http_client = Some(client);
        self
    }

    pub fn retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.config.retry_strategy = strategy;
        self
    }

    pub fn timestamp_precision(mut self, precision: TimestampPrecision) -> Self {
        self.config.timestamp_precision = precision;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let mut config = self.config;
        config.auth = resolve_auth(self.basic, self.bearer);
        config.validate()?;
        Ok(config)
    }
}

fn resolve_auth(basic: Option<(String, String)>, bearer: Option<String>) -> Auth {
    match (basic, bearer) {
        (Some((username, password)), _) if !username.is_empty() && !password.is_empty() => {
            Auth::Basic { username, password }
        }
        (_, Some(token)) if !token.is_empty() => Auth::Bearer(token),
        _ => Auth::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::builder("localhost", 3100).build().unwrap();

        assert_eq!(config.scheme, Scheme::Http);
        assert!(config.labels.is_empty());
        assert_eq!(config.auth, Auth::None);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.buffer_size, 1000);
        assert_eq!(config.period, Duration::from_secs(15));
        assert_eq!(config.write_timeout, Duration::from_millis(100));
        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert_eq!(config.retry_strategy, RetryStrategy::default());
        assert_eq!(config.shutdown_grace, Duration::ZERO);
        assert!(config.http_client.is_none());
        assert!(config.user_agent.starts_with("loki-client/"));
    }

    #[test]
    fn test_push_url() {
        let config = ClientConfig::new("localhost", 3100);
        assert_eq!(config.push_url(), "http://localhost:3100/loki/api/v1/push");

        let config = ClientConfig::builder("logs.example.com", 443)
            .use_https(true)
            .build()
            .unwrap();
        assert_eq!(
            config.push_url(),
            "https://logs.example.com:443/loki/api/v1/push"
        );
    }

    #[test]
    fn test_last_write_wins() {
        let config = ClientConfig::builder("localhost", 3100)
            .batch_size(10)
            .use_https(true)
            .batch_size(20)
            .use_https(false)
            .build()
            .unwrap();

        assert_eq!(config.batch_size, 20);
        assert_eq!(config.scheme, Scheme::Http);
    }

    #[test]
    fn test_labels_merge() {
        let config = ClientConfig::builder("localhost", 3100)
            .labels([("app", "my_app"), ("env", "dev")])
            .labels([("env", "prod"), ("service_name", "my_service")])
            .label("region", "eu")
            .build()
            .unwrap();

        assert_eq!(config.labels.len(), 4);
        assert_eq!(config.labels["app"], "my_app");
        assert_eq!(config.labels["env"], "prod");
        assert_eq!(config.labels["service_name"], "my_service");
        assert_eq!(config.labels["region"], "eu");
    }

    #[test]
    fn test_basic_auth_takes_precedence() {
        let config = ClientConfig::builder("localhost", 3100)
            .bearer_token("myToken")
            .basic_auth("johnDoe", "12345")
            .build()
            .unwrap();

        assert_eq!(
            config.auth,
            Auth::Basic {
                username: "johnDoe".to_string(),
                password: "12345".to_string()
            }
        );
    }

    #[test]
    fn test_empty_basic_auth_falls_back_to_bearer() {
        let config = ClientConfig::builder("localhost", 3100)
            .basic_auth("", "")
            .bearer_token("myToken")
            .build()
            .unwrap();
        assert_eq!(config.auth, Auth::Bearer("myToken".to_string()));

        let config = ClientConfig::builder("localhost", 3100)
            .basic_auth("johnDoe", "")
            .build()
            .unwrap();
        assert_eq!(config.auth, Auth::None);
    }

    #[test]
    fn test_empty_bearer_is_ignored() {
        let config = ClientConfig::builder("localhost", 3100)
            .bearer_token("")
            .build()
            .unwrap();
        assert_eq!(config.auth, Auth::None);
    }

    #[test]
    fn test_auth_debug_hides_secrets() {
        let basic = Auth::Basic {
            username: "johnDoe".to_string(),
            password: "12345".to_string(),
        };
        assert!(!format!("{basic:?}").contains("12345"));
        assert!(!format!("{:?}", Auth::Bearer("myToken".to_string())).contains("myToken"));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(ClientConfig::builder("localhost", 3100)
            .batch_size(0)
            .build()
            .is_err());
        assert!(ClientConfig::builder("localhost", 3100)
            .buffer_size(0)
            .build()
            .is_err());
        assert!(ClientConfig::builder("localhost", 3100)
            .period(Duration::ZERO)
            .build()
            .is_err());
        assert!(ClientConfig::builder("localhost", 3100)
            .write_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(ClientConfig::builder("localhost", 3100)
            .send_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(ClientConfig::builder("localhost", 3100)
            .retry_strategy(RetryStrategy::Immediate(0))
            .build()
            .is_err());
    }

    #[test]
    fn test_validate_user_agent() {
        assert!(ClientConfig::builder("localhost", 3100)
            .user_agent("bad\nagent")
            .build()
            .is_err());
        let config = ClientConfig::builder("localhost", 3100)
            .user_agent("GoLokiClient")
            .build()
            .unwrap();
        assert_eq!(config.user_agent, "GoLokiClient");
    }

    #[test]
    fn test_validate_empty_host() {
        assert!(ClientConfig::builder("", 3100).build().is_err());
        assert!(ClientConfig::builder("   ", 3100).build().is_err());
    }

    #[test]
    fn test_zero_shutdown_grace_is_valid() {
        let config = ClientConfig::builder("localhost", 3100)
            .shutdown_grace(Duration::ZERO)
            .build();
        assert!(config.is_ok());
    }
}
