// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Recording mock of a Loki push endpoint.
//!
//! Answers the n-th request with the n-th scripted status code (204 once the
//! script runs out), optionally after a fixed delay, and keeps every request
//! with the instant it arrived, so tests can check ordering, payloads and
//! retry spacing.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{body::Incoming, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;

#[derive(Clone, Debug)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub received_at: Instant,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }

    /// The `values` array of the single stream in a push request.
    pub fn values(&self) -> Vec<serde_json::Value> {
        self.json()["streams"][0]["values"]
            .as_array()
            .expect("missing values array")
            .clone()
    }
}

#[derive(Clone)]
pub struct MockServer {
    pub addr: SocketAddr,
    pub received_requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockServer {
    /// Start a mock server that accepts every request.
    pub async fn start() -> Self {
        Self::start_with_statuses(Vec::new()).await
    }

    /// Start a mock server answering with `statuses` in order.
    pub async fn start_with_statuses(statuses: Vec<u16>) -> Self {
        Self::start_scripted(statuses, Duration::ZERO).await
    }

    /// Start a mock server that holds every response for `delay`. Requests
    /// are recorded as soon as their body arrives.
    pub async fn start_with_delay(delay: Duration) -> Self {
        Self::start_scripted(Vec::new(), delay).await
    }

    async fn start_scripted(statuses: Vec<u16>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let received_requests = Arc::new(Mutex::new(Vec::new()));
        let requests_clone = received_requests.clone();
        let statuses = Arc::new(statuses);

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let io = TokioIo::new(stream);
                let requests = requests_clone.clone();
                let statuses = statuses.clone();

                tokio::spawn(async move {
                    let service = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let requests = requests.clone();
                        let statuses = statuses.clone();
                        async move {
                            let received_at = Instant::now();
                            let method = req.method().to_string();
                            let path = req.uri().path().to_string();
                            let headers: Vec<(String, String)> = req
                                .headers()
                                .iter()
                                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                                .collect();

                            let body = req
                                .into_body()
                                .collect()
                                .await
                                .map(|collected| collected.to_bytes().to_vec())
                                .unwrap_or_default();

                            let status = {
                                let mut requests = requests.lock().unwrap();
                                let status = statuses.get(requests.len()).copied().unwrap_or(204);
                                requests.push(ReceivedRequest {
                                    method,
                                    path,
                                    headers,
                                    body,
                                    received_at,
                                });
                                status
                            };

                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }

                            Response::builder()
                                .status(status)
                                .body(Full::new(Bytes::new()))
                        }
                    });

                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        MockServer {
            addr,
            received_requests,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Get all received requests
    pub fn get_requests(&self) -> Vec<ReceivedRequest> {
        self.received_requests.lock().unwrap().clone()
    }

    /// Poll until at least `count` requests arrived, or `limit` elapses.
    pub async fn wait_for_requests(&self, count: usize, limit: Duration) -> Vec<ReceivedRequest> {
        let deadline = Instant::now() + limit;
        loop {
            let requests = self.get_requests();
            if requests.len() >= count || Instant::now() >= deadline {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
