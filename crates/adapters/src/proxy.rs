// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command proxies to the agent's HTTP endpoint.
//!
//! [`NoSessionProxy`] addresses the agent before any session exists
//! (`/status`, health checks). [`SessionProxy`] forwards commands on behalf
//! of a bound session. Both share the same URL contract and sit on a
//! [`ProxyTransport`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use wda_core::AgentEndpoint;

/// Errors from proxied commands
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Did not know what to do with url '{0}'")]
    InvalidPath(String),
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} responded with status {status}: {body}")]
    Status { url: String, status: u16, body: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Value,
}

/// Sends one HTTP request to the agent
#[async_trait]
pub trait ProxyTransport: Clone + Send + Sync + 'static {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError>;
}

/// HTTP transport backed by `reqwest`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder().build().map_err(|e| ProxyError::Transport {
            url: String::new(),
            message: format!("failed to create HTTP client: {e}"),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProxyTransport for ReqwestTransport {
    async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
        let url = request.url;
        let transport_err =
            |e: reqwest::Error| ProxyError::Transport { url: url.clone(), message: e.to_string() };

        let mut builder = self.client.request(request.method.into(), &url);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await.map_err(transport_err)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_err)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(ProxyResponse { status, body })
    }
}

/// Proxy for commands that do not belong to a session.
#[derive(Clone)]
pub struct NoSessionProxy<T> {
    scheme: String,
    server: String,
    port: u16,
    base: String,
    timeout: Arc<Mutex<Option<Duration>>>,
    transport: T,
}

impl<T: ProxyTransport> NoSessionProxy<T> {
    pub fn new(transport: T, endpoint: &AgentEndpoint, timeout: Option<Duration>) -> Self {
        Self::from_parts(
            transport,
            endpoint.scheme(),
            endpoint.hostname(),
            endpoint.port(),
            endpoint.base_path(),
            timeout,
        )
    }

    pub fn from_parts(
        transport: T,
        scheme: &str,
        server: &str,
        port: u16,
        base: &str,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            scheme: scheme.to_string(),
            server: server.to_string(),
            port,
            base: base.to_string(),
            timeout: Arc::new(Mutex::new(timeout)),
            transport,
        }
    }

    /// Absolute URL for a command path.
    ///
    /// An empty path means `/`. One trailing slash is dropped from the path
    /// before it is appended to the base.
    pub fn url_for(&self, path: &str) -> Result<String, ProxyError> {
        let path = if path.is_empty() { "/" } else { path };
        if !path.starts_with('/') {
            return Err(ProxyError::InvalidPath(path.to_string()));
        }
        let path = path.strip_suffix('/').unwrap_or(path);
        Ok(format!("{}://{}:{}{}{}", self.scheme, self.server, self.port, self.base, path))
    }

    pub async fn command(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> Result<Value, ProxyError> {
        let url = self.url_for(path)?;
        let timeout = self.timeout();
        tracing::debug!(%url, ?method, ?timeout, "proxying command");
        let response =
            self.transport.send(ProxyRequest { method, url: url.clone(), body, timeout }).await?;
        if !(200..300).contains(&response.status) {
            return Err(ProxyError::Status { url, status: response.status, body: response.body });
        }
        Ok(unwrap_value(response.body))
    }

    pub fn timeout(&self) -> Option<Duration> {
        *self.timeout.lock()
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        *self.timeout.lock() = timeout;
    }

    /// Use `timeout` until the returned guard is dropped
    pub fn override_timeout(&self, timeout: Duration) -> TimeoutGuard {
        let previous = self.timeout.lock().replace(timeout);
        TimeoutGuard { slot: Arc::clone(&self.timeout), previous }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

/// Restores a proxy's request timeout on drop.
#[must_use = "the timeout is restored as soon as the guard is dropped"]
pub struct TimeoutGuard {
    slot: Arc<Mutex<Option<Duration>>>,
    previous: Option<Duration>,
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        *self.slot.lock() = self.previous;
    }
}

/// Agent responses wrap their payload in `{"value": ...}`
fn unwrap_value(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("value") => {
            map.remove("value").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Proxy bound to the session currently driving the agent.
#[derive(Clone)]
pub struct SessionProxy<T> {
    proxy: NoSessionProxy<T>,
    session_id: Arc<Mutex<Option<String>>>,
}

impl<T: ProxyTransport> SessionProxy<T> {
    pub fn new(proxy: NoSessionProxy<T>) -> Self {
        Self { proxy, session_id: Arc::new(Mutex::new(None)) }
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    pub fn set_session_id(&self, session_id: Option<String>) {
        *self.session_id.lock() = session_id;
    }

    /// Forward a command, scoping it to the bound session when one is set.
    pub async fn command(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<Value>,
    ) -> Result<Value, ProxyError> {
        let path = self.session_path(path);
        self.proxy.command(&path, method, body).await
    }

    fn session_path(&self, path: &str) -> String {
        match self.session_id.lock().as_deref() {
            Some(id) if path.starts_with('/') && !path.starts_with("/session/") => {
                format!("/session/{id}{path}")
            }
            _ => path.to_string(),
        }
    }

    pub fn proxy(&self) -> &NoSessionProxy<T> {
        &self.proxy
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ProxyError, ProxyRequest, ProxyResponse, ProxyTransport};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    enum Reply {
        Json(u16, Value),
        Refused,
        Hang,
    }

    #[derive(Default)]
    struct FakeTransportState {
        requests: Vec<ProxyRequest>,
        replies: HashMap<String, VecDeque<Reply>>,
    }

    /// Transport that answers by URL path and records requests.
    ///
    /// Replies for a path are consumed in order; the last one repeats.
    /// Paths without replies are refused like a closed port.
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        inner: Arc<Mutex<FakeTransportState>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, path: &str, status: u16, body: Value) -> &Self {
            self.push(path, Reply::Json(status, body))
        }

        pub fn refuse(&self, path: &str) -> &Self {
            self.push(path, Reply::Refused)
        }

        /// Never answer; the request fails once its timeout elapses
        pub fn hang(&self, path: &str) -> &Self {
            self.push(path, Reply::Hang)
        }

        fn push(&self, path: &str, reply: Reply) -> &Self {
            self.inner.lock().replies.entry(path.to_string()).or_default().push_back(reply);
            self
        }

        pub fn requests(&self) -> Vec<ProxyRequest> {
            self.inner.lock().requests.clone()
        }

        /// Requested URLs, in order
        pub fn urls(&self) -> Vec<String> {
            self.requests().into_iter().map(|r| r.url).collect()
        }

        fn next_reply(&self, url: &str) -> Reply {
            let mut inner = self.inner.lock();
            let Some((_, queue)) =
                inner.replies.iter_mut().find(|(path, _)| url_path(url) == path.as_str())
            else {
                return Reply::Refused;
            };
            if queue.len() > 1 {
                queue.pop_front().unwrap_or(Reply::Refused)
            } else {
                queue.front().cloned().unwrap_or(Reply::Refused)
            }
        }
    }

    /// Path portion of an absolute URL
    fn url_path(url: &str) -> &str {
        let rest = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
        rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
    }

    #[async_trait]
    impl ProxyTransport for FakeTransport {
        async fn send(&self, request: ProxyRequest) -> Result<ProxyResponse, ProxyError> {
            self.inner.lock().requests.push(request.clone());
            match self.next_reply(&request.url) {
                Reply::Json(status, body) => Ok(ProxyResponse { status, body }),
                Reply::Refused => Err(ProxyError::Transport {
                    url: request.url,
                    message: "connection refused".to_string(),
                }),
                Reply::Hang => {
                    let wait = request.timeout.unwrap_or(Duration::from_secs(3600));
                    tokio::time::sleep(wait).await;
                    Err(ProxyError::Transport {
                        url: request.url,
                        message: format!("timed out after {}ms", wait.as_millis()),
                    })
                }
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransport;

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
