// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network location of a running agent.

use crate::constants::{WDA_AGENT_PORT, WDA_BASE_URL};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors from parsing or deriving an agent endpoint
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid agent url '{url}': {source}")]
    Invalid { url: String, source: url::ParseError },
    #[error("agent url '{0}' has no host")]
    MissingHost(String),
}

/// Absolute URL of the agent: scheme, hostname, port and base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEndpoint {
    url: Url,
}

impl AgentEndpoint {
    /// Parse an explicit agent URL, e.g. `http://127.0.0.1:8100/prefix`.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(raw)
            .map_err(|source| EndpointError::Invalid { url: raw.to_string(), source })?;
        if url.host_str().is_none() {
            return Err(EndpointError::MissingHost(raw.to_string()));
        }
        Ok(Self { url })
    }

    /// Derive the endpoint from a base URL and a local port.
    ///
    /// Only the scheme and hostname of `base_url` are kept; any port or path it
    /// carries is replaced. An empty or missing base falls back to
    /// [`WDA_BASE_URL`], a missing port to [`WDA_AGENT_PORT`].
    pub fn derive(base_url: Option<&str>, local_port: Option<u16>) -> Result<Self, EndpointError> {
        let base = base_url.filter(|b| !b.is_empty()).unwrap_or(WDA_BASE_URL);
        let parsed = Self::parse(base)?;
        let port = local_port.unwrap_or(WDA_AGENT_PORT);
        Self::parse(&format!("{}://{}:{}", parsed.scheme(), parsed.hostname(), port))
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn hostname(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(WDA_AGENT_PORT)
    }

    /// Raw URL path, `/` when none was given
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Path prefix proxies prepend to every command; empty for the root path.
    pub fn base_path(&self) -> &str {
        match self.url.path() {
            "/" => "",
            p => p,
        }
    }

    /// Full serialized URL
    pub fn href(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for AgentEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.href())
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
