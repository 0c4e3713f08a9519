// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload of the agent's `/status` endpoint.
//!
//! The agent owns this contract and adds fields over time. Only the few fields
//! the lifecycle code reads are typed; everything else is kept verbatim in the
//! `extra` maps so it can be handed back to callers untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured `/status` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<IosInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildInfo>,
    /// Fields this crate does not interpret, including typed sections whose
    /// shape did not match.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulator_version: Option<String>,
    /// Address of the device as seen by the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Build metadata of the running agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_bundle_identifier: Option<String>,
    /// Upgrade timestamp baked into the agent at build time; string or number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_at: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BuildInfo {
    /// `upgradedAt` rendered as a string, or `None` when absent or empty.
    pub fn upgraded_at(&self) -> Option<String> {
        match self.upgraded_at.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl AgentStatus {
    /// Build a status from an arbitrary JSON value.
    ///
    /// Returns `None` for anything but an object. Known sections that do not
    /// have the expected shape are left in `extra` instead of failing the
    /// whole payload.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        let state = take_typed(&mut map, "state");
        let os = take_typed(&mut map, "os");
        let ios = take_typed(&mut map, "ios");
        let build = take_typed(&mut map, "build");
        Some(Self { state, os, ios, build, extra: map })
    }

    /// Device IP reported by the agent, if any
    pub fn device_ip(&self) -> Option<&str> {
        self.ios.as_ref()?.ip.as_deref().filter(|ip| !ip.is_empty())
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn take_typed<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = map.remove(key)?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(typed) => Some(typed),
        Err(_) => {
            map.insert(key.to_string(), value);
            None
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
