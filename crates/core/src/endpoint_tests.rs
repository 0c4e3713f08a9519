// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    defaults              = { None, None, "http://127.0.0.1:8100/" },
    empty_base_with_port  = { Some(""), Some(9100), "http://127.0.0.1:9100/" },
    custom_base           = { Some("http://mockurl"), Some(9100), "http://mockurl:9100/" },
    custom_base_slash     = { Some("http://mockurl/"), Some(9100), "http://mockurl:9100/" },
    base_port_is_replaced = { Some("http://mockurl:1234/some/path"), None, "http://mockurl:8100/" },
    https_base            = { Some("https://10.0.0.2"), Some(8200), "https://10.0.0.2:8200/" },
)]
fn derive(base: Option<&str>, port: Option<u16>, expected: &str) {
    let endpoint = AgentEndpoint::derive(base, port).unwrap();
    assert_eq!(endpoint.href(), expected);
}

#[test]
fn parse_keeps_override_verbatim() {
    let endpoint = AgentEndpoint::parse("https://127.0.0.1:8100/").unwrap();
    assert_eq!(endpoint.href(), "https://127.0.0.1:8100/");
    assert_eq!(endpoint.scheme(), "https");
    assert_eq!(endpoint.hostname(), "127.0.0.1");
    assert_eq!(endpoint.port(), 8100);
    assert_eq!(endpoint.base_path(), "");
}

#[test]
fn parse_exposes_base_path() {
    let endpoint = AgentEndpoint::parse("http://127.0.0.1:8100/aabbccdd").unwrap();
    assert_eq!(endpoint.hostname(), "127.0.0.1");
    assert_eq!(endpoint.port(), 8100);
    assert_eq!(endpoint.path(), "/aabbccdd");
    assert_eq!(endpoint.base_path(), "/aabbccdd");
}

#[test]
fn parse_rejects_relative_url() {
    let err = AgentEndpoint::parse("not a url").unwrap_err();
    assert!(matches!(err, EndpointError::Invalid { .. }), "got {err:?}");
}

#[test]
fn parse_rejects_url_without_host() {
    let err = AgentEndpoint::parse("unix:/tmp/agent.sock").unwrap_err();
    assert!(matches!(err, EndpointError::MissingHost(_)), "got {err:?}");
}

#[test]
fn derive_is_idempotent() {
    let first = AgentEndpoint::derive(Some("http://mockurl"), Some(9100)).unwrap();
    let second = AgentEndpoint::derive(Some("http://mockurl"), Some(9100)).unwrap();
    assert_eq!(first, second);
}

proptest::proptest! {
    #[test]
    fn derived_port_round_trips(port in 1u16..) {
        let endpoint = AgentEndpoint::derive(None, Some(port)).unwrap();
        proptest::prop_assert_eq!(endpoint.port(), port);
        proptest::prop_assert_eq!(endpoint.hostname(), "127.0.0.1");
        proptest::prop_assert_eq!(endpoint.base_path(), "");
    }
}
