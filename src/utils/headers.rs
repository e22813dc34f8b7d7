// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Helpers for reading request headers sent by Envoy.

use crate::envoy::config::core::v3::HeaderValue;
use std::net::{IpAddr, SocketAddr};

/// Returns the value of the last header whose key matches `key`.
///
/// Keys are compared ASCII case-insensitively. Envoy may deliver the value in
/// either `value` or `raw_value`; `value` is preferred when both are set.
pub fn last_header_value(headers: &[HeaderValue], key: &str) -> Option<String> {
    headers
        .iter()
        .rev()
        .find(|header| header.key.eq_ignore_ascii_case(key))
        .map(header_value)
}

fn header_value(header: &HeaderValue) -> String {
    if !header.value.is_empty() {
        return header.value.clone();
    }
    String::from_utf8_lossy(&header.raw_value).into_owned()
}

/// Parses the client address out of an `x-forwarded-for` style value.
///
/// Only the first (left-most) hop of a comma separated list is considered.
/// Bare addresses and `addr:port` / `[v6]:port` forms are accepted.
pub fn parse_client_ip(value: &str) -> Option<IpAddr> {
    let first = value.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }
    first
        .parse::<IpAddr>()
        .ok()
        .or_else(|| first.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}
