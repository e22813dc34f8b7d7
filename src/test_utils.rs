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
//! Shared helpers for unit tests.

use crate::envoy::config::core::v3::{HeaderMap, HeaderValue};
use crate::envoy::service::ext_proc::v3::{
    processing_request::Request as ProcessingRequestType,
    processing_response::Response as ProcessingResponseType, HttpHeaders, ProcessingRequest,
    ProcessingResponse,
};
use crate::geoip::{CountryResolver, LookupError};
use maxminddb::MaxMindDBError;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Resolver returning canned results and counting how often it is asked.
pub struct StaticResolver {
    entries: HashMap<IpAddr, String>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(ip, code)| (ip.parse().expect("test ip"), code.to_string()))
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A resolver that knows no addresses.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A resolver whose every lookup fails with a database error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CountryResolver for StaticResolver {
    fn country_code(&self, ip: IpAddr) -> Result<Option<String>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MaxMindDBError::IoError("simulated read failure".to_string()).into());
        }
        Ok(self.entries.get(&ip).cloned())
    }
}

/// Builds a request headers message from (key, value) pairs.
pub fn request_headers(pairs: &[(&str, &str)]) -> ProcessingRequest {
    ProcessingRequest {
        request: Some(ProcessingRequestType::RequestHeaders(HttpHeaders {
            headers: Some(HeaderMap {
                headers: pairs
                    .iter()
                    .map(|(key, value)| HeaderValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        ..Default::default()
                    })
                    .collect(),
            }),
            ..Default::default()
        })),
    }
}

/// Flattens the set-header instructions of a request headers response.
pub fn set_headers(response: &ProcessingResponse) -> Vec<(String, String)> {
    let Some(ProcessingResponseType::RequestHeaders(headers_response)) = &response.response else {
        return Vec::new();
    };
    headers_response
        .response
        .as_ref()
        .and_then(|common| common.header_mutation.as_ref())
        .map(|mutation| {
            mutation
                .set_headers
                .iter()
                .filter_map(|option| option.header.as_ref())
                .map(|header| {
                    (
                        header.key.clone(),
                        String::from_utf8_lossy(&header.raw_value).into_owned(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
