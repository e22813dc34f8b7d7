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
//! Envoy external processor that tags each request with the country of its
//! client address.
//!
//! Envoy opens a `Process` stream per HTTP request. For the request headers
//! phase the processor reads the client IP from a configured header (by
//! default `x-forwarded-for`), resolves it against a MaxMind GeoIP database
//! and answers with a mutation setting `x-country-code`. Every other phase,
//! and any lookup failure, is answered with an empty response.

pub mod config;
pub mod geoip;
pub mod processor;
pub mod server;
pub mod service;
pub mod session;
pub mod utils;

mod gen;
pub use gen::{envoy, FILE_DESCRIPTOR_SET};

#[cfg(test)]
mod test_utils;
