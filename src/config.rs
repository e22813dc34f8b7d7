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
//! Configuration for the GeoIP external processor.
//!
//! [`ServerConfig`] is the immutable value shared by every stream: which
//! request header carries the client address, which header receives the
//! country code, and the listener limits handed to the transport.
//! [`Settings`] adds the process-level pieces (database location, health
//! check, TLS) and is resolved from defaults, an optional JSON file and the
//! environment, in that order.

use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_ADDRESS: &str = "localhost:8000";
pub const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 1000;
pub const DEFAULT_IP_HEADER: &str = "x-forwarded-for";
pub const DEFAULT_COUNTRY_HEADER: &str = "x-country-code";

/// Environment variable naming an optional JSON settings file.
pub const CONFIG_FILE_VAR: &str = "CONFIG_FILE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("GEOIP_DB required")]
    MissingGeoIpDb,
    #[error("{0} header name must not be empty")]
    EmptyHeaderName(&'static str),
    #[error("max_concurrent_streams must be greater than zero")]
    ZeroStreamLimit,
    #[error("TLS requires both a certificate and a key file")]
    IncompleteTls,
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Header names and listener limits used by the processor.
///
/// Header names are stored lowercased. Once built the value is only read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    address: String,
    max_concurrent_streams: u32,
    ip_header: String,
    country_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfig {
    /// Creates a configuration with the default header names and limits.
    pub fn new() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_concurrent_streams: DEFAULT_MAX_CONCURRENT_STREAMS,
            ip_header: DEFAULT_IP_HEADER.to_string(),
            country_header: DEFAULT_COUNTRY_HEADER.to_string(),
        }
    }

    /// Sets the address the gRPC listener binds to (format: "host:port").
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_max_concurrent_streams(mut self, max: u32) -> Self {
        self.max_concurrent_streams = max;
        self
    }

    /// Sets the request header the client IP is extracted from.
    pub fn with_ip_header(mut self, header: impl Into<String>) -> Self {
        self.ip_header = header.into().to_ascii_lowercase();
        self
    }

    /// Sets the request header the country code is written to.
    pub fn with_country_header(mut self, header: impl Into<String>) -> Self {
        self.country_header = header.into().to_ascii_lowercase();
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn max_concurrent_streams(&self) -> u32 {
        self.max_concurrent_streams
    }

    pub fn ip_header(&self) -> &str {
        &self.ip_header
    }

    pub fn country_header(&self) -> &str {
        &self.country_header
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ip_header.trim().is_empty() {
            return Err(ConfigError::EmptyHeaderName("ip"));
        }
        if self.country_header.trim().is_empty() {
            return Err(ConfigError::EmptyHeaderName("country code"));
        }
        if self.max_concurrent_streams == 0 {
            return Err(ConfigError::ZeroStreamLimit);
        }
        Ok(())
    }

    // Values read from a file bypass the builder methods.
    fn normalized(mut self) -> Self {
        self.ip_header.make_ascii_lowercase();
        self.country_header.make_ascii_lowercase();
        self
    }
}

/// Certificate and key used to serve gRPC over TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// Fully resolved process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    /// Path to the MaxMind GeoIP2/GeoLite2 database.
    pub geoip_db: PathBuf,
    /// Address for the health check HTTP server, disabled when unset.
    pub health_check_address: Option<String>,
    pub tls: Option<TlsFiles>,
}

impl Settings {
    /// Resolves settings from the process environment.
    ///
    /// Recognised variables: `CONFIG_FILE`, `ADDR`, `MAX_CONCURRENT_STREAMS`,
    /// `GEOIP_DB`, `IP_HEADER`, `COUNTRY_HEADER`, `HEALTH_CHECK_ADDR`,
    /// `TLS_CERT_FILE` and `TLS_KEY_FILE`. Empty values count as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with a caller supplied variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let mut raw = match var(CONFIG_FILE_VAR) {
            Some(path) => RawSettings::from_file(Path::new(&path))?,
            None => RawSettings::default(),
        };

        if let Some(address) = var("ADDR") {
            raw.server.address = address;
        }
        if let Some(max) = var("MAX_CONCURRENT_STREAMS") {
            match max.parse() {
                Ok(max) => raw.server.max_concurrent_streams = max,
                Err(e) => warn!(
                    "Ignoring MAX_CONCURRENT_STREAMS={:?} ({}), using {}",
                    max, e, raw.server.max_concurrent_streams
                ),
            }
        }
        if let Some(header) = var("IP_HEADER") {
            raw.server.ip_header = header;
        }
        if let Some(header) = var("COUNTRY_HEADER") {
            raw.server.country_header = header;
        }
        if let Some(path) = var("GEOIP_DB") {
            raw.geoip_db = Some(path.into());
        }
        if let Some(address) = var("HEALTH_CHECK_ADDR") {
            raw.health_check_address = Some(address);
        }
        if let Some(path) = var("TLS_CERT_FILE") {
            raw.cert_file = Some(path.into());
        }
        if let Some(path) = var("TLS_KEY_FILE") {
            raw.key_file = Some(path.into());
        }

        raw.into_settings()
    }

    /// Parses settings from a JSON document without consulting the environment.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        RawSettings::from_json_str(json)?.into_settings()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    #[serde(flatten)]
    server: ServerConfig,
    geoip_db: Option<PathBuf>,
    health_check_address: Option<String>,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
}

impl RawSettings {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    fn into_settings(self) -> Result<Settings, ConfigError> {
        let server = self.server.normalized();
        server.validate()?;

        let geoip_db = self
            .geoip_db
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingGeoIpDb)?;

        let tls = match (self.cert_file, self.key_file) {
            (Some(cert_file), Some(key_file)) => Some(TlsFiles {
                cert_file,
                key_file,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(Settings {
            server,
            geoip_db,
            health_check_address: self.health_check_address.filter(|a| !a.is_empty()),
            tls,
        })
    }
}
