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
//! # GeoIP lookup
//!
//! The processor only needs one question answered: which country does an
//! address belong to. [`CountryResolver`] is that capability; the production
//! implementation is [`MaxMindResolver`], backed by a GeoIP2 or GeoLite2
//! database loaded into memory once at startup and only read afterwards.

use log::info;
use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("geoip database error: {0}")]
    Database(#[from] MaxMindDBError),
}

#[derive(Error, Debug)]
#[error("unable to open geoip database {path:?}: {source}")]
pub struct OpenError {
    pub path: PathBuf,
    #[source]
    pub source: MaxMindDBError,
}

/// Resolves an IP address to an ISO 3166-1 country code.
///
/// Implementations are shared by every stream without locking.
pub trait CountryResolver: Send + Sync + 'static {
    /// Returns `Ok(None)` when the database has no country for `ip`.
    fn country_code(&self, ip: IpAddr) -> Result<Option<String>, LookupError>;
}

/// [`CountryResolver`] backed by a MaxMind DB file.
pub struct MaxMindResolver {
    reader: Reader<Vec<u8>>,
}

impl MaxMindResolver {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path).map_err(|source| OpenError {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Loaded geoip database {:?} (type {}, built {})",
            path, reader.metadata.database_type, reader.metadata.build_epoch
        );
        Ok(Self { reader })
    }
}

impl CountryResolver for MaxMindResolver {
    fn country_code(&self, ip: IpAddr) -> Result<Option<String>, LookupError> {
        match self.reader.lookup::<geoip2::Country>(ip) {
            Ok(record) => Ok(record
                .country
                .and_then(|country| country.iso_code)
                .filter(|code| !code.is_empty())
                .map(str::to_owned)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_database() {
        let err = match MaxMindResolver::open("/nonexistent/GeoLite2-Country.mmdb") {
            Ok(_) => panic!("opening a missing database should fail"),
            Err(e) => e,
        };
        assert_eq!(
            err.path,
            PathBuf::from("/nonexistent/GeoLite2-Country.mmdb")
        );
        assert!(err.to_string().contains("GeoLite2-Country.mmdb"));
    }

    #[test]
    fn test_open_rejects_non_database_file() {
        let path = std::env::temp_dir().join(format!(
            "geoip-ext-proc-not-a-db-{}.mmdb",
            std::process::id()
        ));
        std::fs::write(&path, b"definitely not a maxmind database").unwrap();

        let result = MaxMindResolver::open(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }
}
