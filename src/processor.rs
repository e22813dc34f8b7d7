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
use crate::config::ServerConfig;
use crate::envoy::service::ext_proc::v3::{
    processing_request::Request as ProcessingRequestType, HttpHeaders, ProcessingRequest,
    ProcessingResponse,
};
use crate::geoip::CountryResolver;
use crate::utils::{headers, mutations};
use log::{debug, warn};
use std::sync::Arc;

/// Turns each `ProcessingRequest` into exactly one `ProcessingResponse`.
///
/// Only the request headers phase is acted on; every other phase is answered
/// with an empty response so Envoy is never left waiting.
#[derive(Clone)]
pub struct GeoIpProcessor {
    config: Arc<ServerConfig>,
    resolver: Arc<dyn CountryResolver>,
}

impl GeoIpProcessor {
    pub fn new(config: ServerConfig, resolver: Arc<dyn CountryResolver>) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
        }
    }

    pub fn process(&self, req: &ProcessingRequest) -> ProcessingResponse {
        match &req.request {
            Some(ProcessingRequestType::RequestHeaders(headers)) => {
                debug!("Processing request headers");
                self.process_request_headers(headers)
            }
            Some(other) => {
                warn!("Unhandled request type: {}", phase_name(other));
                ProcessingResponse::default()
            }
            None => {
                warn!("Processing request without a phase");
                ProcessingResponse::default()
            }
        }
    }

    pub fn process_request_headers(&self, headers: &HttpHeaders) -> ProcessingResponse {
        let country_code = self.lookup_country(headers);
        mutations::country_code_response(self.config.country_header(), country_code.as_deref())
    }

    fn lookup_country(&self, http_headers: &HttpHeaders) -> Option<String> {
        let header_list = http_headers
            .headers
            .as_ref()
            .map(|map| map.headers.as_slice())
            .unwrap_or_default();

        let value = headers::last_header_value(header_list, self.config.ip_header())
            .filter(|value| !value.is_empty())?;
        debug!("ip header found: {}={}", self.config.ip_header(), value);

        let Some(ip) = headers::parse_client_ip(&value) else {
            warn!("Unable to parse client ip from {:?}", value);
            return None;
        };

        match self.resolver.country_code(ip) {
            Ok(Some(code)) => Some(code),
            Ok(None) => {
                warn!("No country found for ip {}", ip);
                None
            }
            Err(e) => {
                warn!("Unable to find country for ip {}: {}", ip, e);
                None
            }
        }
    }
}

fn phase_name(request: &ProcessingRequestType) -> &'static str {
    match request {
        ProcessingRequestType::RequestHeaders(_) => "request_headers",
        ProcessingRequestType::ResponseHeaders(_) => "response_headers",
        ProcessingRequestType::RequestBody(_) => "request_body",
        ProcessingRequestType::ResponseBody(_) => "response_body",
        ProcessingRequestType::RequestTrailers(_) => "request_trailers",
        ProcessingRequestType::ResponseTrailers(_) => "response_trailers",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envoy::service::ext_proc::v3::{HttpBody, HttpTrailers};
    use crate::test_utils::{request_headers, set_headers, StaticResolver};

    fn processor(resolver: &Arc<StaticResolver>) -> GeoIpProcessor {
        GeoIpProcessor::new(ServerConfig::new(), resolver.clone())
    }

    #[test]
    fn test_known_ip_sets_country_header() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let response = processor(&resolver)
            .process(&request_headers(&[("x-forwarded-for", "8.8.8.8")]));

        assert_eq!(
            set_headers(&response),
            vec![("x-country-code".to_string(), "US".to_string())]
        );
        assert_eq!(resolver.calls(), 1);
    }

    #[test]
    fn test_unknown_ip_is_empty_response() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let response = processor(&resolver)
            .process(&request_headers(&[("x-forwarded-for", "0.0.0.0")]));

        assert_eq!(response, ProcessingResponse::default());
        assert_eq!(resolver.calls(), 1);
    }

    #[test]
    fn test_missing_header_is_empty_response() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let processor = processor(&resolver);

        let response = processor.process(&request_headers(&[("host", "example.com")]));
        assert_eq!(response, ProcessingResponse::default());

        let response = processor.process(&ProcessingRequest {
            request: Some(ProcessingRequestType::RequestHeaders(HttpHeaders::default())),
        });
        assert_eq!(response, ProcessingResponse::default());
        assert_eq!(resolver.calls(), 0);
    }

    #[test]
    fn test_empty_header_skips_lookup() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let response = processor(&resolver).process(&request_headers(&[("x-forwarded-for", "")]));

        assert_eq!(response, ProcessingResponse::default());
        assert_eq!(resolver.calls(), 0);
    }

    #[test]
    fn test_unparseable_ip_skips_lookup() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let response =
            processor(&resolver).process(&request_headers(&[("x-forwarded-for", "not-an-ip")]));

        assert_eq!(response, ProcessingResponse::default());
        assert_eq!(resolver.calls(), 0);
    }

    #[test]
    fn test_last_ip_header_is_used() {
        let resolver = Arc::new(StaticResolver::new([("1.1.1.1", "AU"), ("8.8.8.8", "US")]));
        let response = processor(&resolver).process(&request_headers(&[
            ("x-forwarded-for", "1.1.1.1"),
            ("x-forwarded-for", "8.8.8.8"),
        ]));

        assert_eq!(
            set_headers(&response),
            vec![("x-country-code".to_string(), "US".to_string())]
        );
    }

    #[test]
    fn test_forwarded_chain_uses_client_address() {
        let resolver = Arc::new(StaticResolver::new([("1.1.1.1", "AU"), ("8.8.8.8", "US")]));
        let response = processor(&resolver)
            .process(&request_headers(&[("x-forwarded-for", "8.8.8.8, 1.1.1.1")]));

        assert_eq!(
            set_headers(&response),
            vec![("x-country-code".to_string(), "US".to_string())]
        );
    }

    #[test]
    fn test_resolver_error_is_empty_response() {
        let resolver = Arc::new(StaticResolver::failing());
        let response = processor(&resolver)
            .process(&request_headers(&[("x-forwarded-for", "8.8.8.8")]));

        assert_eq!(response, ProcessingResponse::default());
        assert_eq!(resolver.calls(), 1);
    }

    #[test]
    fn test_custom_header_names() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let config = ServerConfig::new()
            .with_ip_header("x-real-ip")
            .with_country_header("x-geo-country");
        let processor = GeoIpProcessor::new(config, resolver.clone());

        // The default header is no longer consulted.
        let response = processor.process(&request_headers(&[("x-forwarded-for", "8.8.8.8")]));
        assert_eq!(response, ProcessingResponse::default());

        let response = processor.process(&request_headers(&[("x-real-ip", "8.8.8.8")]));
        assert_eq!(
            set_headers(&response),
            vec![("x-geo-country".to_string(), "US".to_string())]
        );
    }

    #[test]
    fn test_default_config_matches_unconfigured_behavior() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let explicit = GeoIpProcessor::new(
            ServerConfig::new()
                .with_ip_header("x-forwarded-for")
                .with_country_header("x-country-code"),
            resolver.clone(),
        );
        let request = request_headers(&[("x-forwarded-for", "8.8.8.8")]);

        assert_eq!(
            explicit.process(&request),
            processor(&resolver).process(&request)
        );
    }

    #[test]
    fn test_header_name_match_ignores_case() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let response = processor(&resolver)
            .process(&request_headers(&[("X-Forwarded-For", "8.8.8.8")]));

        assert_eq!(
            set_headers(&response),
            vec![("x-country-code".to_string(), "US".to_string())]
        );
    }

    #[test]
    fn test_other_phases_get_empty_response() {
        let resolver = Arc::new(StaticResolver::new([("8.8.8.8", "US")]));
        let processor = processor(&resolver);

        let requests = vec![
            ProcessingRequest {
                request: Some(ProcessingRequestType::ResponseHeaders(HttpHeaders::default())),
            },
            ProcessingRequest {
                request: Some(ProcessingRequestType::RequestBody(HttpBody::default())),
            },
            ProcessingRequest {
                request: Some(ProcessingRequestType::ResponseTrailers(
                    HttpTrailers::default(),
                )),
            },
            ProcessingRequest::default(),
        ];

        for request in &requests {
            assert_eq!(processor.process(request), ProcessingResponse::default());
        }
        assert_eq!(resolver.calls(), 0);
    }
}
