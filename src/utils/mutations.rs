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
//! # Mutations Utility Module
//!
//! Builders for the `ProcessingResponse` messages the processor sends back to
//! Envoy. Every request message gets exactly one response; when there is
//! nothing to change that response is `ProcessingResponse::default()`.

use crate::envoy::config::core::v3::{
    header_value_option::HeaderAppendAction, HeaderValue, HeaderValueOption,
};
use crate::envoy::service::ext_proc::v3::{
    processing_response::Response as ProcessingResponseType, CommonResponse, HeaderMutation,
    HeadersResponse, ProcessingResponse,
};

/// Creates a processing response that overwrites (or adds) request headers.
///
/// # Arguments
///
/// * `headers_to_set` - (key, value) pairs to write
#[allow(deprecated)]
pub fn request_header_mutation(headers_to_set: Vec<(String, String)>) -> ProcessingResponse {
    let header_mutation = HeaderMutation {
        set_headers: headers_to_set
            .into_iter()
            .map(|(key, value)| HeaderValueOption {
                header: Some(HeaderValue {
                    key,
                    raw_value: value.into_bytes(),
                    ..Default::default()
                }),
                append: None, // Superseded by append_action
                append_action: HeaderAppendAction::OverwriteIfExistsOrAdd as i32,
                keep_empty_value: false,
            })
            .collect(),
        remove_headers: Vec::new(),
    };

    let common_response = CommonResponse {
        header_mutation: Some(header_mutation),
        ..Default::default()
    };

    ProcessingResponse {
        response: Some(ProcessingResponseType::RequestHeaders(HeadersResponse {
            response: Some(common_response),
        })),
    }
}

/// Builds the response for a request headers message.
///
/// No (or an empty) country code yields the empty response. Otherwise the
/// response overwrites `header_name` with the code, so a value supplied by
/// the client never reaches the upstream.
pub fn country_code_response(header_name: &str, country_code: Option<&str>) -> ProcessingResponse {
    match country_code {
        Some(code) if !code.is_empty() => {
            request_header_mutation(vec![(header_name.to_string(), code.to_string())])
        }
        _ => ProcessingResponse::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_code_response_sets_single_header() {
        let response = country_code_response("x-country-code", Some("US"));

        if let Some(ProcessingResponseType::RequestHeaders(headers_response)) = response.response {
            let common_response = headers_response.response.unwrap();
            assert!(!common_response.clear_route_cache);

            let header_mutation = common_response.header_mutation.unwrap();
            assert_eq!(header_mutation.set_headers.len(), 1);
            assert!(header_mutation.remove_headers.is_empty());

            let option = &header_mutation.set_headers[0];
            assert_eq!(
                option.append_action,
                HeaderAppendAction::OverwriteIfExistsOrAdd as i32
            );
            let header = option.header.as_ref().unwrap();
            assert_eq!(header.key, "x-country-code");
            assert_eq!(String::from_utf8_lossy(&header.raw_value), "US");
        } else {
            panic!("Expected RequestHeaders response");
        }
    }

    #[test]
    fn test_country_code_response_uses_given_header_name() {
        let response = country_code_response("x-geo-country", Some("DE"));
        let expected =
            request_header_mutation(vec![("x-geo-country".to_string(), "DE".to_string())]);
        assert_eq!(response, expected);
    }

    #[test]
    fn test_missing_or_empty_country_code_is_empty_response() {
        assert_eq!(
            country_code_response("x-country-code", None),
            ProcessingResponse::default()
        );
        assert_eq!(
            country_code_response("x-country-code", Some("")),
            ProcessingResponse::default()
        );
    }

    #[test]
    fn test_request_header_mutation_overwrites_every_header() {
        let response = request_header_mutation(vec![
            ("x-country-code".to_string(), "FR".to_string()),
            ("x-test".to_string(), "value".to_string()),
        ]);

        if let Some(ProcessingResponseType::RequestHeaders(headers_response)) = response.response {
            let common_response = headers_response.response.unwrap();
            assert!(!common_response.clear_route_cache);

            let header_mutation = common_response.header_mutation.unwrap();
            assert!(header_mutation.remove_headers.is_empty());
            let keys: Vec<&str> = header_mutation
                .set_headers
                .iter()
                .map(|option| option.header.as_ref().unwrap().key.as_str())
                .collect();
            assert_eq!(keys, vec!["x-country-code", "x-test"]);
            assert!(header_mutation.set_headers.iter().all(|option| {
                option.append_action == HeaderAppendAction::OverwriteIfExistsOrAdd as i32
            }));
        } else {
            panic!("Expected RequestHeaders response");
        }
    }
}
