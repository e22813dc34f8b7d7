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
//! # Stream sessions
//!
//! One [`StreamSession`] drives one `Process` stream opened by Envoy. It
//! receives a message, lets the [`GeoIpProcessor`] answer it and sends that
//! answer back, strictly one at a time, until the stream ends.
//!
//! Termination rules:
//!
//! - end of the inbound stream: `Ok(())`
//! - inbound error: `Code::Unknown`
//! - cancellation, checked before every receive: `Code::Cancelled`
//!
//! A failed send is only logged. The session keeps receiving so that the
//! outcome of the stream is decided by the inbound side and the token.

use crate::envoy::service::ext_proc::v3::{ProcessingRequest, ProcessingResponse};
use crate::processor::GeoIpProcessor;
use futures::{Stream, StreamExt};
use log::{debug, error};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Sending half of a `Process` response stream.
pub type ResponseSender = mpsc::Sender<Result<ProcessingResponse, Status>>;

pub struct StreamSession {
    processor: Arc<GeoIpProcessor>,
    cancel: CancellationToken,
}

impl StreamSession {
    pub fn new(processor: Arc<GeoIpProcessor>, cancel: CancellationToken) -> Self {
        Self { processor, cancel }
    }

    pub async fn run<S>(&self, mut inbound: S, outbound: &ResponseSender) -> Result<(), Status>
    where
        S: Stream<Item = Result<ProcessingRequest, Status>> + Unpin,
    {
        debug!("New stream");
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Stream cancelled");
                    return Err(Status::cancelled("stream cancelled"));
                }
                next = inbound.next() => next,
            };

            let request = match next {
                None => {
                    debug!("Stream closed by client");
                    return Ok(());
                }
                Some(Err(status)) => {
                    return Err(Status::unknown(format!(
                        "cannot receive stream request: {}",
                        status
                    )));
                }
                Some(Ok(request)) => request,
            };

            let response = self.processor.process(&request);
            if let Err(e) = outbound.send(Ok(response)).await {
                error!("Unable to send response: {}", e);
            }
        }
    }
}
