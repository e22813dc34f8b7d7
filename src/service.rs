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
use crate::envoy::service::ext_proc::v3::{
    external_processor_server::{ExternalProcessor, ExternalProcessorServer},
    ProcessingRequest, ProcessingResponse,
};
use crate::processor::GeoIpProcessor;
use crate::session::StreamSession;
use futures::Stream;
use log::{debug, warn};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Request, Response, Status};

/// Responses buffered per stream before the session waits on Envoy.
const RESPONSE_BUFFER: usize = 32;

pub struct ExtProcService {
    processor: Arc<GeoIpProcessor>,
}

impl ExtProcService {
    pub fn new(processor: GeoIpProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }

    pub fn into_server(self) -> ExternalProcessorServer<Self> {
        ExternalProcessorServer::new(self)
    }

    /// Runs a session over `inbound` on its own task and returns the stream
    /// of responses handed back to Envoy.
    ///
    /// Dropping the returned stream cancels the session. A terminal status
    /// other than `Cancelled` is sent as the last item.
    fn spawn_session<S>(&self, inbound: S) -> ReceiverStream<Result<ProcessingResponse, Status>>
    where
        S: Stream<Item = Result<ProcessingRequest, Status>> + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(RESPONSE_BUFFER);
        let cancel = CancellationToken::new();
        let session = StreamSession::new(self.processor.clone(), cancel.clone());

        tokio::spawn(async move {
            // Envoy going away drops the response stream, which closes the channel.
            let watcher = {
                let tx = tx.clone();
                tokio::spawn(async move {
                    tx.closed().await;
                    cancel.cancel();
                })
            };

            let result = session.run(inbound, &tx).await;
            watcher.abort();

            match result {
                Ok(()) => debug!("Stream finished"),
                Err(status) if status.code() == Code::Cancelled => {
                    debug!("Stream cancelled by peer")
                }
                Err(status) => {
                    warn!("Stream failed: {}", status);
                    let _ = tx.send(Err(status)).await;
                }
            }
        });

        ReceiverStream::new(rx)
    }
}

#[tonic::async_trait]
impl ExternalProcessor for ExtProcService {
    type ProcessStream =
        Pin<Box<dyn Stream<Item = Result<ProcessingResponse, Status>> + Send + 'static>>;

    async fn process(
        &self,
        request: Request<tonic::Streaming<ProcessingRequest>>,
    ) -> Result<Response<Self::ProcessStream>, Status> {
        let responses = self.spawn_session(request.into_inner());
        Ok(Response::new(Box::pin(responses)))
    }
}
