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
//! # Server Module
//!
//! Hosts the GeoIP processor as an Envoy `ExternalProcessor` gRPC service.
//!
//! ## Overview
//!
//! [`ProcessorServer`] is responsible for:
//!
//! - Binding the gRPC listener (a bind failure is a startup failure)
//! - Limiting concurrent HTTP/2 streams per connection
//! - Serving over TLS when a certificate and key are configured
//! - Optionally running a plain HTTP health check endpoint
//! - Serving gRPC reflection for the `ExternalProcessor` protos
//! - Draining in-flight streams once the shutdown signal fires

use crate::config::{Settings, TlsFiles};
use crate::processor::GeoIpProcessor;
use crate::service::ExtProcService;
use crate::FILE_DESCRIPTOR_SET;
use futures::Stream;
use hyper::{Body, Response, Server as HyperServer};
use log::{error, info};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tonic::transport::{Identity, Server, ServerTlsConfig};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read TLS file {path:?}: {source}")]
    TlsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to configure TLS: {0}")]
    Tls(#[source] tonic::transport::Error),
    #[error("failed to build reflection service: {0}")]
    Reflection(#[source] tonic_reflection::server::Error),
    #[error("gRPC server error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// Adapts a `TcpListener` into the stream of connections that tonic and
/// hyper accept.
struct TcpListenerStream {
    listener: TcpListener,
}

impl Stream for TcpListenerStream {
    type Item = Result<tokio::net::TcpStream, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.listener.poll_accept(cx) {
            Poll::Ready(Ok((socket, _addr))) => Poll::Ready(Some(Ok(socket))),
            Poll::Ready(Err(err)) => Poll::Ready(Some(Err(err))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Hosts [`ExtProcService`] and the optional health check for one set of
/// [`Settings`].
pub struct ProcessorServer {
    settings: Settings,
}

impl ProcessorServer {
    /// Creates a new server.
    ///
    /// # Arguments
    ///
    /// * `settings` - Listener, TLS and health check settings
    ///
    /// # Returns
    ///
    /// A new `ProcessorServer` instance
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Serves `processor` until `shutdown` resolves.
    ///
    /// Startup errors (TLS files, binding) are returned before any stream is
    /// accepted. After `shutdown` fires no new connections are accepted and
    /// in-flight streams are allowed to finish.
    ///
    /// # Arguments
    ///
    /// * `processor` - The GeoIP processor shared by every stream
    /// * `shutdown` - Future that starts graceful shutdown when it resolves
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    pub async fn run<F>(&self, processor: GeoIpProcessor, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let identity = match &self.settings.tls {
            Some(tls) => Some(load_identity(tls).await?),
            None => None,
        };

        let address = self.settings.server.address();
        let listener = bind(address).await?;
        match listener.local_addr() {
            Ok(local) => info!("Starting gRPC server on {} ({})", address, local),
            Err(_) => info!("Starting gRPC server on {}", address),
        }

        let health_check = match &self.settings.health_check_address {
            Some(health_address) => Some(spawn_health_check(health_address).await?.1),
            None => None,
        };

        let result = self.serve(listener, identity, processor, shutdown).await;

        if let Some(handle) = health_check {
            handle.abort();
        }
        result
    }

    /// Serves the gRPC services on an already bound listener.
    ///
    /// # Arguments
    ///
    /// * `listener` - The bound gRPC listener
    /// * `identity` - Server certificate and key, if TLS is enabled
    /// * `processor` - The GeoIP processor shared by every stream
    /// * `shutdown` - Future that starts graceful shutdown when it resolves
    ///
    /// # Returns
    ///
    /// A `Result` indicating success or failure
    async fn serve<F>(
        &self,
        listener: TcpListener,
        identity: Option<Identity>,
        processor: GeoIpProcessor,
        shutdown: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build()
            .map_err(ServerError::Reflection)?;

        let mut builder = Server::builder();
        if let Some(identity) = identity {
            builder = builder
                .tls_config(ServerTlsConfig::new().identity(identity))
                .map_err(ServerError::Tls)?;
        }

        builder
            .max_concurrent_streams(self.settings.server.max_concurrent_streams())
            .add_service(reflection)
            .add_service(ExtProcService::new(processor).into_server())
            .serve_with_incoming_shutdown(TcpListenerStream { listener }, async {
                shutdown.await;
                info!("Stopping server");
            })
            .await
            .map_err(ServerError::from)
    }
}

/// Binds a TCP listener, reporting the address on failure.
async fn bind(address: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })
}

async fn read_tls_file(path: &Path) -> Result<Vec<u8>, ServerError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ServerError::TlsFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads the PEM certificate and key into a server identity.
///
/// # Arguments
///
/// * `tls` - Paths of the certificate and key files
///
/// # Returns
///
/// The `Identity` used to configure TLS
async fn load_identity(tls: &TlsFiles) -> Result<Identity, ServerError> {
    info!("Loading TLS certificates...");
    let cert = read_tls_file(&tls.cert_file).await?;
    let key = read_tls_file(&tls.key_file).await?;
    Ok(Identity::from_pem(cert, key))
}

/// Binds the health check listener and serves an empty 200 OK for every
/// request from a background task.
async fn spawn_health_check(address: &str) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
    let listener = bind(address).await?;
    let local = listener
        .local_addr()
        .map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })?;
    info!("Starting health check server on {}", local);

    let make_service = hyper::service::make_service_fn(|_| async {
        Ok::<_, Infallible>(hyper::service::service_fn(|_| async {
            Ok::<_, Infallible>(Response::new(Body::from("")))
        }))
    });

    let server = HyperServer::builder(hyper::server::accept::from_stream(TcpListenerStream {
        listener,
    }))
    .serve(make_service);

    let handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Health check server failed: {}", e);
        }
    });
    Ok((local, handle))
}
