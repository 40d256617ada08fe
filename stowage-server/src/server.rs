//! HTTP/1.1 server implementation

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use stowage_core::auth::Credentials;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::handlers::{handle_request, Endpoint};
use crate::store::ObjectStore;
use crate::Result;

pub struct StowageServer {
    endpoint: Endpoint,
}

impl StowageServer {
    pub fn new(store: ObjectStore, credentials: Credentials) -> Self {
        Self {
            endpoint: Endpoint::new(store, credentials),
        }
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_listener(listener).await
    }

    /// Accept connections on an already bound listener until it fails
    pub async fn serve_listener(self, listener: TcpListener) -> Result<()> {
        info!("stowage server listening on {}", listener.local_addr()?);

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            debug!("New connection from {}", remote_addr);

            let endpoint = self.endpoint.clone();
            tokio::spawn(async move {
                if let Err(err) = Self::handle_connection(stream, endpoint).await {
                    error!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }

    async fn handle_connection(stream: TcpStream, endpoint: Endpoint) -> Result<()> {
        let io = TokioIo::new(stream);

        let service = service_fn(move |req| {
            let endpoint = endpoint.clone();
            async move { handle_request(req, endpoint).await }
        });

        http1::Builder::new()
            .keep_alive(true)
            .serve_connection(io, service)
            .await?;

        Ok(())
    }
}

/// Start a server on an ephemeral localhost port.
///
/// The returned store is shared with the running server so tests can seed
/// or inspect it directly.
#[cfg(any(test, feature = "test-utils"))]
pub async fn spawn_local(
    credentials: Credentials,
) -> Result<(SocketAddr, ObjectStore, tokio::task::JoinHandle<Result<()>>)> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    let store = ObjectStore::new();

    let server = StowageServer::new(store.clone(), credentials);
    let handle = tokio::spawn(server.serve_listener(listener));

    Ok((addr, store, handle))
}
