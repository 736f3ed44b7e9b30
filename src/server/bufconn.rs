//! In-memory listener: connections are `tokio::io::duplex` pairs handed to the
//! accept loop over a channel. No socket is ever opened.

use super::connection::serve_connection;
use super::service::ImmuService;
use super::ServerOptions;
use crate::client::{Connection, Dialer};
use crate::error::ServerError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bytes buffered in each direction of a connection.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

const ACCEPT_BACKLOG: usize = 64;

type Listener = Arc<Mutex<Option<mpsc::Sender<DuplexStream>>>>;

fn refused() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionRefused, "bufconn server is not running")
}

/// Dialer that connects to a `BufconnServer`. The address is ignored.
#[derive(Clone)]
pub struct BufconnDialer {
    listener: Listener,
    buffer_size: usize,
}

#[async_trait]
impl Dialer for BufconnDialer {
    async fn dial(&self, address: &str) -> io::Result<Box<dyn Connection>> {
        let sender = self.listener.lock().clone().ok_or_else(refused)?;
        let (client, server) = tokio::io::duplex(self.buffer_size);
        sender.send(server).await.map_err(|_| refused())?;
        debug!(address, "Bufconn connection established");
        Ok(Box::new(client))
    }
}

/// Server bound to an in-process listener.
///
/// Dialers handed out by [`BufconnServer::dialer`] stay valid across
/// restarts; while the server is stopped they fail with `ConnectionRefused`.
pub struct BufconnServer {
    options: ServerOptions,
    listener: Listener,
    service: Mutex<Option<Arc<ImmuService>>>,
    buffer_size: usize,
}

impl BufconnServer {
    pub fn new(options: ServerOptions) -> Self {
        Self {
            options,
            listener: Arc::new(Mutex::new(None)),
            service: Mutex::new(None),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Open the store and spawn the accept loop on the current runtime.
    ///
    /// Returns once the server accepts connections. Starting a running server
    /// is a no-op.
    pub fn start(&self) -> Result<(), ServerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ServerError::NoRuntime)?;
        let mut listener = self.listener.lock();
        if listener.is_some() {
            return Ok(());
        }

        let service = Arc::new(ImmuService::new(self.options.clone())?);
        let (tx, mut rx) = mpsc::channel::<DuplexStream>(ACCEPT_BACKLOG);
        let accept_service = Arc::clone(&service);
        runtime.spawn(async move {
            while let Some(stream) = rx.recv().await {
                let service = Arc::clone(&accept_service);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, service).await {
                        warn!(error = %e, "Bufconn connection ended with error");
                    }
                });
            }
            debug!("Bufconn accept loop finished");
        });

        *listener = Some(tx);
        *self.service.lock() = Some(service);
        info!(
            auth = self.options.auth,
            in_memory = self.options.in_memory,
            "Bufconn server started"
        );
        Ok(())
    }

    /// Stop accepting connections. Connections already open keep being served
    /// until their client closes them.
    pub fn stop(&self) {
        if self.listener.lock().take().is_some() {
            info!("Bufconn server stopped");
        }
        if let Some(service) = self.service.lock().take() {
            if let Err(e) = service.store().flush() {
                warn!(error = %e, "Failed to flush store on stop");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Dialer usable as a client's custom transport.
    pub fn dialer(&self) -> Arc<dyn Dialer> {
        Arc::new(BufconnDialer {
            listener: Arc::clone(&self.listener),
            buffer_size: self.buffer_size,
        })
    }

    /// Service of the running server, for inspecting state directly.
    pub fn service(&self) -> Result<Arc<ImmuService>, ServerError> {
        self.service.lock().clone().ok_or(ServerError::NotRunning)
    }
}

impl Drop for BufconnServer {
    fn drop(&mut self) {
        self.stop();
    }
}
