//! Minimal HTTP endpoint serving a fixed metrics document.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const METRICS_PATH: &str = "/metrics";
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Serves `payload` on `GET /metrics` until shut down or dropped.
pub struct MetricsStub {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MetricsStub {
    /// Bind `addr` and return once the server task is running.
    pub async fn start(addr: impl ToSocketAddrs, payload: Vec<u8>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        let app = build_router(Bytes::from(payload));
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = ready_tx.send(());
            if let Err(e) = server.await {
                warn!(error = %e, "Metrics stub server failed");
            }
            debug!("Metrics stub stopped");
        });

        ready_rx
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "metrics stub exited before ready"))?;
        debug!(addr = %local_addr, "Metrics stub listening");

        Ok(Self {
            local_addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `http://<addr>/metrics`
    pub fn url(&self) -> String {
        format!("http://{}{}", self.local_addr, METRICS_PATH)
    }

    /// Stop accepting connections and release the port.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for MetricsStub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// Unrouted paths fall through to axum's default 404.
fn build_router(payload: Bytes) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(payload)
}

async fn metrics_handler(State(payload): State<Bytes>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn raw_request(addr: SocketAddr, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[tokio::test]
    async fn test_serves_payload_with_headers() {
        let stub = MetricsStub::start("127.0.0.1:0", b"up 1\n".to_vec()).await.unwrap();
        let response = reqwest::get(stub.url()).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response.headers().get("content-type").unwrap().to_str().unwrap(),
            CONTENT_TYPE
        );
        assert_eq!(response.text().await.unwrap(), "up 1\n");
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let stub = MetricsStub::start("127.0.0.1:0", b"up 1\n".to_vec()).await.unwrap();
        let url = format!("http://{}/", stub.local_addr());
        let response = reqwest::get(url).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_non_utf8_header_value_is_served() {
        let stub = MetricsStub::start("127.0.0.1:0", b"up 1\n".to_vec()).await.unwrap();
        let response = raw_request(
            stub.local_addr(),
            b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nX-Name: caf\xe9\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"), "response: {response:?}");
        assert!(response.ends_with("up 1\n"));
    }

    #[tokio::test]
    async fn test_shutdown_releases_port() {
        let mut stub = MetricsStub::start("127.0.0.1:0", Vec::new()).await.unwrap();
        let addr = stub.local_addr();
        stub.shutdown();
        tokio::task::yield_now().await;

        // Rebinding the same address only works once the listener is gone.
        let mut rebound = None;
        for _ in 0..50 {
            if let Ok(listener) = TcpListener::bind(addr).await {
                rebound = Some(listener);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(rebound.is_some());
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let held = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = held.local_addr().unwrap();
        assert!(MetricsStub::start(addr, Vec::new()).await.is_err());
    }
}
