use super::service::ImmuService;
use crate::protocol::{Request, Response};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Longest request line accepted, newline included.
pub const MAX_REQUEST_LINE: u64 = 1024 * 1024;

/// Serve one client until it closes the stream.
///
/// A request line longer than `MAX_REQUEST_LINE` gets a parse error and the
/// connection is closed.
pub async fn serve_connection<S>(stream: S, service: Arc<ImmuService>) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = (&mut reader)
            .take(MAX_REQUEST_LINE)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            debug!("Client closed connection");
            return Ok(());
        }
        if line.last() != Some(&b'\n') && read as u64 >= MAX_REQUEST_LINE {
            warn!(limit = MAX_REQUEST_LINE, "Request line too long, closing connection");
            let response = ImmuService::parse_error(format!(
                "request line exceeds {} bytes",
                MAX_REQUEST_LINE
            ));
            write_response(reader.get_mut(), &response).await?;
            return Ok(());
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let response = match serde_json::from_slice::<Request>(&line) {
            Ok(request) => service.handle(request),
            Err(e) => {
                warn!(error = %e, "Malformed request line");
                ImmuService::parse_error(format!("parse error: {}", e))
            }
        };
        write_response(reader.get_mut(), &response).await?;
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = serde_json::to_vec(response)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    out.push(b'\n');
    writer.write_all(&out).await?;
    writer.flush().await
}

/// Accept TCP clients until `shutdown` fires.
pub async fn serve_tcp(
    listener: TcpListener,
    service: Arc<ImmuService>,
    mut shutdown: oneshot::Receiver<()>,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("TCP server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                debug!(peer = %peer, "Accepted TCP client");
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(socket, service).await {
                        warn!(peer = %peer, error = %e, "Connection ended with error");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ImmuClient, Options, RemoteClient};
    use crate::error::codes;
    use crate::server::ServerOptions;

    fn service() -> Arc<ImmuService> {
        Arc::new(
            ImmuService::new(ServerOptions::default().with_auth(false).with_in_memory_store(true))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_malformed_line_gets_parse_error() {
        let (client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(serve_connection(server, service()));

        let (mut read_half, mut write_half) = tokio::io::split(client);
        write_half.write_all(b"not json\n").await.unwrap();
        write_half.shutdown().await.unwrap();

        let mut out = String::new();
        read_half.read_to_string(&mut out).await.unwrap();
        let response: crate::protocol::Response = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(response.error.unwrap().code, codes::PARSE_ERROR);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_line_is_rejected_and_closed() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(serve_connection(server, service()));

        let (mut read_half, mut write_half) = tokio::io::split(client);
        let writer = tokio::spawn(async move {
            let chunk = vec![b'a'; 64 * 1024];
            let mut sent = 0u64;
            while sent <= MAX_REQUEST_LINE {
                if write_half.write_all(&chunk).await.is_err() {
                    break;
                }
                sent += chunk.len() as u64;
            }
        });

        let mut out = String::new();
        read_half.read_to_string(&mut out).await.unwrap();
        let response: Response = serde_json::from_str(out.trim()).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, codes::PARSE_ERROR);
        assert!(error.message.contains("exceeds"));
        task.await.unwrap().unwrap();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_server_serves_remote_client() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(serve_tcp(listener, service(), rx));

        let options = Options::default()
            .with_address(addr.ip().to_string())
            .with_port(addr.port());
        let client = RemoteClient::new(options);
        let index = client.set(b"k", b"v").await.unwrap();
        assert_eq!(client.get(b"k").await.unwrap().index, index.index);
        client.disconnect().await.unwrap();

        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }
}
