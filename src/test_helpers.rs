//! Shared test helpers for transfer failure scenarios.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve a single response that promises `declared_len` bytes but sends only
/// `body` before closing the connection.
///
/// Returns the address to request; any path is accepted.
pub(crate) async fn serve_truncated(declared_len: usize, body: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        // Consume the request head before answering
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {declared_len}\r\nConnection: close\r\n\r\n"
        );
        socket.write_all(head.as_bytes()).await.ok();
        socket.write_all(body).await.ok();
        socket.flush().await.ok();
        socket.shutdown().await.ok();
    });

    addr
}
