use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::errors::{Result, UploadError};

/// Listens on localhost for the OAuth redirect carrying the authorization
/// code.
///
/// One producer (the accept loop) races one consumer (the waiter) against a
/// wall-clock deadline. The first request carrying a `code` query parameter
/// wins; deadline expiry aborts with [`UploadError::AuthTimeout`].
pub struct CodeListener {
    listener: TcpListener,
}

impl CodeListener {
    /// Bind the listener on `127.0.0.1:port`. Port 0 picks an ephemeral
    /// port, readable via [`CodeListener::local_port`].
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|e| {
            UploadError::Config(format!(
                "failed to bind callback listener on port {}: {}",
                port, e
            ))
        })?;
        Ok(CodeListener { listener })
    }

    /// The port the listener actually bound.
    pub fn local_port(&self) -> Result<u16> {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .map_err(|e| UploadError::Config(format!("failed to read listener address: {}", e)))
    }

    /// Wait for one authorization code, up to `deadline`.
    pub async fn wait_for_code(self, deadline: Duration) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let producer = tokio::spawn(Self::accept_code(self.listener, tx));

        let outcome = timeout(deadline, rx).await;
        producer.abort();

        match outcome {
            Ok(Ok(code)) => Ok(code),
            // Producer dropped without delivering, or the deadline expired.
            Ok(Err(_)) | Err(_) => Err(UploadError::AuthTimeout),
        }
    }

    /// Accept connections until one request carries a code, then hand it to
    /// the waiter and stop.
    async fn accept_code(listener: TcpListener, reply: oneshot::Sender<String>) {
        loop {
            let (mut stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Callback listener accept failed: {}", e);
                    return;
                }
            };
            debug!("Callback connection from {}", peer);

            if let Some(code) = Self::handle_request(&mut stream).await {
                let _ = reply.send(code);
                return;
            }
        }
    }

    /// Answer a single HTTP request, returning the authorization code when
    /// the request carried one.
    async fn handle_request(stream: &mut TcpStream) -> Option<String> {
        let mut buf = vec![0u8; 4096];
        let n = stream.read(&mut buf).await.ok()?;
        let request = String::from_utf8_lossy(&buf[..n]);
        let code = extract_code(&request);

        let (status, body) = match &code {
            Some(_) => ("200 OK", "<h1>Access token received</h1>"),
            None => ("404 Not Found", "<h1>No authorization code in request</h1>"),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;

        code
    }
}

/// Pull the `code` query parameter out of a raw HTTP request.
fn extract_code(request: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if method != "GET" {
        return None;
    }

    let url = reqwest::Url::parse(&format!("http://localhost{}", target)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}
