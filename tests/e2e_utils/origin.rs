#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What an origin saw of one request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Minimal HTTP/1.1 origin that records each request and answers with a fixed body.
pub struct HttpOrigin {
    addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<CapturedRequest>,
    handle: JoinHandle<()>,
}

impl HttpOrigin {
    pub async fn start(response_body: &'static str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, requests) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Ok(request) = Self::handle_connection(socket, response_body).await {
                        let _ = tx.send(request);
                    }
                });
            }
        });

        Ok(Self { addr, requests, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn next_request(&mut self) -> CapturedRequest {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("Origin should receive a request within timeout")
            .expect("Origin channel closed")
    }

    async fn handle_connection(socket: TcpStream, response_body: &str) -> std::io::Result<CapturedRequest> {
        let mut reader = BufReader::new(socket);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;
        let request_line = request_line.trim_end().to_string();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.to_string(), value.trim().to_string()));
            }
        }

        let content_length = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.parse::<usize>().ok())
            .unwrap_or(0);
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).await?;

        let mut socket = reader.into_inner();
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Origin: test\r\nConnection: close\r\n\r\n",
            response_body.len()
        );
        if !request_line.starts_with("HEAD ") {
            response.push_str(response_body);
        }
        socket.write_all(response.as_bytes()).await?;
        socket.shutdown().await?;

        Ok(CapturedRequest {
            request_line,
            headers,
            body,
        })
    }
}

impl Drop for HttpOrigin {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Raw TCP origin that echoes every byte back.
pub struct EchoOrigin {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl EchoOrigin {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (mut read, mut write) = socket.split();
                    let _ = tokio::io::copy(&mut read, &mut write).await;
                    let _ = write.shutdown().await;
                });
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for EchoOrigin {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind throwaway listener");
    listener.local_addr().expect("Failed to read throwaway address").port()
}

pub async fn read_to_end_with_timeout(stream: &mut TcpStream) -> Vec<u8> {
    let mut data = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut data))
        .await
        .expect("Peer should close within timeout")
        .expect("Should be able to read until EOF");
    data
}

/// Reads until `needle` has been seen, without waiting for EOF.
pub async fn read_until_contains(stream: &mut TcpStream, needle: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    tokio::time::timeout(Duration::from_secs(5), async {
        while !data.windows(needle.len()).any(|window| window == needle) {
            let n = stream.read(&mut buf).await.expect("Should be able to read");
            assert!(n > 0, "peer closed before sending {:?}", String::from_utf8_lossy(needle));
            data.extend_from_slice(&buf[..n]);
        }
    })
    .await
    .expect("Expected bytes should arrive within timeout");
    data
}
