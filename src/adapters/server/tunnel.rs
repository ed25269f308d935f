use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::domain::{
    CloseReason, ConnectionInfo, OutboundTarget, ProxyError, RequestHead, Result, Side, TunnelState, TunnelSummary,
};
use crate::ports::OriginConnector;

pub const CONNECTION_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";
pub const BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\n\r\n";

const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Handles CONNECT requests by relaying opaque bytes to the named origin.
pub struct TunnelHandler {
    connector: Arc<dyn OriginConnector>,
}

impl TunnelHandler {
    pub fn new(connector: Arc<dyn OriginConnector>) -> Self {
        Self { connector }
    }

    /// Runs one tunnel to completion.
    ///
    /// `buffered` holds client bytes that were read past the CONNECT head; they
    /// reach the origin before anything else. The acknowledgement is written
    /// before the origin connect is attempted, so a failed connect can only be
    /// reported by closing the client connection.
    pub async fn handle<C>(
        &self,
        mut client: C,
        head: &RequestHead,
        buffered: Vec<u8>,
        info: &ConnectionInfo,
    ) -> Result<TunnelSummary>
    where
        C: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let target = match OutboundTarget::for_connect(&head.target) {
            Ok(target) => target,
            Err(e) => {
                let _ = client.write_all(BAD_REQUEST).await;
                let _ = client.shutdown().await;
                return Err(e);
            }
        };

        info!("Connection from {} to {}", info.peer, target.authority());

        client.write_all(CONNECTION_ESTABLISHED).await?;
        client.flush().await?;

        let mut tunnel = Tunnel::new(target);
        let mut origin = match self.connector.connect(&tunnel.target).await {
            Ok(origin) => origin,
            Err(e) => {
                error!("Proxy connection error: {}", e);
                tunnel.advance(TunnelState::Closed);
                let _ = client.shutdown().await;
                return Err(e);
            }
        };

        if !buffered.is_empty() {
            if let Err(e) = origin.write_all(&buffered).await {
                error!("Proxy connection error: {}", e);
                tunnel.advance(TunnelState::Closed);
                let _ = client.shutdown().await;
                return Err(ProxyError::TunnelFailed(format!("{}: {}", tunnel.target.authority(), e)));
            }
        }

        tunnel.advance(TunnelState::Relaying);
        let summary = relay(client, origin).await;
        tunnel.advance(TunnelState::Closed);

        match &summary.reason {
            CloseReason::Completed => info!(
                "Connection from {} to {} closed after {:?} (sent={} received={})",
                info.peer,
                tunnel.target.authority(),
                info.opened_at.elapsed(),
                summary.client_to_origin,
                summary.origin_to_client
            ),
            CloseReason::Error { side, message } => warn!(
                "Connection from {} to {} aborted by {} error: {} (sent={} received={})",
                info.peer,
                tunnel.target.authority(),
                side,
                message,
                summary.client_to_origin,
                summary.origin_to_client
            ),
        }

        Ok(summary)
    }
}

struct Tunnel {
    target: OutboundTarget,
    state: TunnelState,
}

impl Tunnel {
    fn new(target: OutboundTarget) -> Self {
        Self {
            target,
            state: TunnelState::AwaitingOriginConnect,
        }
    }

    fn advance(&mut self, next: TunnelState) {
        debug!("Tunnel to {}: {} -> {}", self.target.authority(), self.state, next);
        self.state = next;
    }
}

#[derive(Debug)]
struct RelayError {
    side: Side,
    source: std::io::Error,
    client_to_origin: u64,
    origin_to_client: u64,
}

/// Full-duplex relay between the two ends of a tunnel.
///
/// End-of-stream on one side shuts down the write half of the other, and the
/// relay returns once both directions are done. An error on either side
/// returns immediately. Both streams are owned here and dropped on return, so
/// each connection is closed exactly once.
pub async fn relay<C, O>(client: C, origin: O) -> TunnelSummary
where
    C: AsyncRead + AsyncWrite + Unpin,
    O: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (origin_read, origin_write) = tokio::io::split(origin);

    let upstream = pump(client_read, origin_write, Side::Client);
    let downstream = pump(origin_read, client_write, Side::Origin);

    match tokio::try_join!(upstream, downstream) {
        Ok((client_to_origin, origin_to_client)) => TunnelSummary {
            client_to_origin,
            origin_to_client,
            reason: CloseReason::Completed,
        },
        Err(e) => TunnelSummary {
            client_to_origin: e.client_to_origin,
            origin_to_client: e.origin_to_client,
            reason: CloseReason::Error {
                side: e.side,
                message: e.source.to_string(),
            },
        },
    }
}

async fn pump<R, W>(mut from: R, mut to: W, from_side: Side) -> std::result::Result<u64, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut total = 0u64;

    let fail = |side: Side, source: std::io::Error, total: u64| {
        let (client_to_origin, origin_to_client) = match from_side {
            Side::Client => (total, 0),
            Side::Origin => (0, total),
        };
        RelayError {
            side,
            source,
            client_to_origin,
            origin_to_client,
        }
    };

    loop {
        let n = match from.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => return Err(fail(from_side, e, total)),
        };
        if let Err(e) = to.write_all(&buf[..n]).await {
            return Err(fail(from_side.peer(), e, total));
        }
        if let Err(e) = to.flush().await {
            return Err(fail(from_side.peer(), e, total));
        }
        total += n as u64;
    }

    debug!("{} closed its side of the tunnel after {} bytes", from_side, total);
    if let Err(e) = to.shutdown().await {
        // The peer may already be gone; its own pump reports that.
        debug!("Shutting down {} failed: {}", from_side.peer(), e);
    }
    Ok(total)
}
