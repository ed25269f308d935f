use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use crate::domain::{OutboundTarget, ProxyError, Result};
use crate::ports::{BoxedStream, OriginConnector};

/// Connects straight to the origin over TCP.
#[derive(Debug, Clone, Default)]
pub struct DirectConnector;

impl DirectConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OriginConnector for DirectConnector {
    async fn connect(&self, target: &OutboundTarget) -> Result<BoxedStream> {
        let stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|e| ProxyError::ConnectionFailed(format!("{}: {}", target.authority(), e)))?;
        stream.set_nodelay(true)?;

        debug!("Connected to {} ({:?})", target.authority(), stream.peer_addr().ok());
        Ok(Box::new(stream))
    }
}
