use crate::domain::{OutboundTarget, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Raw bidirectional byte stream to an origin.
pub trait OriginStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> OriginStream for T {}

pub type BoxedStream = Box<dyn OriginStream>;

/// Port for opening outbound connections
#[async_trait]
pub trait OriginConnector: Send + Sync {
    /// Open a new connection to the target.
    ///
    /// Exactly one attempt is made; connections are never pooled or reused.
    async fn connect(&self, target: &OutboundTarget) -> Result<BoxedStream>;
}
