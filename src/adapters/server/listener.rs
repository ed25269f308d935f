use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::forward::ForwardHandler;
use super::head::read_request_head;
use super::prefixed::PrefixedStream;
use super::tunnel::{TunnelHandler, BAD_REQUEST};
use crate::config::ProxyConfig;
use crate::domain::{ConnectionInfo, ProxyMethod, Result};
use crate::ports::OriginConnector;

/// Accepts connections on one port and hands each one to the forward or the
/// tunnel handler, depending on the method of its first request.
pub struct ProxyServer {
    config: ProxyConfig,
    forward: Arc<ForwardHandler>,
    tunnel: Arc<TunnelHandler>,
}

impl ProxyServer {
    pub fn new(config: ProxyConfig, connector: Arc<dyn OriginConnector>) -> Self {
        Self {
            config,
            forward: Arc::new(ForwardHandler::new(connector.clone())),
            tunnel: Arc::new(TunnelHandler::new(connector)),
        }
    }

    /// Accept loop, runs for the life of the process. Errors on individual
    /// connections stay inside their task.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let server = self.clone();
            let info = ConnectionInfo::new(peer);
            let span = info_span!("conn", id = %info.id, peer = %peer);
            tokio::spawn(
                async move {
                    if let Err(e) = server.dispatch(stream, info).await {
                        error!("{}", e);
                    }
                }
                .instrument(span),
            );
        }
    }

    async fn dispatch(&self, stream: TcpStream, info: ConnectionInfo) -> Result<()> {
        let mut reader = BufReader::new(stream);

        let head = match read_request_head(&mut reader, self.config.max_head_size).await {
            Ok(Some(head)) => head,
            Ok(None) => {
                debug!("Connection from {} closed before sending a request", info.peer);
                return Ok(());
            }
            Err(e) => {
                let mut stream = reader.into_inner();
                if e.is_client_error() {
                    let _ = stream.write_all(BAD_REQUEST).await;
                }
                let _ = stream.shutdown().await;
                return Err(e);
            }
        };

        if head.method == ProxyMethod::Connect {
            info!("Request received (HTTPS) from {}", info.peer);
            let buffered = reader.buffer().to_vec();
            let client = reader.into_inner();
            self.tunnel.handle(client, &head, buffered, &info).await?;
        } else {
            info!("Request received (HTTP) from {}: {} {}", info.peer, head.method, head.target);
            let mut replay = head.raw;
            replay.extend_from_slice(reader.buffer());
            let client = PrefixedStream::new(replay, reader.into_inner());
            self.forward.clone().serve(client, info).await?;
        }
        Ok(())
    }
}

/// Binds the listening socket described by `config`.
pub async fn bind(config: &ProxyConfig) -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;
    Ok((listener, addr))
}
