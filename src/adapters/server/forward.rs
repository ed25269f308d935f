use std::convert::Infallible;
use std::sync::Arc;

use http_body_util::{combinators::BoxBody, BodyExt, Empty};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderValue, CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

use crate::domain::{ConnectionInfo, OutboundTarget, ProxyError, ProxyMethod, Result};
use crate::ports::OriginConnector;

type Body = BoxBody<Bytes, hyper::Error>;
type ClientBuilder = hyper::client::conn::http1::Builder;
type ServerBuilder = hyper::server::conn::http1::Builder;

/// Handles plain HTTP requests by reissuing them to the origin.
pub struct ForwardHandler {
    connector: Arc<dyn OriginConnector>,
}

impl ForwardHandler {
    pub fn new(connector: Arc<dyn OriginConnector>) -> Self {
        Self { connector }
    }

    /// Serves a single request on `stream`, then closes it.
    pub async fn serve<S>(self: Arc<Self>, stream: S, info: ConnectionInfo) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let service = service_fn(move |req| {
            let handler = self.clone();
            let info = info.clone();
            async move { Ok::<_, Infallible>(handler.handle(req, &info).await) }
        });

        ServerBuilder::new()
            .preserve_header_case(true)
            .title_case_headers(true)
            .keep_alive(false)
            .serve_connection(TokioIo::new(stream), service)
            .await
            .map_err(|e| ProxyError::ConnectionFailed(format!("client connection: {}", e)))
    }

    pub async fn handle(&self, req: Request<Incoming>, info: &ConnectionInfo) -> Response<Body> {
        self.forward(req, info).await.unwrap_or_else(|e| {
            error!("Proxy error: {}", e);
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };
            error_response(status)
        })
    }

    async fn forward(&self, req: Request<Incoming>, info: &ConnectionInfo) -> Result<Response<Body>> {
        let (mut parts, incoming) = req.into_parts();

        let host_header = parts.headers.get(HOST).and_then(|value| value.to_str().ok());
        let target = OutboundTarget::for_forward(&parts.uri.to_string(), host_header)?;
        info!("Connection from {} to {}", info.peer, parts.uri);

        let stream = self.connector.connect(&target).await?;
        let (mut sender, conn) = ClientBuilder::new()
            .preserve_header_case(true)
            .title_case_headers(true)
            .handshake(TokioIo::new(stream))
            .await
            .map_err(|e| ProxyError::ConnectionFailed(format!("{}: {}", target.authority(), e)))?;
        let authority = target.authority();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!("Origin connection to {} failed: {}", authority, e);
            }
        });

        parts.uri = target
            .path
            .as_deref()
            .unwrap_or("/")
            .parse::<Uri>()
            .map_err(|e| ProxyError::InvalidTarget(e.to_string()))?;
        if !parts.headers.contains_key(HOST) {
            let host = HeaderValue::from_str(&target.authority())
                .map_err(|_| ProxyError::InvalidTarget(target.authority()))?;
            parts.headers.insert(HOST, host);
        }

        let method = ProxyMethod::from(parts.method.as_str());
        let body = if method.forwards_body() {
            incoming.boxed()
        } else {
            // The client body is never read; framing headers would announce bytes that never come.
            parts.headers.remove(CONTENT_LENGTH);
            parts.headers.remove(TRANSFER_ENCODING);
            empty()
        };

        let response = sender
            .send_request(Request::from_parts(parts, body))
            .await
            .map_err(|e| ProxyError::ConnectionFailed(format!("{}: {}", target.authority(), e)))?;

        Ok(response.map(|body| body.boxed()))
    }
}

fn empty() -> Body {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

fn error_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
