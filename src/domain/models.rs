use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Connect,
    Patch,
    Trace,
    Other(String),
}

impl ProxyMethod {
    pub fn as_str(&self) -> &str {
        match self {
            ProxyMethod::Get => "GET",
            ProxyMethod::Post => "POST",
            ProxyMethod::Put => "PUT",
            ProxyMethod::Delete => "DELETE",
            ProxyMethod::Head => "HEAD",
            ProxyMethod::Options => "OPTIONS",
            ProxyMethod::Connect => "CONNECT",
            ProxyMethod::Patch => "PATCH",
            ProxyMethod::Trace => "TRACE",
            ProxyMethod::Other(s) => s.as_str(),
        }
    }

    /// GET and HEAD are forwarded with an empty body, whatever the client sent.
    pub fn forwards_body(&self) -> bool {
        !matches!(self, ProxyMethod::Get | ProxyMethod::Head)
    }
}

impl From<&str> for ProxyMethod {
    // Method tokens are case-sensitive.
    fn from(s: &str) -> Self {
        match s {
            "GET" => ProxyMethod::Get,
            "POST" => ProxyMethod::Post,
            "PUT" => ProxyMethod::Put,
            "DELETE" => ProxyMethod::Delete,
            "HEAD" => ProxyMethod::Head,
            "OPTIONS" => ProxyMethod::Options,
            "CONNECT" => ProxyMethod::Connect,
            "PATCH" => ProxyMethod::Patch,
            "TRACE" => ProxyMethod::Trace,
            other => ProxyMethod::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ProxyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request line and headers of an inbound request, as read off the wire.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: ProxyMethod,
    pub target: String,
    pub version: String,
    /// Header fields in arrival order, duplicates kept.
    pub headers: Vec<(String, String)>,
    /// Every byte consumed while reading the head, terminating blank line included.
    pub raw: Vec<u8>,
}

impl RequestHead {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Where a request goes. Built once per request and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundTarget {
    pub host: String,
    pub port: u16,
    /// Origin-form path (with query), forward mode only.
    pub path: Option<String>,
}

impl OutboundTarget {
    /// `host:port`, with IPv6 literals bracketed.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for OutboundTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.authority(), self.path.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    AwaitingOriginConnect,
    Relaying,
    Closed,
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelState::AwaitingOriginConnect => write!(f, "awaiting-origin-connect"),
            TunnelState::Relaying => write!(f, "relaying"),
            TunnelState::Closed => write!(f, "closed"),
        }
    }
}

/// One end of a tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Origin,
}

impl Side {
    pub fn peer(self) -> Side {
        match self {
            Side::Client => Side::Origin,
            Side::Origin => Side::Client,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => write!(f, "client"),
            Side::Origin => write!(f, "origin"),
        }
    }
}

/// How a tunnel ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Both directions reached end-of-stream.
    Completed,
    /// Transport error on one side; both connections were dropped.
    Error { side: Side, message: String },
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Completed => write!(f, "completed"),
            CloseReason::Error { side, message } => write!(f, "{} error: {}", side, message),
        }
    }
}

/// Byte counts of a finished tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSummary {
    pub client_to_origin: u64,
    pub origin_to_client: u64,
    pub reason: CloseReason,
}

#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub id: uuid::Uuid,
    pub peer: SocketAddr,
    pub opened_at: Instant,
}

impl ConnectionInfo {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            peer,
            opened_at: Instant::now(),
        }
    }
}
