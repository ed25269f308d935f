use std::fmt;

#[derive(Debug)]
pub enum ProxyError {
    InvalidTarget(String),
    MissingHost,
    InvalidRequest(String),
    HeadTooLarge(usize),
    ConnectionFailed(String),
    TunnelFailed(String),
    Io(std::io::Error),
}

impl ProxyError {
    /// Whether the client sent something we cannot act on, as opposed to the
    /// origin side failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProxyError::InvalidTarget(_)
                | ProxyError::MissingHost
                | ProxyError::InvalidRequest(_)
                | ProxyError::HeadTooLarge(_)
        )
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::InvalidTarget(msg) => write!(f, "Invalid request target: {}", msg),
            ProxyError::MissingHost => write!(f, "Missing host in request"),
            ProxyError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProxyError::HeadTooLarge(limit) => write!(f, "Request head exceeds {} bytes", limit),
            ProxyError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            ProxyError::TunnelFailed(msg) => write!(f, "Tunnel failed: {}", msg),
            ProxyError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
