use std::net::SocketAddr;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_HEAD_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Single listening address for both plain HTTP and CONNECT traffic.
    pub bind: SocketAddr,
    /// Upper bound on request line plus headers.
    pub max_head_size: usize,
}

impl ProxyConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
        }
    }

    pub fn with_max_head_size(mut self, max_head_size: usize) -> Self {
        self.max_head_size = max_head_size;
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8000)))
    }
}
