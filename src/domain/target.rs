use url::{Host, Url};

use super::{OutboundTarget, ProxyError, Result};

pub const DEFAULT_HTTP_PORT: u16 = 80;

impl OutboundTarget {
    /// Target of a plain HTTP request. `target` is either absolute
    /// (`http://host[:port]/path`) or a path resolved against the `Host` header.
    pub fn for_forward(target: &str, host_header: Option<&str>) -> Result<Self> {
        let url = if target.starts_with('/') {
            let host = host_header.ok_or(ProxyError::MissingHost)?;
            Url::parse(&format!("http://{}{}", host.trim(), target))
        } else {
            Url::parse(target)
        }
        .map_err(|e| ProxyError::InvalidTarget(format!("{}: {}", target, e)))?;

        if url.scheme() != "http" {
            return Err(ProxyError::InvalidTarget(format!(
                "unsupported scheme {} in {}",
                url.scheme(),
                target
            )));
        }

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            host: host_of(&url)?,
            port: url.port_or_known_default().unwrap_or(DEFAULT_HTTP_PORT),
            path: Some(path),
        })
    }

    /// Target of a CONNECT request: `host[:port]`, port 80 when absent.
    pub fn for_connect(authority: &str) -> Result<Self> {
        let invalid = |reason: &str| ProxyError::InvalidTarget(format!("{}: {}", authority, reason));

        if authority.is_empty() || authority.contains('/') {
            return Err(invalid("expected host[:port]"));
        }
        let url = Url::parse(&format!("http://{}", authority)).map_err(|e| invalid(&e.to_string()))?;
        if !url.username().is_empty() || url.password().is_some() || url.query().is_some() || url.fragment().is_some()
        {
            return Err(invalid("expected host[:port]"));
        }

        Ok(Self {
            host: host_of(&url)?,
            port: url.port().unwrap_or(DEFAULT_HTTP_PORT),
            path: None,
        })
    }
}

fn host_of(url: &Url) -> Result<String> {
    match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => Ok(domain.to_string()),
        Some(Host::Ipv4(addr)) => Ok(addr.to_string()),
        Some(Host::Ipv6(addr)) => Ok(addr.to_string()),
        _ => Err(ProxyError::MissingHost),
    }
}
