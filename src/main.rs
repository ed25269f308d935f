use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dualproxy::adapters::server::bind;
use dualproxy::adapters::{DirectConnector, ProxyServer};
use dualproxy::config::{ProxyConfig, DEFAULT_BIND, DEFAULT_MAX_HEAD_SIZE};

#[derive(Parser, Debug)]
#[command(version = env!("DUALPROXY_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
pub struct Opts {
    /// listen on this network address (plain HTTP and CONNECT share the port)
    #[arg(long, short = 'b', default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// largest accepted request line plus headers, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_HEAD_SIZE)]
    max_head_size: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let opts = Opts::parse();

    match rlimit::increase_nofile_limit(u64::MAX) {
        Ok(limit) => info!("Open file limit set to {}", limit),
        Err(e) => warn!("Failed to raise open file limit: {}", e),
    }

    let config = ProxyConfig::new(opts.bind).with_max_head_size(opts.max_head_size);
    let (listener, addr) = bind(&config).await?;
    info!("Starting HTTP proxy server on {} (version {})", addr, env!("DUALPROXY_VERSION"));

    let server = Arc::new(ProxyServer::new(config, Arc::new(DirectConnector::new())));
    server.serve(listener).await?;

    Ok(())
}
