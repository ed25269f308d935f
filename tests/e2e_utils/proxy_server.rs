#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use dualproxy::adapters::server::bind;
use dualproxy::adapters::{DirectConnector, ProxyServer};
use dualproxy::config::ProxyConfig;

pub struct TestProxyServer {
    addr: SocketAddr,
    server_handle: JoinHandle<()>,
}

impl TestProxyServer {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        Self::start_with(ProxyConfig::new("127.0.0.1:0".parse()?)).await
    }

    pub async fn start_with(config: ProxyConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (listener, addr) = bind(&config).await?;
        let server = Arc::new(ProxyServer::new(config, Arc::new(DirectConnector::new())));

        let server_handle = tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });

        Ok(Self { addr, server_handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestProxyServer {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}
