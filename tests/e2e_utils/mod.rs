#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod origin;
pub mod proxy_server;

pub use origin::{
    closed_port, read_to_end_with_timeout, read_until_contains, CapturedRequest, EchoOrigin, HttpOrigin,
};
pub use proxy_server::TestProxyServer;
