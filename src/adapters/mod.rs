pub mod server;
pub mod tcp;

pub use server::{ForwardHandler, ProxyServer, TunnelHandler};
pub use tcp::DirectConnector;
