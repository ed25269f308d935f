mod forward;
mod head;
mod listener;
mod prefixed;
mod tunnel;

pub use forward::ForwardHandler;
pub use head::read_request_head;
pub use listener::{bind, ProxyServer};
pub use prefixed::PrefixedStream;
pub use tunnel::{relay, TunnelHandler, BAD_REQUEST, CONNECTION_ESTABLISHED};
