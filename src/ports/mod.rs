pub mod connector;

pub use connector::{BoxedStream, OriginConnector, OriginStream};
