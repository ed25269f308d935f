mod connector;

pub use connector::DirectConnector;
