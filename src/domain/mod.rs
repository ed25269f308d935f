pub mod errors;
pub mod models;
pub mod target;

pub use errors::*;
pub use models::*;
