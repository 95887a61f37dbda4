//! Validated value types.

mod endpoint;

pub use endpoint::Endpoint;
