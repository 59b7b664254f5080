// tikfleet-api: Async Rust client for the RouterOS v7 REST API

pub mod error;
pub mod record;
pub mod rest;
pub mod transport;

pub use error::Error;
pub use record::Record;
pub use rest::RestClient;
pub use transport::{TlsMode, TransportConfig};
