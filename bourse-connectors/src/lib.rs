//! Bourse Exchange Connectors
//!
//! Adapters for exchange APIs (REST).
//! Normalizes exchange responses into `bourse_exec::Envelope`.

#![warn(clippy::all)]

// Public modules
pub mod http_transport;

// Re-exports
pub use http_transport::{HttpTransport, TransportError, DEFAULT_API_URL, REQUEST_TIMEOUT_SECS};
