//! Bourse Execution Layer
//!
//! Order placement, cancellation and replacement against an exchange API,
//! with transient failures retried under exponential backoff.
//!
//! # Architecture
//!
//! ```text
//! OrderReplacer → ExchangeClient → RetryPolicy(ResponseValidator(Transport))
//! ```
//!
//! # Components
//!
//! - **Ports**: `ExchangeTransport` trait and the normalized response envelope
//! - **Validator**: Classifies failed responses as retryable or fatal
//! - **Retry**: Exponential backoff, capped, optionally bounded in attempts
//! - **Client**: Orders, balances and market data over a transport
//! - **Replacer**: Cancel-before-place protocol, one resting order per market
//! - **Stub**: In-memory exchange for tests
//!
//! # Example
//!
//! ```rust,ignore
//! use bourse_exec::{ExchangeClient, MarketOrderSlot, StubTransport};
//! use std::sync::Arc;
//!
//! let client = ExchangeClient::new(Arc::new(StubTransport::new()));
//! let mut slot = MarketOrderSlot::new(market.clone());
//!
//! slot.adopt_open_order(&client).await?;
//! slot.replace(&client, || async {
//!     client.place_limit_order(&market, OrderSide::Sell, quantity, price).await.map(Some)
//! })
//! .await?;
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod ports;
pub mod replacer;
pub mod retry;
pub mod stub;
pub mod validator;

// Re-exports for convenience
pub use client::{CancelPollConfig, ExchangeClient};
pub use error::{ExecError, ExecResult, ORDER_NOT_OPEN};
pub use ports::{Balance, Candle, CandleInterval, Endpoint, Envelope, ExchangeTransport, Params};
pub use replacer::{replace_order, MarketOrderSlot};
pub use retry::RetryPolicy;
pub use stub::StubTransport;
pub use validator::{
    ResponseValidator, TransientClassifier, TransientCodes, DEFAULT_TRANSIENT_CODES,
};
