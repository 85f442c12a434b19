//! Execution layer port definitions.
//!
//! Ports define the interface to the exchange transport. Adapters implement
//! them for a concrete API (`HttpTransport` in `bourse-connectors`,
//! `StubTransport` for tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// =============================================================================
// Exchange Transport Port
// =============================================================================

/// Request parameters, in the order they should be sent.
pub type Params = [(&'static str, String)];

/// Port for authenticated exchange calls.
///
/// The transport owns the wire format and request signing. Every failure,
/// including network errors, comes back as an unsuccessful [`Envelope`] so the
/// validator can classify it.
///
/// Implementations:
/// - `StubTransport` - In-memory exchange for testing
/// - `HttpTransport` - REST over HTTPS
#[async_trait]
pub trait ExchangeTransport: Send + Sync {
    /// Perform one call and return the normalized response.
    async fn call(&self, endpoint: Endpoint, params: &Params) -> Envelope;

    /// Whether the transport holds credentials for private endpoints.
    fn is_authenticated(&self) -> bool;
}

/// Exchange operations the client knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    BuyLimit,
    SellLimit,
    Cancel,
    GetOrder,
    OpenOrders,
    OrderHistory,
    Balances,
    Balance,
    LatestTick,
    Candles,
}

impl Endpoint {
    /// Relative path of the endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::BuyLimit => "/market/tradebuy",
            Endpoint::SellLimit => "/market/tradesell",
            Endpoint::Cancel => "/market/cancel",
            Endpoint::GetOrder => "/key/orders/getorder",
            Endpoint::OpenOrders => "/market/getopenorders",
            Endpoint::OrderHistory => "/key/orders/getorderhistory",
            Endpoint::Balances => "/key/balance/getbalances",
            Endpoint::Balance => "/key/balance/getbalance",
            Endpoint::LatestTick => "/pub/market/getlatesttick",
            Endpoint::Candles => "/pub/market/getticks",
        }
    }

    /// Whether the endpoint needs credentials.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Endpoint::LatestTick | Endpoint::Candles)
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::BuyLimit => "buy_limit",
            Endpoint::SellLimit => "sell_limit",
            Endpoint::Cancel => "cancel",
            Endpoint::GetOrder => "get_order",
            Endpoint::OpenOrders => "open_orders",
            Endpoint::OrderHistory => "order_history",
            Endpoint::Balances => "balances",
            Endpoint::Balance => "balance",
            Endpoint::LatestTick => "latest_tick",
            Endpoint::Candles => "candles",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Response Envelope
// =============================================================================

/// Normalized exchange response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether the exchange accepted the call
    pub success: bool,
    /// Payload of a successful call
    #[serde(default)]
    pub result: Option<Value>,
    /// Failure description
    #[serde(default)]
    pub message: Option<String>,
    /// Failure code, when distinct from the message
    #[serde(default)]
    pub code: Option<String>,
}

impl Envelope {
    /// Successful response carrying `result`.
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            ..Self::default()
        }
    }

    /// Successful response without payload.
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Failed response with a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

// =============================================================================
// Account & Market Data Types
// =============================================================================

/// Holdings of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Asset symbol (e.g., "ETH")
    pub currency: String,
    /// Total amount held
    pub balance: Decimal,
    /// Amount not reserved by open orders
    pub available: Decimal,
    /// Amount awaiting deposit confirmation
    #[serde(default)]
    pub pending: Decimal,
}

impl Balance {
    /// Whether anything is held.
    pub fn is_empty(&self) -> bool {
        self.balance <= Decimal::ZERO
    }
}

/// One OHLCV candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub opened_at: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Candle width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    OneMin,
    FiveMin,
    ThirtyMin,
    Hour,
    Day,
}

impl CandleInterval {
    /// Exchange name of the interval.
    pub fn as_str(&self) -> &'static str {
        match self {
            CandleInterval::OneMin => "oneMin",
            CandleInterval::FiveMin => "fiveMin",
            CandleInterval::ThirtyMin => "thirtyMin",
            CandleInterval::Hour => "hour",
            CandleInterval::Day => "day",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_deserialization_defaults() {
        let envelope: Envelope = serde_json::from_str(r#"{"success": false}"#).unwrap();

        assert!(!envelope.success);
        assert!(envelope.result.is_none());
        assert!(envelope.message.is_none());
        assert!(envelope.code.is_none());
    }

    #[test]
    fn test_envelope_constructors() {
        let ok = Envelope::ok(serde_json::json!({"order_id": "x"}));
        assert!(ok.success);
        assert!(ok.result.is_some());

        let failure = Envelope::failure("NO_API_RESPONSE");
        assert!(!failure.success);
        assert_eq!(failure.message.as_deref(), Some("NO_API_RESPONSE"));
    }

    #[test]
    fn test_public_endpoints() {
        assert!(!Endpoint::LatestTick.requires_auth());
        assert!(!Endpoint::Candles.requires_auth());
        assert!(Endpoint::SellLimit.requires_auth());
        assert!(Endpoint::Cancel.requires_auth());
    }

    #[test]
    fn test_balance_serialization() {
        let json = r#"{"currency": "ETH", "balance": "2.5", "available": "1.0"}"#;
        let balance: Balance = serde_json::from_str(json).unwrap();

        assert_eq!(balance.balance, dec!(2.5));
        assert_eq!(balance.pending, Decimal::ZERO);
        assert!(!balance.is_empty());
    }

    #[test]
    fn test_candle_serialization() {
        let candle = Candle {
            opened_at: Utc::now(),
            open: dec!(0.05),
            high: dec!(0.06),
            low: dec!(0.04),
            close: dec!(0.055),
            volume: dec!(120),
        };

        let json = serde_json::to_string(&candle).unwrap();
        let parsed: Candle = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.close, dec!(0.055));
    }
}
