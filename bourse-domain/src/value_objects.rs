//! Value Objects for the Bourse Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places kept when rendering a price.
const PRICE_DECIMALS: u32 = 8;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Market must be a `BASE-QUOTE` pair
    #[error("Invalid market: {0}")]
    InvalidMarket(String),

    /// Order data is inconsistent
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Snapshot belongs to another order
    #[error("Snapshot for order {actual} cannot update order {expected}")]
    SnapshotMismatch {
        /// Id of the order being updated
        expected: String,
        /// Id carried by the snapshot
        actual: String,
    },
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal price
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice(format!("Price must be positive, got {}", value)));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Half of this price.
    ///
    /// Used as the execution limit of protective stops.
    pub fn half(&self) -> Self {
        Self(self.0 / Decimal::from(2))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Price {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| DomainError::InvalidPrice(format!("Cannot parse price: {}", s)))?;
        Self::new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_price(self.0))
    }
}

/// Render a price the way the exchange displays it.
///
/// Rounded to 8 decimals with trailing zeros stripped: `0.05000000` becomes
/// `0.05`, `100` stays `100`.
pub fn format_price(value: Decimal) -> String {
    value.round_dp(PRICE_DECIMALS).normalize().to_string()
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive decimal quantity
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity(format!(
                "Quantity must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Quantity {
    /// Three decimals, as printed in order descriptions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0.round_dp(3))
    }
}

// =============================================================================
// Market
// =============================================================================

/// Market represents a currency pair written `BASE-QUOTE` (e.g., `BTC-ETH`)
///
/// Prices are expressed in the base currency; the quote currency is the
/// asset being bought or sold.
///
/// # Invariants
/// - Exactly one `-` separator
/// - Base and quote are non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Market {
    base: String,
    quote: String,
}

impl Market {
    /// Create a Market from a pair string
    ///
    /// # Examples
    /// ```
    /// # use bourse_domain::value_objects::Market;
    /// let market = Market::from_pair("BTC-ETH").unwrap();
    /// assert_eq!(market.base(), "BTC");
    /// assert_eq!(market.quote(), "ETH");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidMarket` if format is invalid
    pub fn from_pair(pair: &str) -> Result<Self, DomainError> {
        let mut parts = pair.trim().split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => Ok(Self {
                base: base.to_uppercase(),
                quote: quote.to_uppercase(),
            }),
            _ => Err(DomainError::InvalidMarket(format!(
                "Expected BASE-QUOTE, got: {}",
                pair
            ))),
        }
    }

    /// Get the base currency (the one prices are quoted in)
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Get the quote currency (the asset being traded)
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Get the pair as string (e.g., "BTC-ETH")
    pub fn as_pair(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl FromStr for Market {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_pair(s)
    }
}

impl TryFrom<String> for Market {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_pair(&value)
    }
}

impl From<Market> for String {
    fn from(market: Market) -> Self {
        market.as_pair()
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

// =============================================================================
// OrderSide
// =============================================================================

/// OrderSide represents the order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
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
    fn test_price_validation() {
        assert!(Price::new(dec!(0.05)).is_ok());
        assert!(Price::new(Decimal::ZERO).is_err());
        assert!(Price::new(dec!(-1)).is_err());
    }

    #[test]
    fn test_price_from_str() {
        let price: Price = "0.00012345".parse().unwrap();
        assert_eq!(price.as_decimal(), dec!(0.00012345));

        assert!("abc".parse::<Price>().is_err());
        assert!("0".parse::<Price>().is_err());
    }

    #[test]
    fn test_price_half() {
        let trigger = Price::new(dec!(100)).unwrap();
        assert_eq!(trigger.half().as_decimal(), dec!(50));
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(dec!(0.05)), "0.05");
        assert_eq!(format_price(dec!(0.05000000)), "0.05");
        assert_eq!(format_price(dec!(100)), "100");
        assert_eq!(format_price(dec!(0.000000015)), "0.00000002");
    }

    #[test]
    fn test_quantity_display_three_decimals() {
        assert_eq!(Quantity::new(dec!(1.5)).unwrap().to_string(), "1.500");
        assert_eq!(Quantity::new(dec!(2)).unwrap().to_string(), "2.000");
        assert_eq!(Quantity::new(dec!(0.12345)).unwrap().to_string(), "0.123");
    }

    #[test]
    fn test_quantity_validation() {
        assert!(Quantity::new(dec!(0.1)).is_ok());
        assert!(Quantity::new(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_market_from_pair() {
        let market = Market::from_pair("BTC-ETH").unwrap();
        assert_eq!(market.base(), "BTC");
        assert_eq!(market.quote(), "ETH");
        assert_eq!(market.to_string(), "BTC-ETH");

        let lower = Market::from_pair("btc-ltc").unwrap();
        assert_eq!(lower.as_pair(), "BTC-LTC");
    }

    #[test]
    fn test_market_rejects_malformed_pairs() {
        assert!(Market::from_pair("BTCETH").is_err());
        assert!(Market::from_pair("BTC-").is_err());
        assert!(Market::from_pair("-ETH").is_err());
        assert!(Market::from_pair("BTC-ETH-LTC").is_err());
    }

    #[test]
    fn test_market_serde_as_string() {
        let market = Market::from_pair("BTC-ETH").unwrap();
        let json = serde_json::to_string(&market).unwrap();
        assert_eq!(json, "\"BTC-ETH\"");

        let parsed: Market = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, market);
    }

    #[test]
    fn test_deserialize_enforces_positive_values() {
        let price: Price = serde_json::from_str("\"0.05\"").unwrap();
        assert_eq!(price.as_decimal(), dec!(0.05));
        let quantity: Quantity = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(quantity.as_decimal(), dec!(1.5));

        assert!(serde_json::from_str::<Price>("\"0\"").is_err());
        assert!(serde_json::from_str::<Price>("\"-2\"").is_err());
        assert!(serde_json::from_str::<Quantity>("\"0\"").is_err());
    }

    #[test]
    fn test_order_side_display() {
        assert_eq!(OrderSide::Buy.to_string(), "BUY");
        assert_eq!(OrderSide::Sell.to_string(), "SELL");
    }
}
