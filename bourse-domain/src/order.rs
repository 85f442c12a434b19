//! Order entity.
//!
//! An `Order` is the client-side view of one resting (or finished) exchange
//! order. Its identity is the exchange-assigned [`OrderId`], fixed at
//! construction. Status only changes through [`Order::apply_snapshot`] and
//! [`Order::mark_closed`], both of which require exclusive access.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{DomainError, Market, OrderSide, Price, Quantity};

// =============================================================================
// Order ID
// =============================================================================

/// Opaque exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap an identifier returned by the exchange.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidOrder` if the identifier is blank
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidOrder("Order id must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Order Kind
// =============================================================================

/// Direction of the price move that arms a conditional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerCondition {
    /// Armed once the price falls below the trigger
    Below,
    /// Armed once the price rises above the trigger
    Above,
}

impl TriggerCondition {
    /// Exchange condition name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerCondition::Below => "LESS_THAN",
            TriggerCondition::Above => "GREATER_THAN",
        }
    }
}

/// What kind of order this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Plain limit order
    Limit {
        /// Limit price
        limit: Price,
    },
    /// Limit order that only becomes active once `condition` holds for `trigger`
    StopLimit {
        /// Limit price used once triggered
        limit: Price,
        /// Price that arms the order
        trigger: Price,
        /// Direction of the arming move
        condition: TriggerCondition,
    },
}

impl OrderKind {
    /// Limit price of the order, whatever its kind.
    pub fn limit(&self) -> Price {
        match self {
            OrderKind::Limit { limit } | OrderKind::StopLimit { limit, .. } => *limit,
        }
    }

    /// Trigger price, for conditional orders.
    pub fn trigger(&self) -> Option<Price> {
        match self {
            OrderKind::Limit { .. } => None,
            OrderKind::StopLimit { trigger, .. } => Some(*trigger),
        }
    }
}

/// Last status reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Resting on the book
    Open,
    /// Filled, cancelled or otherwise gone from the book
    Closed,
}

// =============================================================================
// Order Snapshot
// =============================================================================

/// Order as reported by the exchange (normalized by the transport).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: String,
    pub market: Market,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit: Decimal,
    #[serde(default)]
    pub condition: Option<ConditionSnapshot>,
    pub is_open: bool,
    #[serde(default)]
    pub quantity_remaining: Option<Decimal>,
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
}

/// Trigger part of an [`OrderSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSnapshot {
    pub kind: TriggerCondition,
    pub target: Decimal,
}

// =============================================================================
// Order
// =============================================================================

/// A single exchange order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    market: Market,
    side: OrderSide,
    kind: OrderKind,
    quantity: Quantity,
    status: OrderStatus,
    quantity_remaining: Option<Decimal>,
    price_per_unit: Option<Decimal>,
}

impl Order {
    /// Build the order just accepted by the exchange.
    ///
    /// The exchange only returns the id on placement; everything else comes
    /// from the request.
    pub fn placed(
        id: OrderId,
        market: Market,
        side: OrderSide,
        kind: OrderKind,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            market,
            side,
            kind,
            quantity,
            status: OrderStatus::Open,
            quantity_remaining: Some(quantity.as_decimal()),
            price_per_unit: None,
        }
    }

    /// Build an order from an exchange snapshot.
    ///
    /// # Errors
    /// Returns `DomainError` if the snapshot carries an empty id or
    /// non-positive prices/quantities.
    pub fn from_snapshot(snapshot: OrderSnapshot) -> Result<Self, DomainError> {
        let id = OrderId::new(snapshot.order_id.clone())?;
        let mut order = Self::placed(
            id,
            snapshot.market.clone(),
            snapshot.side,
            OrderKind::Limit { limit: Price::new(snapshot.limit)? },
            Quantity::new(snapshot.quantity)?,
        );
        order.update_from(snapshot)?;
        Ok(order)
    }

    /// Replace this order's attributes with a fresher exchange view.
    ///
    /// The id never changes; a snapshot for another order is rejected and
    /// leaves `self` untouched.
    pub fn apply_snapshot(&mut self, snapshot: OrderSnapshot) -> Result<(), DomainError> {
        if snapshot.order_id != self.id.as_str() {
            return Err(DomainError::SnapshotMismatch {
                expected: self.id.to_string(),
                actual: snapshot.order_id,
            });
        }
        self.update_from(snapshot)
    }

    fn update_from(&mut self, snapshot: OrderSnapshot) -> Result<(), DomainError> {
        let limit = Price::new(snapshot.limit)?;
        let kind = match snapshot.condition {
            None => OrderKind::Limit { limit },
            Some(condition) => OrderKind::StopLimit {
                limit,
                trigger: Price::new(condition.target)?,
                condition: condition.kind,
            },
        };
        let quantity = Quantity::new(snapshot.quantity)?;

        self.market = snapshot.market;
        self.side = snapshot.side;
        self.kind = kind;
        self.quantity = quantity;
        self.status = if snapshot.is_open {
            OrderStatus::Open
        } else {
            OrderStatus::Closed
        };
        self.quantity_remaining = snapshot.quantity_remaining;
        self.price_per_unit = snapshot.price_per_unit;
        Ok(())
    }

    /// Record that the exchange no longer has this order open.
    pub fn mark_closed(&mut self) {
        self.status = OrderStatus::Closed;
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn kind(&self) -> &OrderKind {
        &self.kind
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn limit(&self) -> Price {
        self.kind.limit()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn is_buy_order(&self) -> bool {
        self.side == OrderSide::Buy
    }

    pub fn is_sell_order(&self) -> bool {
        self.side == OrderSide::Sell
    }

    /// Quantity still unfilled, when the exchange reported it.
    pub fn quantity_remaining(&self) -> Option<Decimal> {
        self.quantity_remaining
    }

    /// Average fill price, when the exchange reported one.
    pub fn price_per_unit(&self) -> Option<Decimal> {
        self.price_per_unit
    }
}

// =============================================================================
// Display
// =============================================================================

fn fmt_buy_limit(f: &mut fmt::Formatter<'_>, order: &Order, limit: Price) -> fmt::Result {
    write!(f, "BUY LMT {} {} @ {}", order.quantity, order.market, limit)
}

fn fmt_buy_stop_limit(
    f: &mut fmt::Formatter<'_>,
    order: &Order,
    limit: Price,
    trigger: Price,
) -> fmt::Result {
    write!(f, "BUY STPLMT {} {} @ {}-{}", order.quantity, order.market, trigger, limit)
}

fn fmt_sell_limit(f: &mut fmt::Formatter<'_>, order: &Order, limit: Price) -> fmt::Result {
    write!(f, "SELL LMT {} {} @ {}", order.quantity, order.market, limit)
}

fn fmt_sell_stop(f: &mut fmt::Formatter<'_>, order: &Order, trigger: Price) -> fmt::Result {
    write!(f, "SELL STP {} {} @ {}", order.quantity, order.market, trigger)
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.side, self.kind) {
            (OrderSide::Buy, OrderKind::Limit { limit }) => fmt_buy_limit(f, self, limit),
            (OrderSide::Buy, OrderKind::StopLimit { limit, trigger, .. }) => {
                fmt_buy_stop_limit(f, self, limit, trigger)
            },
            (OrderSide::Sell, OrderKind::Limit { limit }) => fmt_sell_limit(f, self, limit),
            (OrderSide::Sell, OrderKind::StopLimit { trigger, .. }) => {
                fmt_sell_stop(f, self, trigger)
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
