//! Stub implementations for testing.
//!
//! `StubTransport` is an in-memory exchange: it keeps an order book per
//! market, balances and candles, and answers with the same envelopes a real
//! transport would. Failures are injected per endpoint with [`StubTransport::script`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use bourse_domain::{ConditionSnapshot, Market, OrderSide, OrderSnapshot, TriggerCondition};

use crate::ports::{Balance, Candle, Endpoint, Envelope, ExchangeTransport, Params};

// =============================================================================
// Stub Transport
// =============================================================================

/// In-memory exchange for testing.
pub struct StubTransport {
    state: Mutex<StubState>,
    authenticated: bool,
}

#[derive(Default)]
struct StubState {
    /// Orders in placement order
    orders: Vec<OrderSnapshot>,
    balances: HashMap<String, Balance>,
    candles: HashMap<String, Vec<Candle>>,
    /// Canned responses, consumed before the simulated exchange answers
    scripted: HashMap<Endpoint, VecDeque<Envelope>>,
    /// Every call received, in order
    calls: Vec<Endpoint>,
    /// Status polls a cancelled order keeps reporting open
    confirmation_polls: u32,
    cancel_never_confirms: bool,
    /// Cancelled orders still reported open: id -> remaining polls
    pending_close: HashMap<String, u32>,
}

impl StubTransport {
    /// Create an authenticated stub exchange.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState::default()),
            authenticated: true,
        }
    }

    /// Create a stub without credentials (public endpoints only).
    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            ..Self::new()
        }
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer the next call to `endpoint` with `envelope`.
    ///
    /// Several scripted envelopes for the same endpoint are served in order.
    pub fn script(&self, endpoint: Endpoint, envelope: Envelope) {
        self.state().scripted.entry(endpoint).or_default().push_back(envelope);
    }

    /// Set the balance held in `currency`.
    pub fn set_balance(&self, currency: &str, amount: Decimal) {
        self.state().balances.insert(
            currency.to_string(),
            Balance {
                currency: currency.to_string(),
                balance: amount,
                available: amount,
                pending: Decimal::ZERO,
            },
        );
    }

    /// Set the candle history of `market` (oldest first).
    pub fn set_candles(&self, market: &Market, candles: Vec<Candle>) {
        self.state().candles.insert(market.as_pair(), candles);
    }

    /// Put an existing order on the book.
    pub fn insert_order(&self, snapshot: OrderSnapshot) {
        self.state().orders.push(snapshot);
    }

    /// Keep cancelled orders reported open for `polls` status queries.
    pub fn set_cancel_confirmation_polls(&self, polls: u32) {
        self.state().confirmation_polls = polls;
    }

    /// Accept cancellations but never report the order closed.
    pub fn set_cancel_never_confirms(&self, never: bool) {
        self.state().cancel_never_confirms = never;
    }

    /// Fill an open order completely at `price`.
    pub fn fill(&self, order_id: &str, price: Decimal) {
        let mut state = self.state();
        if let Some(order) = state.orders.iter_mut().find(|o| o.order_id == order_id) {
            order.is_open = false;
            order.quantity_remaining = Some(Decimal::ZERO);
            order.price_per_unit = Some(price);
        }
    }

    /// Drop every trace of an order.
    pub fn forget_order(&self, order_id: &str) {
        self.state().orders.retain(|o| o.order_id != order_id);
    }

    /// Current view of one order.
    pub fn order(&self, order_id: &str) -> Option<OrderSnapshot> {
        self.state().orders.iter().find(|o| o.order_id == order_id).cloned()
    }

    /// Orders resting on `market`.
    pub fn open_orders(&self, market: &Market) -> Vec<OrderSnapshot> {
        self.state()
            .orders
            .iter()
            .filter(|o| o.is_open && &o.market == market)
            .cloned()
            .collect()
    }

    /// Every endpoint called so far.
    pub fn calls(&self) -> Vec<Endpoint> {
        self.state().calls.clone()
    }

    /// Number of calls to `endpoint`.
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state().calls.iter().filter(|e| **e == endpoint).count()
    }
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeTransport for StubTransport {
    async fn call(&self, endpoint: Endpoint, params: &Params) -> Envelope {
        let mut state = self.state();
        state.calls.push(endpoint);

        if let Some(envelope) = state.scripted.get_mut(&endpoint).and_then(VecDeque::pop_front) {
            tracing::debug!(%endpoint, "Stub: scripted response");
            return envelope;
        }

        match endpoint {
            Endpoint::BuyLimit => state.place(OrderSide::Buy, params),
            Endpoint::SellLimit => state.place(OrderSide::Sell, params),
            Endpoint::Cancel => state.cancel(params),
            Endpoint::GetOrder => state.get_order(params),
            Endpoint::OpenOrders => {
                let market = param(params, "market");
                let orders: Vec<&OrderSnapshot> = state
                    .orders
                    .iter()
                    .filter(|o| o.is_open && Some(o.market.as_pair().as_str()) == market)
                    .collect();
                Envelope::ok(json!(orders))
            },
            Endpoint::OrderHistory => {
                let market = param(params, "market");
                let orders: Vec<&OrderSnapshot> = state
                    .orders
                    .iter()
                    .filter(|o| !o.is_open)
                    .filter(|o| market.map_or(true, |m| o.market.as_pair() == m))
                    .collect();
                Envelope::ok(json!(orders))
            },
            Endpoint::Balances => {
                let mut balances: Vec<&Balance> = state.balances.values().collect();
                balances.sort_by(|a, b| a.currency.cmp(&b.currency));
                Envelope::ok(json!(balances))
            },
            Endpoint::Balance => {
                match param(params, "currency").and_then(|c| state.balances.get(c)) {
                    Some(balance) => Envelope::ok(json!(balance)),
                    None => Envelope::ok_empty(),
                }
            },
            Endpoint::LatestTick => {
                let last = param(params, "market")
                    .and_then(|m| state.candles.get(m))
                    .and_then(|c| c.last());
                Envelope::ok(json!(last.into_iter().collect::<Vec<_>>()))
            },
            Endpoint::Candles => {
                let candles = param(params, "market")
                    .and_then(|m| state.candles.get(m))
                    .cloned()
                    .unwrap_or_default();
                Envelope::ok(json!(candles))
            },
        }
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

impl StubState {
    fn place(&mut self, side: OrderSide, params: &Params) -> Envelope {
        let market = param(params, "market").and_then(|m| Market::from_pair(m).ok());
        let quantity = decimal_param(params, "quantity");
        let rate = decimal_param(params, "rate");
        let (Some(market), Some(quantity), Some(rate)) = (market, quantity, rate) else {
            return Envelope::failure("INVALID_PARAMS");
        };

        let condition = match param(params, "condition_type") {
            Some("LESS_THAN") => decimal_param(params, "target").map(|target| ConditionSnapshot {
                kind: TriggerCondition::Below,
                target,
            }),
            Some("GREATER_THAN") => decimal_param(params, "target").map(|target| ConditionSnapshot {
                kind: TriggerCondition::Above,
                target,
            }),
            _ => None,
        };

        let order_id = Uuid::now_v7().to_string();
        self.orders.push(OrderSnapshot {
            order_id: order_id.clone(),
            market,
            side,
            quantity,
            limit: rate,
            condition,
            is_open: true,
            quantity_remaining: Some(quantity),
            price_per_unit: None,
        });

        tracing::debug!(%order_id, "Stub: order placed");
        Envelope::ok(json!({ "order_id": order_id }))
    }

    fn cancel(&mut self, params: &Params) -> Envelope {
        let Some(order_id) = param(params, "uuid") else {
            return Envelope::failure("INVALID_PARAMS");
        };
        let confirmation_polls = self.confirmation_polls;
        let never_confirms = self.cancel_never_confirms;

        let Some(order) = self.orders.iter_mut().find(|o| o.order_id == order_id) else {
            return Envelope::failure("INVALID_ORDER");
        };
        if !order.is_open || self.pending_close.contains_key(order_id) {
            return Envelope::failure("ORDER_NOT_OPEN");
        }

        if never_confirms {
            self.pending_close.insert(order_id.to_string(), u32::MAX);
        } else if confirmation_polls > 0 {
            self.pending_close.insert(order_id.to_string(), confirmation_polls);
        } else {
            order.is_open = false;
        }

        tracing::debug!(order_id, "Stub: order cancelled");
        Envelope::ok_empty()
    }

    fn get_order(&mut self, params: &Params) -> Envelope {
        let Some(order_id) = param(params, "uuid") else {
            return Envelope::failure("INVALID_PARAMS");
        };

        let still_open = match self.pending_close.get(order_id).copied() {
            Some(u32::MAX) | None => true,
            Some(0) => {
                self.pending_close.remove(order_id);
                false
            },
            Some(remaining) => {
                self.pending_close.insert(order_id.to_string(), remaining - 1);
                true
            },
        };

        match self.orders.iter_mut().find(|o| o.order_id == order_id) {
            Some(order) => {
                if !still_open {
                    order.is_open = false;
                }
                Envelope::ok(json!(order))
            },
            // Unknown orders come back without a result
            None => Envelope::ok_empty(),
        }
    }
}

fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

fn decimal_param(params: &Params, key: &str) -> Option<Decimal> {
    param(params, key).and_then(|v| Decimal::from_str(v).ok())
}

// =============================================================================
// Tests
// =============================================================================
