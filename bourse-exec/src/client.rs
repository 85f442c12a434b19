//! Exchange client: orders, balances and market data.
//!
//! Every exchange call goes through the same pipeline:
//!
//! ```text
//! RetryPolicy( ResponseValidator( ExchangeTransport::call ) )
//! ```
//!
//! Fatal errors reach the caller unchanged. Retryable errors are absorbed by
//! the retry policy unless it gives up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use bourse_domain::{
    DomainError, Market, Order, OrderId, OrderKind, OrderSide, OrderSnapshot, Price, Quantity,
    TriggerCondition,
};

use crate::error::{ExecError, ExecResult};
use crate::ports::{Balance, Candle, CandleInterval, Endpoint, ExchangeTransport};
use crate::retry::RetryPolicy;
use crate::validator::ResponseValidator;

/// Orders stay on the book until cancelled.
const TIME_IN_EFFECT: &str = "GOOD_TIL_CANCELLED";

// =============================================================================
// Cancel confirmation polling
// =============================================================================

/// How long and how often to poll for a cancelled order to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelPollConfig {
    /// Delay before the second status query
    pub initial_interval: Duration,
    /// Upper bound for the delay between queries
    pub max_interval: Duration,
    /// Give up and return `ExecError::CancelTimeout` after this long
    pub timeout: Duration,
}

impl Default for CancelPollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Payload of a placement response.
#[derive(Debug, Deserialize)]
struct Placement {
    order_id: String,
}

// =============================================================================
// Exchange Client
// =============================================================================

/// Client for one exchange account.
pub struct ExchangeClient<T: ExchangeTransport> {
    transport: Arc<T>,
    validator: ResponseValidator,
    retry: RetryPolicy,
    cancel_poll: CancelPollConfig,
}

impl<T: ExchangeTransport> ExchangeClient<T> {
    /// Create a client with the default validator, retry policy and cancel polling.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            validator: ResponseValidator::new(),
            retry: RetryPolicy::default(),
            cancel_poll: CancelPollConfig::default(),
        }
    }

    /// Use a custom response validator.
    pub fn with_validator(mut self, validator: ResponseValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Use a custom retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use custom cancel confirmation polling.
    pub fn with_cancel_poll(mut self, cancel_poll: CancelPollConfig) -> Self {
        self.cancel_poll = cancel_poll;
        self
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Whether private endpoints are usable.
    pub fn is_authenticated(&self) -> bool {
        self.transport.is_authenticated()
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place a good-til-cancelled limit order.
    ///
    /// Retried on transient failures; a retry after the exchange already
    /// accepted the order may place it twice.
    pub async fn place_limit_order(
        &self,
        market: &Market,
        side: OrderSide,
        quantity: Quantity,
        price: Price,
    ) -> ExecResult<Order> {
        self.place(market, side, quantity, OrderKind::Limit { limit: price }).await
    }

    /// Place a protective sell stop.
    ///
    /// Armed when the price falls below `trigger`; executes as a limit at
    /// `trigger / 2` so it fills once triggered.
    pub async fn place_stop_order(
        &self,
        market: &Market,
        quantity: Quantity,
        trigger: Price,
    ) -> ExecResult<Order> {
        let kind = OrderKind::StopLimit {
            limit: trigger.half(),
            trigger,
            condition: TriggerCondition::Below,
        };
        self.place(market, OrderSide::Sell, quantity, kind).await
    }

    /// Place a buy limit at `max_price`, armed once the price rises above `min_price`.
    pub async fn place_range_buy(
        &self,
        market: &Market,
        quantity: Quantity,
        min_price: Price,
        max_price: Price,
    ) -> ExecResult<Order> {
        if min_price > max_price {
            return Err(DomainError::InvalidOrder(format!(
                "Range buy minimum {} is above maximum {}",
                min_price, max_price
            ))
            .into());
        }

        let kind = OrderKind::StopLimit {
            limit: max_price,
            trigger: min_price,
            condition: TriggerCondition::Above,
        };
        self.place(market, OrderSide::Buy, quantity, kind).await
    }

    async fn place(
        &self,
        market: &Market,
        side: OrderSide,
        quantity: Quantity,
        kind: OrderKind,
    ) -> ExecResult<Order> {
        let (endpoint, context) = match (side, kind) {
            (OrderSide::Buy, OrderKind::Limit { .. }) => {
                (Endpoint::BuyLimit, "Unable to place buy limit order")
            },
            (OrderSide::Buy, OrderKind::StopLimit { .. }) => {
                (Endpoint::BuyLimit, "Unable to place buy range order")
            },
            (OrderSide::Sell, OrderKind::Limit { .. }) => {
                (Endpoint::SellLimit, "Unable to place sell limit order")
            },
            (OrderSide::Sell, OrderKind::StopLimit { .. }) => {
                (Endpoint::SellLimit, "Unable to place stop order")
            },
        };

        let (condition_type, target) = match kind {
            OrderKind::Limit { .. } => ("NONE", "0".to_string()),
            OrderKind::StopLimit { trigger, condition, .. } => {
                (condition.as_str(), trigger.as_decimal().to_string())
            },
        };

        let params = vec![
            ("market", market.as_pair()),
            ("quantity", quantity.as_decimal().to_string()),
            ("rate", kind.limit().as_decimal().to_string()),
            ("time_in_effect", TIME_IN_EFFECT.to_string()),
            ("condition_type", condition_type.to_string()),
            ("target", target),
        ];

        let result = self.call(endpoint, params, context).await?;
        let placement: Placement = decode(result, "placement")?;

        let order =
            Order::placed(OrderId::new(placement.order_id)?, market.clone(), side, kind, quantity);
        info!(order_id = %order.id(), %order, "Order placed");
        Ok(order)
    }

    /// Orders currently resting on `market`.
    pub async fn list_open_orders(&self, market: &Market) -> ExecResult<Vec<Order>> {
        let result = self
            .call(
                Endpoint::OpenOrders,
                vec![("market", market.as_pair())],
                "Unable to get open orders",
            )
            .await?;
        orders_from(result)
    }

    /// Closed orders, optionally restricted to one market.
    pub async fn list_order_history(&self, market: Option<&Market>) -> ExecResult<Vec<Order>> {
        let params = market.map(|m| vec![("market", m.as_pair())]).unwrap_or_default();
        let result = self
            .call(Endpoint::OrderHistory, params, "Unable to get order history")
            .await?;
        orders_from(result)
    }

    /// Cancel `order` and wait until the exchange reports it closed.
    ///
    /// An order the exchange already considers closed (`ORDER_NOT_OPEN`)
    /// counts as cancelled. On success the order is marked closed.
    ///
    /// # Errors
    ///
    /// `ExecError::CancelTimeout` if the exchange does not confirm within
    /// the configured timeout; the order's state is then unknown.
    pub async fn cancel_order(&self, order: &mut Order) -> ExecResult<bool> {
        let params = vec![("uuid", order.id().to_string())];

        match self.call(Endpoint::Cancel, params, "Unable to cancel order").await {
            Ok(_) => {},
            Err(e) if e.is_order_not_open() => {
                info!(order_id = %order.id(), "Order already closed");
                order.mark_closed();
                return Ok(true);
            },
            Err(e) => return Err(e),
        }

        let config = self.cancel_poll;
        match tokio::time::timeout(config.timeout, self.poll_until_closed(order.id())).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ExecError::CancelTimeout {
                    order_id: order.id().to_string(),
                    waited: config.timeout,
                })
            },
        }

        order.mark_closed();
        info!(order_id = %order.id(), "Order cancelled");
        Ok(true)
    }

    async fn poll_until_closed(&self, order_id: &OrderId) -> ExecResult<()> {
        let mut interval = self.cancel_poll.initial_interval;

        loop {
            let snapshot = self
                .fetch_snapshot(order_id, "Unable to get status of cancelled order")
                .await?;
            let closed = match snapshot {
                None => true,
                Some(snapshot) => !snapshot.is_open,
            };
            if closed {
                return Ok(());
            }

            debug!(
                %order_id,
                interval_ms = interval.as_millis() as u64,
                "Waiting for cancellation"
            );
            tokio::time::sleep(interval).await;
            interval = interval.saturating_mul(2).min(self.cancel_poll.max_interval);
        }
    }

    /// Re-read `order` from the exchange and update it in place.
    pub async fn refresh_order(&self, order: &mut Order) -> ExecResult<()> {
        let snapshot = self
            .fetch_snapshot(order.id(), "Unable to get order")
            .await?
            .ok_or_else(|| ExecError::OrderNotFound(order.id().to_string()))?;
        order.apply_snapshot(snapshot)?;
        debug!(order_id = %order.id(), open = order.is_open(), "Order refreshed");
        Ok(())
    }

    async fn fetch_snapshot(
        &self,
        order_id: &OrderId,
        context: &str,
    ) -> ExecResult<Option<OrderSnapshot>> {
        let result = self
            .call(Endpoint::GetOrder, vec![("uuid", order_id.to_string())], context)
            .await?;
        decode_optional(result, "order")
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// All balances, keyed by currency.
    pub async fn get_balances(&self) -> ExecResult<HashMap<String, Balance>> {
        let result = self.call(Endpoint::Balances, vec![], "Unable to get balances").await?;
        let balances: Vec<Balance> = decode_optional(result, "balances")?.unwrap_or_default();
        Ok(balances.into_iter().map(|b| (b.currency.clone(), b)).collect())
    }

    /// Balance of one asset, if the account holds any record of it.
    pub async fn get_position(&self, asset: &str) -> ExecResult<Option<Balance>> {
        let result = self
            .call(
                Endpoint::Balance,
                vec![("currency", asset.to_string())],
                "Unable to get position",
            )
            .await?;
        decode_optional(result, "balance")
    }

    // =========================================================================
    // Market Data (public)
    // =========================================================================

    /// Latest one-minute candle of `market`.
    pub async fn get_tick(&self, market: &Market) -> ExecResult<Option<Candle>> {
        let params = vec![
            ("market", market.as_pair()),
            ("interval", CandleInterval::OneMin.as_str().to_string()),
        ];
        let result = self.call(Endpoint::LatestTick, params, "Unable to get tick").await?;
        let candles: Vec<Candle> = decode_optional(result, "tick")?.unwrap_or_default();
        Ok(candles.into_iter().next())
    }

    /// Candle history of `market`.
    pub async fn get_candles(
        &self,
        market: &Market,
        interval: CandleInterval,
    ) -> ExecResult<Vec<Candle>> {
        let params = vec![
            ("market", market.as_pair()),
            ("interval", interval.as_str().to_string()),
        ];
        let result = self.call(Endpoint::Candles, params, "Unable to get candles").await?;
        Ok(decode_optional(result, "candles")?.unwrap_or_default())
    }

    // =========================================================================
    // Call pipeline
    // =========================================================================

    async fn call(
        &self,
        endpoint: Endpoint,
        params: Vec<(&'static str, String)>,
        context: &str,
    ) -> ExecResult<Option<Value>> {
        if endpoint.requires_auth() && !self.transport.is_authenticated() {
            return Err(ExecError::Unauthenticated(endpoint.name()));
        }

        let transport = &self.transport;
        let validator = &self.validator;
        let params = params.as_slice();

        self.retry
            .run(endpoint.name(), || async move {
                debug!(%endpoint, "Calling exchange");
                let envelope = transport.call(endpoint, params).await;
                validator.validate(envelope, Some(context))
            })
            .await
    }
}

// =============================================================================
// Decoding helpers
// =============================================================================

fn decode<D: DeserializeOwned>(result: Option<Value>, what: &str) -> ExecResult<D> {
    decode_optional(result, what)?.ok_or_else(|| ExecError::Decode(format!("missing {}", what)))
}

fn decode_optional<D: DeserializeOwned>(
    result: Option<Value>,
    what: &str,
) -> ExecResult<Option<D>> {
    match result {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ExecError::Decode(format!("{}: {}", what, e))),
    }
}

/// Orders from a listing; rows that are not valid orders are skipped.
fn orders_from(result: Option<Value>) -> ExecResult<Vec<Order>> {
    let snapshots: Vec<OrderSnapshot> = decode_optional(result, "orders")?.unwrap_or_default();
    let orders = snapshots
        .into_iter()
        .filter_map(|snapshot| {
            let order_id = snapshot.order_id.clone();
            match Order::from_snapshot(snapshot) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!(%order_id, error = %e, "Skipping invalid order in listing");
                    None
                },
            }
        })
        .collect();
    Ok(orders)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Envelope;
    use crate::stub::StubTransport;
    use bourse_domain::OrderStatus;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        Market::from_pair("BTC-ETH").unwrap()
    }

    fn price(value: rust_decimal::Decimal) -> Price {
        Price::new(value).unwrap()
    }

    fn qty(value: rust_decimal::Decimal) -> Quantity {
        Quantity::new(value).unwrap()
    }

    fn client(stub: &Arc<StubTransport>) -> ExchangeClient<StubTransport> {
        ExchangeClient::new(stub.clone())
    }

    #[tokio::test]
    async fn test_place_limit_order() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let order = client
            .place_limit_order(&market(), OrderSide::Buy, qty(dec!(1.5)), price(dec!(0.05)))
            .await
            .unwrap();

        assert!(order.is_open());
        assert!(order.is_buy_order());
        assert_eq!(order.to_string(), "BUY LMT 1.500 BTC-ETH @ 0.05");
        assert_eq!(stub.open_orders(&market()).len(), 1);
    }

    #[tokio::test]
    async fn test_place_stop_order_halves_limit() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let order = client
            .place_stop_order(&market(), qty(dec!(1)), price(dec!(100)))
            .await
            .unwrap();

        assert!(order.is_sell_order());
        assert_eq!(
            *order.kind(),
            OrderKind::StopLimit {
                limit: price(dec!(50)),
                trigger: price(dec!(100)),
                condition: TriggerCondition::Below,
            }
        );

        let resting = stub.order(order.id().as_str()).unwrap();
        assert_eq!(resting.limit, dec!(50));
        assert_eq!(resting.condition.unwrap().target, dec!(100));
    }

    #[tokio::test]
    async fn test_place_range_buy() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let order = client
            .place_range_buy(&market(), qty(dec!(2)), price(dec!(0.04)), price(dec!(0.045)))
            .await
            .unwrap();

        assert_eq!(order.limit(), price(dec!(0.045)));
        assert_eq!(order.to_string(), "BUY STPLMT 2.000 BTC-ETH @ 0.04-0.045");

        let err = client
            .place_range_buy(&market(), qty(dec!(2)), price(dec!(0.05)), price(dec!(0.045)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Domain(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let stub = Arc::new(StubTransport::new());
        stub.script(Endpoint::SellLimit, Envelope::failure("NO_API_RESPONSE"));
        stub.script(Endpoint::SellLimit, Envelope::failure("APIKEY_INVALID"));
        let client = client(&stub);

        let order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();

        assert!(order.is_open());
        assert_eq!(stub.call_count(Endpoint::SellLimit), 3);
    }

    #[tokio::test]
    async fn test_fatal_failure_surfaces_unchanged() {
        let stub = Arc::new(StubTransport::new());
        stub.script(Endpoint::SellLimit, Envelope::failure("INSUFFICIENT_FUNDS"));
        let client = client(&stub);

        let err = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("INSUFFICIENT_FUNDS"));
        assert_eq!(stub.call_count(Endpoint::SellLimit), 1);
    }

    #[tokio::test]
    async fn test_cancel_waits_for_close() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub).with_cancel_poll(CancelPollConfig {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            timeout: Duration::from_secs(5),
        });
        stub.set_cancel_confirmation_polls(3);

        let mut order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();

        assert!(client.cancel_order(&mut order).await.unwrap());
        assert_eq!(order.status(), OrderStatus::Closed);
        assert_eq!(stub.call_count(Endpoint::Cancel), 1);
        assert_eq!(stub.call_count(Endpoint::GetOrder), 4);
        assert!(stub.open_orders(&market()).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_order_not_open_is_success() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let mut order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();
        stub.script(Endpoint::Cancel, Envelope::failure("ORDER_NOT_OPEN"));

        assert!(client.cancel_order(&mut order).await.unwrap());
        assert!(!order.is_open());
        assert_eq!(stub.call_count(Endpoint::GetOrder), 0);
    }

    #[tokio::test]
    async fn test_cancel_order_not_open_with_distinct_code() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let mut order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();
        stub.script(
            Endpoint::Cancel,
            Envelope {
                success: false,
                result: None,
                message: Some("ORDER_NOT_OPEN".to_string()),
                code: Some("CANCEL_REJECTED".to_string()),
            },
        );

        assert!(client.cancel_order(&mut order).await.unwrap());
        assert!(!order.is_open());
        assert_eq!(stub.call_count(Endpoint::GetOrder), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_confirmation_timeout() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub).with_cancel_poll(CancelPollConfig {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        });
        stub.set_cancel_never_confirms(true);

        let mut order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();

        let err = client.cancel_order(&mut order).await.unwrap_err();

        match err {
            ExecError::CancelTimeout { order_id, waited } => {
                assert_eq!(order_id, order.id().to_string());
                assert_eq!(waited, Duration::from_secs(10));
            },
            other => panic!("expected CancelTimeout, got {:?}", other),
        }
        assert!(order.is_open());
    }

    #[tokio::test]
    async fn test_cancel_fatal_error_propagates() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let mut order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();
        stub.script(Endpoint::Cancel, Envelope::failure("INVALID_ORDER"));

        let err = client.cancel_order(&mut order).await.unwrap_err();

        assert_eq!(err.code(), Some("INVALID_ORDER"));
        assert!(order.is_open());
    }

    #[tokio::test]
    async fn test_refresh_order_updates_in_place() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let mut order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();
        let id = order.id().clone();
        stub.fill(id.as_str(), dec!(0.071));

        client.refresh_order(&mut order).await.unwrap();

        assert_eq!(order.id(), &id);
        assert!(!order.is_open());
        assert_eq!(order.price_per_unit(), Some(dec!(0.071)));
    }

    #[tokio::test]
    async fn test_refresh_missing_order() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);

        let mut order = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();
        stub.forget_order(order.id().as_str());

        let err = client.refresh_order(&mut order).await.unwrap_err();
        assert!(matches!(err, ExecError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_orders_and_history() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);
        let other = Market::from_pair("BTC-LTC").unwrap();

        let first = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();
        client
            .place_limit_order(&other, OrderSide::Buy, qty(dec!(5)), price(dec!(0.01)))
            .await
            .unwrap();
        stub.fill(first.id().as_str(), dec!(0.07));

        assert!(client.list_open_orders(&market()).await.unwrap().is_empty());
        assert_eq!(client.list_open_orders(&other).await.unwrap().len(), 1);

        let history = client.list_order_history(Some(&market())).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id(), first.id());

        assert_eq!(client.list_order_history(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped_in_listings() {
        let stub = Arc::new(StubTransport::new());
        let client = client(&stub);
        let valid = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap();
        stub.insert_order(OrderSnapshot {
            order_id: "zero-limit".to_string(),
            market: market(),
            side: OrderSide::Sell,
            quantity: dec!(1),
            limit: dec!(0),
            condition: None,
            is_open: true,
            quantity_remaining: None,
            price_per_unit: None,
        });

        let open = client.list_open_orders(&market()).await.unwrap();

        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id(), valid.id());
    }

    #[tokio::test]
    async fn test_balances_and_position() {
        let stub = Arc::new(StubTransport::new());
        stub.set_balance("ETH", dec!(2.5));
        stub.set_balance("BTC", dec!(0.1));
        let client = client(&stub);

        let balances = client.get_balances().await.unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["ETH"].balance, dec!(2.5));

        let position = client.get_position("ETH").await.unwrap().unwrap();
        assert_eq!(position.available, dec!(2.5));

        assert!(client.get_position("LTC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated_client_only_reads_market_data() {
        let stub = Arc::new(StubTransport::unauthenticated());
        let client = client(&stub);

        let err = client
            .place_limit_order(&market(), OrderSide::Sell, qty(dec!(1)), price(dec!(0.07)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Unauthenticated("sell_limit")));
        assert_eq!(stub.call_count(Endpoint::SellLimit), 0);

        assert!(client.get_tick(&market()).await.unwrap().is_none());
        assert!(client
            .get_candles(&market(), CandleInterval::Hour)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_market_data() {
        let stub = Arc::new(StubTransport::new());
        let now = chrono::Utc::now();
        let candles: Vec<Candle> = [dec!(0.05), dec!(0.06)]
            .into_iter()
            .map(|close| Candle {
                opened_at: now,
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(10),
            })
            .collect();
        stub.set_candles(&market(), candles);
        let client = client(&stub);

        let tick = client.get_tick(&market()).await.unwrap().unwrap();
        assert_eq!(tick.close, dec!(0.06));

        let all = client.get_candles(&market(), CandleInterval::OneMin).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let stub = Arc::new(StubTransport::new());
        stub.script(Endpoint::BuyLimit, Envelope::ok(serde_json::json!({"id": 7})));
        let client = client(&stub);

        let err = client
            .place_limit_order(&market(), OrderSide::Buy, qty(dec!(1)), price(dec!(0.05)))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Decode(_)));
    }
}
