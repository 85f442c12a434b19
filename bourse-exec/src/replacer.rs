//! Order replacement: keep at most one resting order per market.
//!
//! Replacing always cancels before placing:
//!
//! ```text
//! cancel(current) ─ confirmed ─▶ place() ─▶ new current order
//!        │                          │
//!        └─ error: stop             └─ None / error: market left empty
//! ```
//!
//! The market is never holding two orders at once. The price is a short
//! window with no order at all between the two steps.

use std::future::Future;

use tracing::{info, warn};

use bourse_domain::{Market, Order};

use crate::client::ExchangeClient;
use crate::error::ExecResult;
use crate::ports::ExchangeTransport;

/// Cancel `current` (if any), then run `place`.
///
/// Returns the order now resting on the market. If the exchange does not
/// confirm the cancellation, `place` is not run and `current` is returned.
///
/// # Errors
///
/// A failed cancellation is returned without placing; the state of `current`
/// is then unknown and should be re-queried. A failed placement after a
/// confirmed cancellation leaves the market without an order.
pub async fn replace_order<T, F, Fut>(
    client: &ExchangeClient<T>,
    mut current: Option<Order>,
    place: F,
) -> ExecResult<Option<Order>>
where
    T: ExchangeTransport,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ExecResult<Option<Order>>>,
{
    replace_in_place(client, &mut current, place).await?;
    Ok(current)
}

/// Replacement over a borrowed slot.
///
/// `current` is only cleared once its cancellation is confirmed, so an order
/// whose cancel failed stays tracked and is cancelled again next time.
async fn replace_in_place<T, F, Fut>(
    client: &ExchangeClient<T>,
    current: &mut Option<Order>,
    place: F,
) -> ExecResult<()>
where
    T: ExchangeTransport,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ExecResult<Option<Order>>>,
{
    if let Some(order) = current.as_mut() {
        if !client.cancel_order(order).await? {
            warn!(order_id = %order.id(), "Cancellation not confirmed, keeping current order");
            return Ok(());
        }
        *current = None;
    }

    match place().await {
        Ok(Some(order)) => {
            info!(order_id = %order.id(), %order, "Replacement order resting");
            *current = Some(order);
            Ok(())
        },
        Ok(None) => {
            info!("No replacement order, market left empty");
            Ok(())
        },
        Err(e) => {
            warn!(error = %e, "Replacement placement failed, market left empty");
            Err(e)
        },
    }
}

// =============================================================================
// Market order slot
// =============================================================================

/// The single working order of one market.
///
/// All changes go through `&mut self`, so replacements on one slot are
/// serialized.
#[derive(Debug)]
pub struct MarketOrderSlot {
    market: Market,
    current: Option<Order>,
}

impl MarketOrderSlot {
    /// Empty slot for `market`.
    pub fn new(market: Market) -> Self {
        Self { market, current: None }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Order currently resting on the market, as last known.
    pub fn current(&self) -> Option<&Order> {
        self.current.as_ref()
    }

    /// Take over the first open order the exchange lists for this market.
    ///
    /// Returns the adopted order, if any. An order already held is kept.
    pub async fn adopt_open_order<T: ExchangeTransport>(
        &mut self,
        client: &ExchangeClient<T>,
    ) -> ExecResult<Option<&Order>> {
        if self.current.is_none() {
            let open = client.list_open_orders(&self.market).await?;
            if open.len() > 1 {
                warn!(
                    market = %self.market,
                    count = open.len(),
                    "Several open orders, adopting the first"
                );
            }
            self.current = open.into_iter().next();
            if let Some(order) = &self.current {
                info!(order_id = %order.id(), %order, "Adopted open order");
            }
        }
        Ok(self.current.as_ref())
    }

    /// Replace the current order with whatever `place` puts on the book.
    ///
    /// If the cancellation fails the order stays in the slot and is cancelled
    /// again by the next call. If the placement fails the slot is empty.
    pub async fn replace<T, F, Fut>(
        &mut self,
        client: &ExchangeClient<T>,
        place: F,
    ) -> ExecResult<Option<&Order>>
    where
        T: ExchangeTransport,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ExecResult<Option<Order>>>,
    {
        replace_in_place(client, &mut self.current, place).await?;
        Ok(self.current.as_ref())
    }

    /// Cancel the current order and leave the market empty.
    pub async fn withdraw<T: ExchangeTransport>(
        &mut self,
        client: &ExchangeClient<T>,
    ) -> ExecResult<()> {
        replace_in_place(client, &mut self.current, || async { Ok(None) }).await
    }
}

// =============================================================================
// Tests
// =============================================================================
