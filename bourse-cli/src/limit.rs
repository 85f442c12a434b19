//! The `limit` command: sell a whole position at a limit price.
//!
//! The market's working order (if any) is adopted and replaced by a sell
//! limit for the full balance held in the quote asset.

use std::io::Write;
use std::sync::Arc;

use tracing::{info, warn};

use bourse_connectors::HttpTransport;
use bourse_domain::{Market, Order, OrderSide, Price, Quantity};
use bourse_exec::{ExchangeClient, ExchangeTransport, MarketOrderSlot};

use crate::config::{load_credentials, Config};
use crate::error::{CliError, CliResult};

/// Build an exchange client from configuration.
///
/// Without a key file the client can only reach public endpoints.
pub fn build_client(config: &Config) -> CliResult<ExchangeClient<HttpTransport>> {
    let credentials = load_credentials(&config.api.key_file)?;
    if credentials.is_none() {
        warn!(
            key_file = %config.api.key_file.display(),
            "No key file, private endpoints unavailable"
        );
    }

    let transport = HttpTransport::new(config.api.base_url.as_str(), credentials)
        .with_timeout(config.api.request_timeout);

    Ok(ExchangeClient::new(Arc::new(transport))
        .with_validator(config.validator())
        .with_retry_policy(config.retry_policy())
        .with_cancel_poll(config.cancel))
}

/// Replace the open order on `market` with a sell limit at `limit_price`.
///
/// Prints the adopted order and the new order to `out`. Returns the order
/// left resting on the market.
///
/// # Errors
///
/// `CliError::NoPosition` if nothing is held in the quote asset.
pub async fn run_limit<T: ExchangeTransport>(
    client: &ExchangeClient<T>,
    market: &Market,
    limit_price: Price,
    out: &mut impl Write,
) -> CliResult<Option<Order>> {
    let currency = market.quote();

    let position = client
        .get_position(currency)
        .await?
        .filter(|balance| !balance.is_empty())
        .ok_or_else(|| CliError::NoPosition(currency.to_string()))?;
    let quantity = Quantity::new(position.balance)?;
    info!(%market, %quantity, "Position found");

    let mut slot = MarketOrderSlot::new(market.clone());
    if let Some(order) = slot.adopt_open_order(client).await? {
        writeln!(out, "{}", order)?;
    }

    let placed = slot
        .replace(client, || async {
            client
                .place_limit_order(market, OrderSide::Sell, quantity, limit_price)
                .await
                .map(Some)
        })
        .await?
        .cloned();

    if let Some(order) = &placed {
        writeln!(out, "{}", order)?;
    }

    Ok(placed)
}

// =============================================================================
// Tests
// =============================================================================
