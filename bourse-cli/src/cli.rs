//! Command-line interface definitions.

use bourse_domain::{Market, Price};
use clap::Parser;

/// Replace the open order of a market with a sell limit for the whole position.
#[derive(Parser, Debug)]
#[command(name = "bourse-limit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Market pair, e.g. BTC-ETH (the position is held in the second asset)
    pub market: Market,

    /// Limit price of the sell order
    pub limit_price: Price,
}
