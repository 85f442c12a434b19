//! Bourse CLI Library
//!
//! Command-line front end over the execution layer.
//!
//! # Architecture
//!
//! ```text
//! bourse-limit → Config → ExchangeClient(HttpTransport) → MarketOrderSlot
//! ```
//!
//! # Components
//!
//! - **Cli**: Argument parsing (`<market> <limit_price>`)
//! - **Config**: Environment-based configuration and key file loading
//! - **Limit**: Sell a whole position at a limit price, replacing the open order

#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod error;
pub mod limit;

// Re-exports for convenience
pub use cli::Cli;
pub use config::{load_credentials, ApiConfig, Config, RetryConfig};
pub use error::{CliError, CliResult};
pub use limit::{build_client, run_limit};
