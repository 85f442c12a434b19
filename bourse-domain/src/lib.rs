//! Bourse Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains the order entity, value objects, and API credentials.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod credentials;
pub mod order;
pub mod value_objects;

// Re-export commonly used types
pub use credentials::{ApiCredentials, CredentialError};
pub use order::{
    ConditionSnapshot, Order, OrderId, OrderKind, OrderSnapshot, OrderStatus, TriggerCondition,
};
pub use value_objects::{format_price, DomainError, Market, OrderSide, Price, Quantity};
