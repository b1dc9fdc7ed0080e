//! Shared types for the orders service.

pub mod money;
pub mod types;

pub use money::{Money, MoneyError};
pub use types::{ItemId, OrderId};
