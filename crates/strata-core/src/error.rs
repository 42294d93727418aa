//! Caller-visible book errors.

use crate::fixed::{Price, Quantity};
use crate::order::OrderId;

/// Errors returned by order book operations.
///
/// All variants are recoverable outcomes of a single call. Lost CAS
/// races are retried internally and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    /// Quantity on add or modify was zero or negative.
    #[error("invalid quantity {quantity}: must be positive")]
    InvalidQuantity {
        /// The rejected quantity.
        quantity: Quantity,
    },

    /// Price lies outside the configured tick domain.
    #[error("price {price} outside configured range [{min}, {max}]")]
    OutOfRange {
        /// The rejected price.
        price: Price,
        /// Lowest supported price.
        min: Price,
        /// Highest supported price.
        max: Price,
    },

    /// An order with this id is already live.
    #[error("order {0} is already live")]
    DuplicateId(OrderId),

    /// No live order with this id.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// Rejected `BookConfig`.
    #[error("invalid book configuration: {0}")]
    InvalidConfig(String),
}
