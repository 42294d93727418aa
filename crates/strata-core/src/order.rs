//! Order identity and the registry-owned order record.

use core::fmt;
use core::sync::atomic::{AtomicI64, Ordering};

use crate::fixed::{Price, Quantity};

/// Side of the order book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    /// Bid side (buyers).
    Buy = 0,
    /// Ask side (sellers).
    Sell = 1,
}

impl Side {
    /// Get the opposite side.
    #[inline(always)]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Array index for per-side storage.
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

/// Unique order identifier. Never reused while the order is live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live order as owned by the registry.
///
/// `id`, `side`, `price` and `slot` are fixed at creation. Quantity is the
/// only mutable field and changes through a single atomic exchange, so two
/// racing modifies each observe the value the other left behind.
#[derive(Debug)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    /// Bucket index assigned by the indexer.
    pub slot: usize,
    quantity: AtomicI64,
}

impl Order {
    /// Create a new order.
    #[inline(always)]
    pub fn new(id: OrderId, side: Side, price: Price, slot: usize, quantity: Quantity) -> Self {
        Self {
            id,
            side,
            price,
            slot,
            quantity: AtomicI64::new(quantity.0),
        }
    }

    /// Current quantity.
    #[inline(always)]
    pub fn quantity(&self) -> Quantity {
        Quantity(self.quantity.load(Ordering::Acquire))
    }

    /// Replace the quantity, returning the previous one.
    #[inline(always)]
    pub fn swap_quantity(&self, quantity: Quantity) -> Quantity {
        Quantity(self.quantity.swap(quantity.0, Ordering::AcqRel))
    }

    /// Copy out the current state.
    #[inline]
    pub fn info(&self) -> OrderInfo {
        OrderInfo {
            id: self.id,
            side: self.side,
            price: self.price,
            quantity: self.quantity(),
        }
    }
}

/// Point-in-time copy of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderInfo {
    pub id: OrderId,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_quantity_returns_previous() {
        let order = Order::new(OrderId(1), Side::Buy, Price(100), 100, Quantity(10));

        assert_eq!(order.swap_quantity(Quantity(30)), Quantity(10));
        assert_eq!(order.swap_quantity(Quantity(5)), Quantity(30));
        assert_eq!(order.quantity(), Quantity(5));
    }

    #[test]
    fn test_info_snapshot() {
        let order = Order::new(OrderId(7), Side::Sell, Price(-3), 0, Quantity(4));
        let info = order.info();

        assert_eq!(info.id, OrderId(7));
        assert_eq!(info.side, Side::Sell);
        assert_eq!(info.price, Price(-3));
        assert_eq!(info.quantity, Quantity(4));
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
        assert_eq!(Side::Buy.index(), 0);
        assert_eq!(Side::Sell.index(), 1);
    }
}
