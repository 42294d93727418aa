//! Id-keyed ownership of every live order.
//!
//! Cancel and modify resolve an id to its (side, slot) here in O(1)
//! instead of scanning buckets. The registry is the only owner of an
//! [`Order`]; buckets hold the id.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::BookError;
use crate::order::{Order, OrderId, OrderInfo, Side};

/// Where a live order rests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderLocation {
    pub side: Side,
    pub slot: usize,
}

/// Concurrent map from [`OrderId`] to the owned [`Order`].
pub struct OrderRegistry {
    orders: DashMap<OrderId, Order>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    /// Register `order`, running `link` before the entry becomes visible.
    ///
    /// `link` runs while the id's shard is write-locked, so no cancel or
    /// modify of this id can interleave with it. Fails with `DuplicateId`
    /// (without calling `link`) if the id is already live.
    pub fn register<F>(&self, order: Order, link: F) -> Result<(), BookError>
    where
        F: FnOnce(&Order),
    {
        match self.orders.entry(order.id) {
            Entry::Occupied(_) => Err(BookError::DuplicateId(order.id)),
            Entry::Vacant(vacant) => {
                link(&order);
                vacant.insert(order);
                Ok(())
            }
        }
    }

    /// Location of a live order.
    #[inline]
    pub fn find(&self, id: OrderId) -> Option<OrderLocation> {
        self.orders.get(&id).map(|o| OrderLocation {
            side: o.side,
            slot: o.slot,
        })
    }

    /// Run `f` against a live order under its shard's read lock.
    ///
    /// An `unregister` of the same id waits until `f` returns.
    #[inline]
    pub fn with_order<R>(&self, id: OrderId, f: impl FnOnce(&Order) -> R) -> Option<R> {
        self.orders.get(&id).map(|o| f(o.value()))
    }

    /// Remove and return the order. A second call for the same id
    /// returns `None`.
    #[inline]
    pub fn unregister(&self, id: OrderId) -> Option<Order> {
        self.orders.remove(&id).map(|(_, order)| order)
    }

    /// Copy of one order.
    pub fn get(&self, id: OrderId) -> Option<OrderInfo> {
        self.with_order(id, Order::info)
    }

    /// Copy of every live order. Not atomic across shards.
    pub fn snapshot(&self) -> Vec<OrderInfo> {
        self.orders.iter().map(|entry| entry.value().info()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Default for OrderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{Price, Quantity};

    fn order(id: u64, side: Side, slot: usize) -> Order {
        Order::new(OrderId(id), side, Price(slot as i64), slot, Quantity(10))
    }

    #[test]
    fn test_register_and_find() {
        let registry = OrderRegistry::new();
        let mut linked = false;
        registry.register(order(1, Side::Buy, 42), |_| linked = true).unwrap();

        assert!(linked);
        assert_eq!(
            registry.find(OrderId(1)),
            Some(OrderLocation { side: Side::Buy, slot: 42 })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_id_skips_link() {
        let registry = OrderRegistry::new();
        registry.register(order(1, Side::Buy, 1), |_| {}).unwrap();

        let mut linked = false;
        let err = registry
            .register(order(1, Side::Sell, 2), |_| linked = true)
            .unwrap_err();

        assert_eq!(err, BookError::DuplicateId(OrderId(1)));
        assert!(!linked);
        // Original entry untouched.
        assert_eq!(registry.find(OrderId(1)).map(|l| l.side), Some(Side::Buy));
    }

    #[test]
    fn test_unregister_idempotent() {
        let registry = OrderRegistry::new();
        registry.register(order(5, Side::Sell, 3), |_| {}).unwrap();

        let removed = registry.unregister(OrderId(5)).unwrap();
        assert_eq!(removed.id, OrderId(5));
        assert!(registry.unregister(OrderId(5)).is_none());
        assert!(registry.find(OrderId(5)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_id_reusable_after_unregister() {
        let registry = OrderRegistry::new();
        registry.register(order(9, Side::Buy, 1), |_| {}).unwrap();
        registry.unregister(OrderId(9));
        assert!(registry.register(order(9, Side::Sell, 2), |_| {}).is_ok());
    }

    #[test]
    fn test_with_order_and_snapshot() {
        let registry = OrderRegistry::new();
        registry.register(order(1, Side::Buy, 1), |_| {}).unwrap();
        registry.register(order(2, Side::Sell, 2), |_| {}).unwrap();

        let old = registry.with_order(OrderId(1), |o| o.swap_quantity(Quantity(25)));
        assert_eq!(old, Some(Quantity(10)));
        assert_eq!(registry.get(OrderId(1)).map(|o| o.quantity), Some(Quantity(25)));
        assert!(registry.with_order(OrderId(3), |_| ()).is_none());

        let mut ids: Vec<_> = registry.snapshot().iter().map(|o| o.id).collect();
        ids.sort();
        assert_eq!(ids, vec![OrderId(1), OrderId(2)]);
    }
}
