//! The shared, multi-writer order book.
//!
//! Each side has one [`PriceLevelBucket`] per tick in the configured price
//! domain plus a [`BestPriceTracker`]. Orders are owned by the
//! [`OrderRegistry`], which also serializes mutations of the same id.

use core::sync::atomic::{AtomicU64, Ordering};

use arrayvec::ArrayVec;
use tracing::{debug, trace};

use crate::best::BestPriceTracker;
use crate::config::BookConfig;
use crate::error::BookError;
use crate::fixed::{Price, Quantity};
use crate::index::PriceLevelIndexer;
use crate::level::PriceLevelBucket;
use crate::order::{Order, OrderId, OrderInfo, Side};
use crate::registry::OrderRegistry;

/// Maximum levels returned by [`ConcurrentOrderBook::depth`].
pub const MAX_DEPTH: usize = 32;

/// Aggregate view of one non-empty price level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelSummary {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

/// Operation counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BookStats {
    pub adds: u64,
    pub cancels: u64,
    pub modifies: u64,
    pub rejects: u64,
    pub recomputes: u64,
}

#[derive(Default)]
struct Counters {
    adds: AtomicU64,
    cancels: AtomicU64,
    modifies: AtomicU64,
    rejects: AtomicU64,
    recomputes: AtomicU64,
}

/// One side of the book (bids or asks).
struct BookSide {
    levels: Box<[PriceLevelBucket]>,
    best: BestPriceTracker,
}

impl BookSide {
    fn new(side: Side, level_count: usize) -> Self {
        let mut levels = Vec::with_capacity(level_count);
        levels.resize_with(level_count, PriceLevelBucket::new);
        Self {
            levels: levels.into_boxed_slice(),
            best: BestPriceTracker::new(side),
        }
    }
}

/// Concurrent limit order book for a single instrument.
///
/// All operations take `&self`; share it behind an `Arc`. Mutations of
/// different ids proceed in parallel. Queries read atomics only and never
/// wait on writers.
///
/// # Consistency
///
/// At any quiescent point the bucket aggregates equal the sum of live order
/// quantities per price, and the best prices equal the true best live
/// prices. While operations are in flight, a best-price read concurrent
/// with a cancel that drains the best level may return the pre-repair
/// value. The repair completes before that cancel returns.
pub struct ConcurrentOrderBook {
    config: BookConfig,
    indexer: PriceLevelIndexer,
    sides: [BookSide; 2],
    registry: OrderRegistry,
    counters: Counters,
}

impl ConcurrentOrderBook {
    /// Create an empty book over the configured price domain.
    pub fn new(config: BookConfig) -> Result<Self, BookError> {
        let indexer = PriceLevelIndexer::new(&config)?;
        debug!(
            min_price = %config.min_price,
            max_price = %config.max_price,
            level_count = config.level_count,
            "order book created"
        );
        Ok(Self {
            config,
            indexer,
            sides: [
                BookSide::new(Side::Buy, config.level_count),
                BookSide::new(Side::Sell, config.level_count),
            ],
            registry: OrderRegistry::new(),
            counters: Counters::default(),
        })
    }

    #[inline(always)]
    fn side(&self, side: Side) -> &BookSide {
        &self.sides[side.index()]
    }

    #[inline(always)]
    fn reject(&self, err: BookError) -> BookError {
        self.counters.rejects.fetch_add(1, Ordering::Relaxed);
        trace!(error = %err, "rejected");
        err
    }

    /// Add a resting order.
    ///
    /// Once this returns `Ok`, the order is visible to queries and to
    /// cancel/modify from any thread.
    pub fn add_order(
        &self,
        id: OrderId,
        price: Price,
        quantity: Quantity,
        side: Side,
    ) -> Result<(), BookError> {
        if !quantity.is_positive() {
            return Err(self.reject(BookError::InvalidQuantity { quantity }));
        }
        let slot = self.indexer.slot(price).map_err(|e| self.reject(e))?;
        let book_side = self.side(side);

        self.registry
            .register(Order::new(id, side, price, slot, quantity), |order| {
                book_side.levels[slot].insert(order.id, quantity);
                // After the aggregate bump; `BestPriceTracker::repair` relies on it.
                book_side.best.improve(price);
            })
            .map_err(|e| self.reject(e))?;

        self.counters.adds.fetch_add(1, Ordering::Relaxed);
        trace!(order = %id, %side, %price, %quantity, "order added");
        Ok(())
    }

    /// Cancel a live order, returning its final state.
    ///
    /// Of two racing cancels of the same id, exactly one succeeds and the
    /// other gets `NotFound`.
    pub fn cancel_order(&self, id: OrderId) -> Result<OrderInfo, BookError> {
        let order = self
            .registry
            .unregister(id)
            .ok_or_else(|| self.reject(BookError::NotFound(id)))?;
        let info = order.info();
        let book_side = self.side(order.side);

        let removed = book_side.levels[order.slot].remove(order.id, info.quantity);
        debug_assert!(removed, "registered order {id} missing from its bucket");

        if book_side.best.repair(&book_side.levels, &self.indexer) {
            self.counters.recomputes.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.cancels.fetch_add(1, Ordering::Relaxed);
        trace!(order = %id, side = %info.side, price = %info.price, "order cancelled");
        Ok(info)
    }

    /// Replace the quantity of a live order.
    ///
    /// The bucket aggregate moves by exactly `new - old`, where `old` is the
    /// value this call displaced. Concurrent modifies of the same id chain
    /// through the atomic exchange, so no delta is lost or applied twice.
    pub fn modify_order(&self, id: OrderId, new_quantity: Quantity) -> Result<(), BookError> {
        if !new_quantity.is_positive() {
            return Err(self.reject(BookError::InvalidQuantity { quantity: new_quantity }));
        }

        let old = self
            .registry
            .with_order(id, |order| {
                let old = order.swap_quantity(new_quantity);
                self.side(order.side).levels[order.slot].apply_delta(new_quantity - old);
                old
            })
            .ok_or_else(|| self.reject(BookError::NotFound(id)))?;

        self.counters.modifies.fetch_add(1, Ordering::Relaxed);
        trace!(order = %id, from = %old, to = %new_quantity, "order modified");
        Ok(())
    }

    /// Highest live bid, `None` when there are no bids.
    #[inline(always)]
    pub fn best_bid(&self) -> Option<Price> {
        self.side(Side::Buy).best.get()
    }

    /// Lowest live ask, `None` when there are no asks.
    #[inline(always)]
    pub fn best_ask(&self) -> Option<Price> {
        self.side(Side::Sell).best.get()
    }

    /// Best ask minus best bid, if both exist and the book is not crossed.
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    /// Midpoint of the best prices, or the one best price that exists.
    pub fn midpoint(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(Price(bid.0 + (ask.0 - bid.0) / 2)),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }

    /// Aggregate live quantity at exactly `price`. Zero for empty or
    /// out-of-range prices.
    #[inline]
    pub fn quantity_at(&self, price: Price, side: Side) -> Quantity {
        match self.indexer.slot(price) {
            Ok(slot) => self.side(side).levels[slot].total_qty(),
            Err(_) => Quantity::ZERO,
        }
    }

    /// Ids of live orders at exactly `price`, newest first.
    pub fn orders_at(&self, price: Price, side: Side) -> Vec<OrderId> {
        match self.indexer.slot(price) {
            Ok(slot) => self.side(side).levels[slot].order_ids(),
            Err(_) => Vec::new(),
        }
    }

    /// Up to `max_levels` (capped at [`MAX_DEPTH`]) non-empty levels from the
    /// best price outward.
    pub fn depth(&self, side: Side, max_levels: usize) -> ArrayVec<LevelSummary, MAX_DEPTH> {
        let mut out = ArrayVec::new();
        let want = max_levels.min(MAX_DEPTH);
        let book_side = self.side(side);

        let start = match book_side.best.get().map(|p| self.indexer.slot(p)) {
            Some(Ok(slot)) => slot,
            _ => return out,
        };

        let summary = |slot: usize| {
            let level = &book_side.levels[slot];
            let quantity = level.total_qty();
            quantity.is_positive().then(|| LevelSummary {
                price: self.indexer.price_of(slot),
                quantity,
                order_count: level.len(),
            })
        };

        let slots: Box<dyn Iterator<Item = usize>> = match side {
            Side::Buy => Box::new((0..=start).rev()),
            Side::Sell => Box::new(start..=self.indexer.last_slot()),
        };
        for level in slots.filter_map(summary).take(want) {
            out.push(level);
        }
        out
    }

    /// Current state of a live order.
    #[inline]
    pub fn get_order(&self, id: OrderId) -> Option<OrderInfo> {
        self.registry.get(id)
    }

    /// Copy of every live order. Not atomic with respect to concurrent writers.
    pub fn orders(&self) -> Vec<OrderInfo> {
        self.registry.snapshot()
    }

    /// Number of live orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    #[inline]
    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn stats(&self) -> BookStats {
        BookStats {
            adds: self.counters.adds.load(Ordering::Relaxed),
            cancels: self.counters.cancels.load(Ordering::Relaxed),
            modifies: self.counters.modifies.load(Ordering::Relaxed),
            rejects: self.counters.rejects.load(Ordering::Relaxed),
            recomputes: self.counters.recomputes.load(Ordering::Relaxed),
        }
    }
}
