//! Incremental best-bid / best-ask tracking.
//!
//! Inserts move the best toward the new price with an atomic max/min and
//! never regress it. When the level holding the best drains, the side is
//! rescanned from the bucket aggregates. That is O(levels) and only happens
//! on exhaustion of the best level.
//!
//! All best-price and aggregate accesses are `SeqCst`. An insert bumps its
//! aggregate before it raises the best, and a repair re-scans after it
//! publishes. Together these guarantee that a level going live during a
//! repair is either seen by the re-scan or raises the best itself.

use core::sync::atomic::{AtomicI64, Ordering};

use tracing::debug;

use crate::fixed::Price;
use crate::index::PriceLevelIndexer;
use crate::level::PriceLevelBucket;
use crate::order::Side;

/// Best price for one side of the book.
pub struct BestPriceTracker {
    side: Side,
    price: AtomicI64,
}

impl BestPriceTracker {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            price: AtomicI64::new(Self::sentinel_for(side)),
        }
    }

    /// `-inf` for bids, `+inf` for asks.
    #[inline(always)]
    const fn sentinel_for(side: Side) -> i64 {
        match side {
            Side::Buy => i64::MIN,
            Side::Sell => i64::MAX,
        }
    }

    #[inline(always)]
    fn sentinel(&self) -> i64 {
        Self::sentinel_for(self.side)
    }

    /// Current best, `None` when the side is empty.
    #[inline(always)]
    pub fn get(&self) -> Option<Price> {
        let raw = self.price.load(Ordering::SeqCst);
        (raw != self.sentinel()).then_some(Price(raw))
    }

    /// Move the best toward `price` if `price` is better.
    #[inline(always)]
    pub fn improve(&self, price: Price) {
        match self.side {
            Side::Buy => self.price.fetch_max(price.0, Ordering::SeqCst),
            Side::Sell => self.price.fetch_min(price.0, Ordering::SeqCst),
        };
    }

    /// Recompute the best if its level no longer holds quantity.
    ///
    /// Returns `true` if a rescan was published. Cheap when the best level
    /// is still live: one load of the best and one of its aggregate.
    pub fn repair(&self, levels: &[PriceLevelBucket], indexer: &PriceLevelIndexer) -> bool {
        let mut recomputed = false;
        loop {
            let current = self.price.load(Ordering::SeqCst);
            if current == self.sentinel() {
                return recomputed;
            }
            // The tracker only ever holds in-range prices or the sentinel.
            let slot = match indexer.slot(Price(current)) {
                Ok(slot) => slot,
                Err(_) => {
                    debug_assert!(false, "best price {current} outside domain");
                    return recomputed;
                }
            };
            if !levels[slot].is_empty() {
                return recomputed;
            }

            let candidate = self.scan(levels, indexer).map_or(self.sentinel(), |p| p.0);
            if self
                .price
                .compare_exchange(current, candidate, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                recomputed = true;
                debug!(side = %self.side, from = current, to = candidate, "best price recomputed");
                // Pick up any level that went live behind the first scan.
                if let Some(p) = self.scan(levels, indexer) {
                    self.improve(p);
                }
            }
            // Loop to validate whatever is now published.
        }
    }

    /// Best live price by bucket aggregates, walking from the top of book.
    pub fn scan(&self, levels: &[PriceLevelBucket], indexer: &PriceLevelIndexer) -> Option<Price> {
        let last = indexer.last_slot().min(levels.len().saturating_sub(1));
        let slot = match self.side {
            Side::Buy => (0..=last).rev().find(|&i| !levels[i].is_empty()),
            Side::Sell => (0..=last).find(|&i| !levels[i].is_empty()),
        }?;
        Some(indexer.price_of(slot))
    }
}
