//! Price to bucket-slot mapping.
//!
//! Slot = `price - min_price`. Total over the configured domain, injective,
//! and defined for negative prices. Anything outside the domain is rejected
//! instead of wrapping into another price's bucket.

use crate::config::BookConfig;
use crate::error::BookError;
use crate::fixed::Price;

/// Maps prices in `[min_price, max_price]` to bucket indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceLevelIndexer {
    min_price: Price,
    max_price: Price,
}

impl PriceLevelIndexer {
    /// Build from a validated config.
    pub fn new(config: &BookConfig) -> Result<Self, BookError> {
        config.validate()?;
        Ok(Self {
            min_price: config.min_price,
            max_price: config.max_price,
        })
    }

    /// Bucket index for `price`.
    #[inline(always)]
    pub fn slot(&self, price: Price) -> Result<usize, BookError> {
        if price < self.min_price || price > self.max_price {
            return Err(BookError::OutOfRange {
                price,
                min: self.min_price,
                max: self.max_price,
            });
        }
        // In range, so the offset is non-negative and below level_count.
        Ok((price.0 - self.min_price.0) as usize)
    }

    /// Inverse of [`slot`](Self::slot).
    #[inline(always)]
    pub fn price_of(&self, slot: usize) -> Price {
        debug_assert!(slot <= self.last_slot(), "slot {slot} beyond domain");
        Price(self.min_price.0 + slot as i64)
    }

    /// Highest slot that maps to a price.
    #[inline(always)]
    pub fn last_slot(&self) -> usize {
        (self.max_price.0 - self.min_price.0) as usize
    }

    #[inline(always)]
    pub fn min_price(&self) -> Price {
        self.min_price
    }

    #[inline(always)]
    pub fn max_price(&self) -> Price {
        self.max_price
    }
}
