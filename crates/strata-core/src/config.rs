//! Book construction parameters.

use crate::error::BookError;
use crate::fixed::Price;

/// Upper bound on buckets per side (2^20).
pub const MAX_LEVELS: usize = 1 << 20;

/// Default bucket count per side.
pub const DEFAULT_LEVEL_COUNT: usize = 10_000;

/// Price domain and bucket capacity, fixed for the lifetime of a book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookConfig {
    /// Buckets allocated per side.
    pub level_count: usize,
    /// Lowest accepted price (inclusive).
    pub min_price: Price,
    /// Highest accepted price (inclusive).
    pub max_price: Price,
}

impl BookConfig {
    /// Config covering exactly `[min_price, max_price]`, one bucket per tick.
    pub fn new(min_price: Price, max_price: Price) -> Self {
        let span = max_price.0.saturating_sub(min_price.0);
        let level_count = usize::try_from(span)
            .ok()
            .and_then(|s| s.checked_add(1))
            .unwrap_or(usize::MAX);
        Self {
            level_count,
            min_price,
            max_price,
        }
    }

    /// Override the bucket count.
    pub fn with_level_count(mut self, level_count: usize) -> Self {
        self.level_count = level_count;
        self
    }

    /// Number of distinct prices in the domain, `None` if it overflows.
    pub fn span(&self) -> Option<u64> {
        let width = self.max_price.0.checked_sub(self.min_price.0)?;
        u64::try_from(width).ok()?.checked_add(1)
    }

    /// Check the invariants the indexer depends on.
    pub fn validate(&self) -> Result<(), BookError> {
        if self.min_price > self.max_price {
            return Err(BookError::InvalidConfig(format!(
                "min_price {} exceeds max_price {}",
                self.min_price, self.max_price
            )));
        }
        if self.level_count == 0 || self.level_count > MAX_LEVELS {
            return Err(BookError::InvalidConfig(format!(
                "level_count {} not in 1..={}",
                self.level_count, MAX_LEVELS
            )));
        }
        match self.span() {
            Some(span) if span <= self.level_count as u64 => Ok(()),
            _ => Err(BookError::InvalidConfig(format!(
                "price range [{}, {}] needs more than {} levels",
                self.min_price, self.max_price, self.level_count
            ))),
        }
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            level_count: DEFAULT_LEVEL_COUNT,
            min_price: Price::ZERO,
            max_price: Price(DEFAULT_LEVEL_COUNT as i64 - 1),
        }
    }
}
