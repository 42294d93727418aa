//! Fixed-point arithmetic for prices and quantities.
//!
//! Prices and quantities are signed integers in tick units. No floats
//! anywhere in the book: comparisons and ordering are exact.

use core::fmt;
use core::ops::{Add, Sub};

/// Fixed-point price in ticks.
///
/// Signed so that spreads, offsets and instruments quoted below zero
/// (calendar spreads, some energy contracts) are representable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(pub i64);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(0);

    /// Smallest representable price. Doubles as the empty-bid sentinel.
    pub const MIN: Self = Self(i64::MIN);

    /// Largest representable price. Doubles as the empty-ask sentinel.
    pub const MAX: Self = Self(i64::MAX);

    /// Create a price from a number of ticks.
    #[inline(always)]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Number of ticks.
    #[inline(always)]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Checked subtraction, `None` on overflow.
    #[inline(always)]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Saturating addition.
    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Price {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Price {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quantity in base units (shares, contracts, lots).
///
/// Signed so that modify deltas (`new - old`) are a plain quantity.
/// Resting orders always carry a strictly positive quantity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quantity(pub i64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Check if quantity is zero.
    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Valid for a resting order.
    #[inline(always)]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Get raw value.
    #[inline(always)]
    pub const fn as_raw(self) -> i64 {
        self.0
    }

    /// Saturating addition.
    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
