//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Whole Integer Units                                      │
//! │    Prices in this system carry no minor unit at all (Rp 5.000, not     │
//! │    Rp 5.000,50), so Money is a plain u64 count of currency units.      │
//! │    Unsigned because a price or a cart total can never be negative.     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use troli_core::money::Money;
//!
//! let price = Money::from_units(15_000);
//! let line_total = price.multiply_quantity(3);
//! assert_eq!(line_total.units(), 45_000);
//! assert_eq!(line_total.to_string(), "Rp 45.000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in whole currency units.
///
/// ## Design Decisions
/// - **u64 (unsigned)**: prices and totals are non-negative by definition
/// - **Single field tuple struct**: zero-cost abstraction over u64
/// - **Transparent serde**: serializes as a bare integer on the wire,
///   matching the `price` field of product documents
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use troli_core::money::Money;
    ///
    /// let price = Money::from_units(12_500);
    /// assert_eq!(price.units(), 12_500);
    /// ```
    #[inline]
    pub const fn from_units(units: u64) -> Self {
        Money(units)
    }

    /// Returns the value in whole currency units.
    #[inline]
    pub const fn units(&self) -> u64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies money by a quantity, saturating at u64::MAX.
    ///
    /// Saturating keeps a pathological quantity from wrapping a line total
    /// back to a small number.
    ///
    /// ## Example
    /// ```rust
    /// use troli_core::money::Money;
    ///
    /// let unit_price = Money::from_units(2_500);
    /// assert_eq!(unit_price.multiply_quantity(4).units(), 10_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0.saturating_mul(qty as u64))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display renders the id-ID grouping used on receipts: "Rp 50.000".
///
/// ## Note
/// This is the format the store floor runs on. Hosts that need another
/// locale should format from `units()` themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rp {}", group_thousands(self.0))
    }
}

/// Addition of two Money values (saturating).
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

/// Summation over iterators of Money (cart totals).
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

/// Groups digits in threes with '.' separators: 1234567 -> "1.234.567".
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;

    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    grouped
}

// =============================================================================
// Unit Tests
// =============================================================================
