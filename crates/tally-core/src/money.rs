//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A sale form that recomputes payment splits on every keystroke:         │
//! │    100 / 3 = 33.333333333333336  ❌ drifts on each redistribution       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10000 cents / 3 = 3333 cents, remainder rolls to the next entry     │
//! │    Every cent of the subtotal is accounted for, exactly               │
//! │                                                                         │
//! │  Decimal strings only exist at the I/O boundary (form inputs).         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Non-negative by Construction
//! A charged amount can never be below zero. Every constructor clamps and
//! subtraction saturates at zero, so a negative, infinite, or NaN amount is
//! unrepresentable.
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // $10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                    // $21.98
//! let total = price + Money::from_cents(500); // $15.99
//!
//! // Subtraction never goes negative
//! assert!((Money::from_cents(100) - price).is_zero());
//!
//! // Form input is parsed, never converted from floats
//! assert_eq!(Money::parse("10.99").unwrap(), price);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;
use tracing::debug;

use crate::error::ValidationError;
use crate::types::Percentage;
use crate::validation::ValidationResult;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a non-negative monetary value in the smallest currency unit
/// (cents for USD).
///
/// ## Design Decisions
/// - **i64 storage, clamped at zero**: matches the persisted integer columns
///   while keeping the `amount >= 0` invariant structural
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serde**: serializes as plain cents; deserializing a negative number
///   clamps to zero
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  LineItem.unit_price × quantity ──► subtotal                           │
/// │                                       │                                 │
/// │                                       ▼                                 │
/// │               AllocationEntry.amount (charged per method)              │
/// │                                       │                                 │
/// │                                       ▼                                 │
/// │               final_total ──► SalePaymentPlan.total_price              │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents. Negative input clamps to zero.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).cents(), 1099);
    /// assert_eq!(Money::from_cents(-5).cents(), 0);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        if cents < 0 {
            Money(0)
        } else {
            Money(cents)
        }
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        Money::from_cents(major.saturating_mul(100).saturating_add(minor))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        self.0 % 100
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

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parses a decimal amount typed by a user or read from a request.
    ///
    /// ## Rules
    /// - Surrounding whitespace is ignored, a leading `+` is allowed
    /// - `.` is the only decimal separator
    /// - More than two fractional digits round half-up to the cent
    /// - Negative values are rejected
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::parse("12.5").unwrap().cents(), 1250);
    /// assert_eq!(Money::parse("33.335").unwrap().cents(), 3334);
    /// assert!(Money::parse("-1").is_err());
    /// assert!(Money::parse("abc").is_err());
    /// ```
    pub fn parse(input: &str) -> ValidationResult<Money> {
        let hundredths = parse_hundredths(input, "amount")?;
        if hundredths < 0 {
            return Err(ValidationError::MustBeNonNegative {
                field: "amount".to_string(),
            });
        }
        Ok(Money::from_cents(hundredths))
    }

    /// Lenient conversion for in-flight form input.
    ///
    /// Anything that is not a non-negative decimal becomes zero, so the
    /// allocation engine only ever sees valid amounts.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_input("8").cents(), 800);
    /// assert!(Money::from_input("").is_zero());
    /// assert!(Money::from_input("-3").is_zero());
    /// assert!(Money::from_input("NaN").is_zero());
    /// ```
    pub fn from_input(input: &str) -> Money {
        Money::parse(input).unwrap_or_else(|e| {
            debug!(input = %input, error = %e, "Clamping amount input to zero");
            Money::zero()
        })
    }

    /// Renders the value as a plain decimal (`"10.99"`) for the I/O boundary.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.dollars(), self.cents_part())
    }

    /// Multiplies money by a quantity. Non-positive quantities yield zero.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money::from_cents(self.0.saturating_mul(qty))
    }

    /// Applies a percentage discount and returns the discounted amount.
    ///
    /// The discount itself is rounded half-up to the cent, then subtracted.
    /// A 100% discount always yields zero.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::Percentage;
    ///
    /// let share = Money::from_cents(5000); // $50.00
    /// let charged = share.apply_discount(Percentage::from_percent(10));
    /// assert_eq!(charged.cents(), 4500); // $45.00
    /// ```
    pub fn apply_discount(&self, discount: Percentage) -> Money {
        // Use i128 to prevent overflow on large amounts
        let discount_amount = (self.0 as i128 * discount.bps() as i128 + 5000) / 10000;
        Money::from_cents(self.0 - discount_amount as i64)
    }

    /// Inverse of [`Money::apply_discount`]: the pre-discount value that a
    /// charged amount accounts for.
    ///
    /// Returns `None` at the 100% boundary, where the inverse is undefined.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::Percentage;
    ///
    /// let charged = Money::from_cents(4500);
    /// let covered = charged.gross_up(Percentage::from_percent(10));
    /// assert_eq!(covered, Some(Money::from_cents(5000)));
    /// assert_eq!(charged.gross_up(Percentage::full()), None);
    /// ```
    pub fn gross_up(&self, discount: Percentage) -> Option<Money> {
        let denominator = discount.remaining_bps() as i128;
        if denominator == 0 {
            return None;
        }
        // Round half-up: (2·x·10000 + d) / 2d
        let cents = (self.0 as i128 * 20_000 + denominator) / (2 * denominator);
        Some(Money::from_cents(i64::try_from(cents).unwrap_or(i64::MAX)))
    }
}

// =============================================================================
// Decimal Parsing
// =============================================================================

/// Parses a signed decimal into hundredths (cents for money, basis points
/// for percentages). Digits past the second decimal round half-up.
pub(crate) fn parse_hundredths(input: &str, field: &str) -> ValidationResult<i64> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = input.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("expected a number"));
    }

    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return Err(invalid("expected digits with an optional '.' separator"));
    }

    let push_digit = |acc: i64, digit: i64| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| invalid("value is too large"))
    };
    let digit_of = |c: char| i64::from(c.to_digit(10).unwrap_or(0));

    let mut value = 0i64;
    for c in whole.chars() {
        value = push_digit(value, digit_of(c))?;
    }

    let mut fraction_digits = fraction.chars().map(digit_of);
    for _ in 0..2 {
        value = push_digit(value, fraction_digits.next().unwrap_or(0))?;
    }
    if fraction_digits.next().is_some_and(|d| d >= 5) {
        value = value
            .checked_add(1)
            .ok_or_else(|| invalid("value is too large"))?;
    }

    Ok(if negative { -value } else { value })
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. Use frontend formatting for actual UI
/// display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Money::from_cents)
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

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Subtraction of two Money values, floored at zero.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money::from_cents(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        self.multiply_quantity(qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
