//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Percentage    │   │ PaymentMethodId │   │PaymentMethodInfo│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  id > 0 (i64)   │   │  id, name       │       │
//! │  │  1250 = 12.5%   │   │  0 = unset      │   │  discount       │       │
//! │  └─────────────────┘   └─────────────────┘   │  is_active      │       │
//! │                                               └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │SalePaymentRecord│   │SalePaymentRequest│      │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  persisted row  │   │  outgoing row   │       │
//! │  │  quantity       │   │  (edit flow)    │   │  (submit)       │       │
//! │  │  unit_price     │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Product catalog, payment-method catalog, and persistence are external
//! collaborators; the types here are the shapes the core exchanges with them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use ts_rs::TS;
use tracing::debug;

use crate::error::ValidationError;
use crate::money::{parse_hundredths, Money};
use crate::validation::{validate_quantity, ValidationResult};

// =============================================================================
// Percentage
// =============================================================================

/// Basis points in 100%.
pub const FULL_BPS: u32 = 10_000;

/// A discount rate in basis points (bps), clamped to `[0, 10000]`.
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1250 bps = 12.5% (a typical cash discount)
///
/// ## The 100% Boundary
/// A method discounted at 100% negates its own coverage: whatever share of
/// the subtotal it is assigned, it charges nothing. Such a method can only
/// ever carry a zero amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points, clamping above 100%.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > FULL_BPS {
            Percentage(FULL_BPS)
        } else {
            Percentage(bps)
        }
    }

    /// Creates a percentage from whole percent (`10` = 10%).
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Percentage::from_bps(percent.saturating_mul(100))
    }

    /// Parses a percentage typed as a decimal (`"12.5"` = 12.5%).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::types::Percentage;
    ///
    /// assert_eq!(Percentage::parse("12.5").unwrap().bps(), 1250);
    /// assert!(Percentage::parse("101").is_err());
    /// assert!(Percentage::parse("-1").is_err());
    /// ```
    pub fn parse(input: &str) -> ValidationResult<Percentage> {
        let bps = parse_hundredths(input, "discount")?;
        if !(0..=i64::from(FULL_BPS)).contains(&bps) {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(Percentage::from_bps(bps as u32))
    }

    /// Lenient conversion for in-flight form input: malformed or negative
    /// input becomes 0%, anything above 100 becomes 100%.
    pub fn from_input(input: &str) -> Percentage {
        match parse_hundredths(input, "discount") {
            Ok(bps) if bps <= 0 => Percentage::zero(),
            Ok(bps) => Percentage::from_bps(u32::try_from(bps).unwrap_or(FULL_BPS)),
            Err(e) => {
                debug!(input = %input, error = %e, "Clamping discount input to zero");
                Percentage::zero()
            }
        }
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Basis points left after the discount (`10000 - bps`).
    #[inline]
    pub const fn remaining_bps(&self) -> u32 {
        FULL_BPS - self.0
    }

    /// Zero discount.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// The degenerate 100% discount.
    #[inline]
    pub const fn full() -> Self {
        Percentage(FULL_BPS)
    }

    /// Checks if the discount is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the discount is the 100% boundary.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.0 == FULL_BPS
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        match self.0 % 100 {
            0 => write!(f, "{}%", whole),
            frac if frac % 10 == 0 => write!(f, "{}.{}%", whole, frac / 10),
            frac => write!(f, "{}.{:02}%", whole, frac),
        }
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u32::deserialize(deserializer).map(Percentage::from_bps)
    }
}

// =============================================================================
// Payment Method Identity
// =============================================================================

/// Identifier of a payment method in the external catalog.
///
/// The sale form uses `0` as its "nothing selected yet" sentinel; that value
/// never becomes a `PaymentMethodId`, an unset row holds `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodId(i64);

impl PaymentMethodId {
    /// Wraps a raw catalog id. Returns `None` for the unset sentinel (`<= 0`).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::types::PaymentMethodId;
    ///
    /// assert!(PaymentMethodId::new(3).is_some());
    /// assert!(PaymentMethodId::new(0).is_none());
    /// ```
    #[inline]
    pub const fn new(raw: i64) -> Option<Self> {
        if raw > 0 {
            Some(PaymentMethodId(raw))
        } else {
            None
        }
    }

    /// Returns the raw catalog id.
    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PaymentMethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A payment method as returned by the catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodInfo {
    pub id: PaymentMethodId,
    pub name: String,
    /// Discount granted when a customer pays through this method.
    pub discount: Percentage,
    /// Inactive methods stay in the catalog for history but cannot be picked.
    pub is_active: bool,
}

// =============================================================================
// Line Items and Subtotal
// =============================================================================

/// A line item supplied by the product selection UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price at the time the product was picked.
    pub unit_price: Money,
}

impl LineItem {
    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Source of a sale subtotal.
///
/// The allocation core only consumes the number; where it comes from
/// (a product picker, a persisted sale, a fixed amount) is the caller's
/// business.
pub trait SubtotalProvider {
    /// Subtotal before any payment-method discount.
    fn subtotal(&self) -> Money;

    /// Rejects a source the form must not accept. Accepts by default.
    fn check(&self) -> ValidationResult<()> {
        Ok(())
    }
}

impl SubtotalProvider for [LineItem] {
    fn subtotal(&self) -> Money {
        self.iter().map(LineItem::line_total).sum()
    }

    /// Every quantity must pass [`validate_quantity`]. An empty list is
    /// fine: the cashier may clear the basket mid-sale.
    fn check(&self) -> ValidationResult<()> {
        self.iter().try_for_each(|item| validate_quantity(item.quantity))
    }
}

impl SubtotalProvider for Money {
    fn subtotal(&self) -> Money {
        *self
    }
}

// =============================================================================
// Sale Payment Rows
// =============================================================================

/// A payment row of a persisted sale, used to seed the edit form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePaymentRecord {
    pub payment_method_id: PaymentMethodId,
    pub payment_method_name: String,
    /// Amount charged through the method (post-discount).
    pub amount: Money,
    pub discount: Percentage,
}

/// A payment row handed to the persistence layer on create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePaymentRequest {
    pub payment_method_id: PaymentMethodId,
    pub amount: Money,
    pub discount: Percentage,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_from_bps_clamps() {
        assert_eq!(Percentage::from_bps(1250).bps(), 1250);
        assert_eq!(Percentage::from_bps(20_000), Percentage::full());
        assert_eq!(Percentage::from_percent(150), Percentage::full());
    }

    #[test]
    fn test_percentage_parse() {
        assert_eq!(Percentage::parse("10").unwrap().bps(), 1000);
        assert_eq!(Percentage::parse("0.25").unwrap().bps(), 25);
        assert_eq!(Percentage::parse("100").unwrap(), Percentage::full());
        assert!(matches!(
            Percentage::parse("100.01"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            Percentage::parse("ten"),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_percentage_from_input_clamps() {
        assert_eq!(Percentage::from_input("15").bps(), 1500);
        assert_eq!(Percentage::from_input("-5"), Percentage::zero());
        assert_eq!(Percentage::from_input("250"), Percentage::full());
        assert_eq!(Percentage::from_input(""), Percentage::zero());
    }

    #[test]
    fn test_percentage_display() {
        assert_eq!(Percentage::from_percent(10).to_string(), "10%");
        assert_eq!(Percentage::from_bps(1250).to_string(), "12.5%");
        assert_eq!(Percentage::from_bps(1205).to_string(), "12.05%");
    }

    #[test]
    fn test_percentage_deserialize_clamps() {
        let pct: Percentage = serde_json::from_str("12000").unwrap();
        assert!(pct.is_full());
    }

    #[test]
    fn test_payment_method_id_sentinel() {
        assert_eq!(PaymentMethodId::new(7).map(|id| id.get()), Some(7));
        assert!(PaymentMethodId::new(0).is_none());
        assert!(PaymentMethodId::new(-1).is_none());
    }

    #[test]
    fn test_line_items_subtotal() {
        let items = vec![
            LineItem {
                product_id: 1,
                quantity: 2,
                unit_price: Money::from_cents(1250),
            },
            LineItem {
                product_id: 2,
                quantity: 3,
                unit_price: Money::from_cents(2500),
            },
        ];
        assert_eq!(items.subtotal().cents(), 10_000);
        assert_eq!(Money::from_cents(4200).subtotal().cents(), 4200);

        assert!(items.check().is_ok());
        assert!(Money::from_cents(4200).check().is_ok());
    }

    #[test]
    fn test_line_items_check_quantities() {
        let item = LineItem {
            product_id: 1,
            quantity: 999,
            unit_price: Money::from_cents(100),
        };
        assert!([item.clone()].check().is_ok());
        assert!(Vec::<LineItem>::new().check().is_ok());

        let too_many = LineItem { quantity: 1000, ..item.clone() };
        assert!(matches!(
            [item, too_many].check(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_line_item_negative_quantity_is_zero() {
        let item = LineItem {
            product_id: 1,
            quantity: -4,
            unit_price: Money::from_cents(100),
        };
        assert!(item.line_total().is_zero());
    }
}
