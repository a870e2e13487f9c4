//! # Validation Module
//!
//! Input and allocation validation for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Sale form (presentation)                                     │
//! │  ├── Disable submit until an item and a method are picked              │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Allocation core (Rust)                                       │
//! │  ├── Clamping at the input boundary (Money / Percentage)               │
//! │  └── THIS MODULE: field rules + allocation consistency                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Persistence (external REST service)                          │
//! │  └── Its own constraints                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Hard Failures vs. Warnings
//! [`validate_allocation`] fails on things that make a sale unsubmittable and
//! only *warns* on coverage drift, which accumulates from cent rounding and
//! must never block the cashier.
//!
//! ## Usage
//! ```rust
//! use tally_core::allocation::{distribute_across_all, AllocationEntry};
//! use tally_core::money::Money;
//! use tally_core::types::{PaymentMethodId, Percentage};
//! use tally_core::validation::validate_allocation;
//!
//! let mut entries = vec![AllocationEntry::new(
//!     PaymentMethodId::new(1).unwrap(),
//!     Percentage::zero(),
//!     Money::zero(),
//! )];
//! let subtotal = Money::from_cents(2500);
//! distribute_across_all(&mut entries, subtotal);
//!
//! let report = validate_allocation(&entries, subtotal).unwrap();
//! assert!(report.is_consistent());
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::allocation::{coverage_drift_exceeds, coverage_sum, coverage_tolerance, AllocationEntry};
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::FULL_BPS;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Allocation Validation
// =============================================================================

/// `Σ coverage` sits further from the subtotal than rounding explains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CoverageDrift {
    pub expected: Money,
    pub actual: Money,
    pub tolerance: Money,
}

/// Outcome of a successful [`validate_allocation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocationReport {
    /// Set when coverage drifted past tolerance. Non-fatal.
    pub drift: Option<CoverageDrift>,
}

impl AllocationReport {
    /// True when no warning was raised.
    pub fn is_consistent(&self) -> bool {
        self.drift.is_none()
    }
}

/// Checks an allocation snapshot before it is submitted.
///
/// ## Rules
/// - At least one entry must have a payment method picked
/// - Every discount must be within `[0, 100]`
/// - A 100% discounted entry must carry a zero amount
/// - `Σ coverage` should match the subtotal within
///   [`coverage_tolerance`]; a mismatch is reported, not rejected
///
/// Amounts cannot be negative: [`Money`] clamps at construction.
pub fn validate_allocation(
    entries: &[AllocationEntry],
    subtotal: Money,
) -> ValidationResult<AllocationReport> {
    if !entries.iter().any(|e| e.method_id.is_some()) {
        return Err(ValidationError::Required {
            field: "payment_method".to_string(),
        });
    }

    for (index, entry) in entries.iter().enumerate() {
        validate_discount_bps(entry.discount.bps())?;
        if entry.is_degenerate() {
            return Err(ValidationError::DegenerateDiscount { index });
        }
    }

    let drift = coverage_drift_exceeds(entries, subtotal).then(|| CoverageDrift {
        expected: subtotal,
        actual: coverage_sum(entries),
        tolerance: coverage_tolerance(entries),
    });

    if let Some(drift) = &drift {
        warn!(
            expected = %drift.expected,
            actual = %drift.actual,
            tolerance = %drift.tolerance,
            "Payment coverage drifted from subtotal"
        );
    }

    Ok(AllocationReport { drift })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates one line item's quantity before it reaches the subtotal.
///
/// ## Rules
/// - At least one unit
/// - At most [`MAX_ITEM_QUANTITY`] units
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a discount in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > FULL_BPS {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: i64::from(FULL_BPS),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more payment row fits.
///
/// ## Rules
/// - `current_entries` must be below `max`
pub fn validate_entry_count(current_entries: usize, max: usize) -> ValidationResult<()> {
    if current_entries >= max {
        return Err(ValidationError::OutOfRange {
            field: "payment methods".to_string(),
            min: 1,
            max: max as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::distribute_across_all;
    use crate::types::{PaymentMethodId, Percentage};

    fn picked(id: i64, discount_percent: u32, amount_cents: i64) -> AllocationEntry {
        AllocationEntry {
            method_id: PaymentMethodId::new(id),
            discount: Percentage::from_percent(discount_percent),
            amount: Money::from_cents(amount_cents),
        }
    }

    #[test]
    fn test_validate_allocation_consistent() {
        let mut entries = vec![picked(1, 0, 0), picked(2, 10, 0)];
        let subtotal = Money::from_cents(10_000);
        distribute_across_all(&mut entries, subtotal);

        let report = validate_allocation(&entries, subtotal).unwrap();
        assert!(report.is_consistent());
    }

    #[test]
    fn test_validate_allocation_requires_a_method() {
        let entries = vec![AllocationEntry::unset()];
        assert_eq!(
            validate_allocation(&entries, Money::zero()),
            Err(ValidationError::Required {
                field: "payment_method".to_string()
            })
        );

        // One picked method is enough; placeholder rows are tolerated.
        let entries = vec![AllocationEntry::unset(), picked(3, 0, 500)];
        assert!(validate_allocation(&entries, Money::from_cents(500)).is_ok());
    }

    #[test]
    fn test_validate_allocation_rejects_degenerate_discount() {
        let entries = vec![picked(1, 0, 500), picked(2, 100, 1)];
        assert_eq!(
            validate_allocation(&entries, Money::from_cents(500)),
            Err(ValidationError::DegenerateDiscount { index: 1 })
        );
    }

    #[test]
    fn test_validate_allocation_warns_on_drift() {
        // $50 charged against a $100 subtotal: $50 uncovered.
        let entries = vec![picked(1, 0, 5000)];
        let report = validate_allocation(&entries, Money::from_cents(10_000)).unwrap();

        assert_eq!(
            report.drift,
            Some(CoverageDrift {
                expected: Money::from_cents(10_000),
                actual: Money::from_cents(5000),
                tolerance: Money::from_cents(1),
            })
        );
    }

    #[test]
    fn test_validate_allocation_tolerates_rounding() {
        // 3333 at 10% covers 3703.33; one cent short of 3704 is within the
        // two-cent tolerance of a 10% entry.
        let entries = vec![picked(1, 10, 3333)];
        let report = validate_allocation(&entries, Money::from_cents(3704)).unwrap();
        assert!(report.is_consistent());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_discount_bps() {
        assert!(validate_discount_bps(0).is_ok());
        assert!(validate_discount_bps(1250).is_ok());
        assert!(validate_discount_bps(10000).is_ok());
        assert!(validate_discount_bps(10001).is_err());
    }

    #[test]
    fn test_validate_entry_count() {
        assert!(validate_entry_count(0, 5).is_ok());
        assert!(validate_entry_count(4, 5).is_ok());
        assert!(validate_entry_count(5, 5).is_err());
    }
}
