//! # Payment Allocation
//!
//! Splits a sale subtotal across the payment methods a customer uses.
//!
//! ## Coverage vs. Amount
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Subtotal $100.00, two methods: Card (0%), Cash (10% discount)         │
//! │                                                                         │
//! │   Card  ── covers $50.00 ── charges $50.00                              │
//! │   Cash  ── covers $50.00 ── charges $45.00  (10% off its coverage)      │
//! │            ───────────             ───────                              │
//! │            $100.00 = subtotal      $95.00 = final total                 │
//! │                                                                         │
//! │  amount   = what the customer pays through the method                  │
//! │  coverage = amount / (1 - discount) = share of the subtotal it settles │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Every `amount` is a [`Money`], so never negative, infinite, or NaN
//! - `Σ coverage == subtotal` after [`distribute_across_all`], up to one
//!   cent of charged amount per entry (see [`coverage_tolerance`])
//! - Entry order is significant and preserved by every operation
//!
//! The engine is pure: functions take the entries and the new value as
//! explicit arguments and never read ambient state.

mod strategy;

pub use strategy::AllocationStrategy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{PaymentMethodId, Percentage, SalePaymentRecord, FULL_BPS};

/// Fixed-point scale used when summing coverage for drift checks.
const COVERAGE_SCALE: i128 = 10_000;

// =============================================================================
// Allocation Entry
// =============================================================================

/// One payment method's row in a sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocationEntry {
    /// `None` until a method is picked in the form.
    pub method_id: Option<PaymentMethodId>,
    pub discount: Percentage,
    /// Charged through this method, after its discount.
    pub amount: Money,
}

impl AllocationEntry {
    /// Creates an entry for a picked method.
    pub fn new(method_id: PaymentMethodId, discount: Percentage, amount: Money) -> Self {
        AllocationEntry {
            method_id: Some(method_id),
            discount,
            amount,
        }
    }

    /// The placeholder row a new sale form starts with.
    pub fn unset() -> Self {
        AllocationEntry::default()
    }

    /// Portion of the subtotal this entry accounts for before its discount.
    ///
    /// At the 100% boundary coverage is defined as zero. A positive amount
    /// there is an invalid combination the engine never produces, and it
    /// is reported by validation rather than computed.
    pub fn coverage(&self) -> Money {
        self.amount.gross_up(self.discount).unwrap_or_default()
    }

    /// What the discount saved on this entry (`coverage - amount`).
    pub fn discount_amount(&self) -> Money {
        self.coverage() - self.amount
    }

    /// True for the invalid "100% discount, positive amount" combination.
    pub fn is_degenerate(&self) -> bool {
        self.discount.is_full() && self.amount.is_positive()
    }

    /// Coverage in `1 / COVERAGE_SCALE` cents, without intermediate rounding.
    fn scaled_coverage(&self) -> i128 {
        let denominator = i128::from(self.discount.remaining_bps());
        if denominator == 0 {
            return 0;
        }
        i128::from(self.amount.cents()) * i128::from(FULL_BPS) * COVERAGE_SCALE / denominator
    }
}

impl From<&SalePaymentRecord> for AllocationEntry {
    fn from(record: &SalePaymentRecord) -> Self {
        AllocationEntry::new(record.payment_method_id, record.discount, record.amount)
    }
}

// =============================================================================
// Allocation State
// =============================================================================

/// The allocation snapshot owned by one open sale form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AllocationState {
    pub subtotal: Money,
    pub entries: Vec<AllocationEntry>,
    /// When the form was opened.
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
}

impl AllocationState {
    /// State for a new sale: one unset entry, nothing charged.
    pub fn new_sale() -> Self {
        AllocationState {
            subtotal: Money::zero(),
            entries: vec![AllocationEntry::unset()],
            opened_at: Utc::now(),
        }
    }

    /// State for editing a persisted sale: one entry per payment record,
    /// amounts kept exactly as stored.
    pub fn from_records(subtotal: Money, records: &[SalePaymentRecord]) -> Self {
        let mut entries: Vec<AllocationEntry> = records.iter().map(AllocationEntry::from).collect();
        if entries.is_empty() {
            entries.push(AllocationEntry::unset());
        }
        AllocationState {
            subtotal,
            entries,
            opened_at: Utc::now(),
        }
    }

    /// Sum of charged amounts; the sale's total price.
    pub fn final_total(&self) -> Money {
        final_total(&self.entries)
    }

    /// Sum of what every method's discount saved.
    pub fn total_discount(&self) -> Money {
        total_discount(&self.entries)
    }

    /// Sum of coverage across entries.
    pub fn coverage_sum(&self) -> Money {
        coverage_sum(&self.entries)
    }
}

// =============================================================================
// Engine Operations
// =============================================================================

/// Resets every amount from the subtotal and the current discounts, using
/// the ordered-sequential split.
///
/// ## Example
/// ```rust
/// use tally_core::allocation::{distribute_across_all, AllocationEntry};
/// use tally_core::money::Money;
/// use tally_core::types::Percentage;
///
/// let mut entries = vec![
///     AllocationEntry { discount: Percentage::zero(), ..Default::default() },
///     AllocationEntry { discount: Percentage::from_percent(10), ..Default::default() },
/// ];
/// distribute_across_all(&mut entries, Money::from_cents(10_000));
///
/// assert_eq!(entries[0].amount.cents(), 5000);
/// assert_eq!(entries[1].amount.cents(), 4500);
/// ```
pub fn distribute_across_all(entries: &mut [AllocationEntry], subtotal: Money) {
    AllocationStrategy::OrderedSequential.distribute(entries, subtotal);
}

/// Pins `entries[index]` to a user-typed amount and re-splits whatever
/// coverage is left over the other entries, using the ordered-sequential
/// split. Returns the amount actually committed.
///
/// ## Example
/// ```rust
/// use tally_core::allocation::{redistribute_after_manual_edit, AllocationEntry};
/// use tally_core::money::Money;
/// use tally_core::types::Percentage;
///
/// let mut entries = vec![
///     AllocationEntry { amount: Money::from_cents(5000), ..Default::default() },
///     AllocationEntry {
///         discount: Percentage::from_percent(10),
///         amount: Money::from_cents(4500),
///         ..Default::default()
///     },
/// ];
/// let subtotal = Money::from_cents(10_000);
/// redistribute_after_manual_edit(&mut entries, subtotal, 0, Money::from_cents(8000)).unwrap();
///
/// assert_eq!(entries[0].amount.cents(), 8000);
/// assert_eq!(entries[1].amount.cents(), 1800);
/// ```
pub fn redistribute_after_manual_edit(
    entries: &mut [AllocationEntry],
    subtotal: Money,
    index: usize,
    new_amount: Money,
) -> CoreResult<Money> {
    AllocationStrategy::OrderedSequential.redistribute(entries, subtotal, index, new_amount)
}

/// The amount actually collected: `Σ amount`.
pub fn final_total(entries: &[AllocationEntry]) -> Money {
    entries.iter().map(|e| e.amount).sum()
}

/// `Σ (coverage - amount)` over all entries.
pub fn total_discount(entries: &[AllocationEntry]) -> Money {
    entries.iter().map(AllocationEntry::discount_amount).sum()
}

/// `Σ coverage`, rounded to the cent.
pub fn coverage_sum(entries: &[AllocationEntry]) -> Money {
    let scaled: i128 = entries.iter().map(AllocationEntry::scaled_coverage).sum();
    let cents = (scaled + COVERAGE_SCALE / 2) / COVERAGE_SCALE;
    Money::from_cents(i64::try_from(cents).unwrap_or(i64::MAX))
}

/// How far `Σ coverage` may sit from the subtotal without being reported.
///
/// Amounts are whole cents, so each entry's coverage is only known to within
/// one cent of charged amount, grossed up by its discount:
/// `ceil(10000 / (10000 - bps))` cents. With no discounts this is one cent
/// per entry.
pub fn coverage_tolerance(entries: &[AllocationEntry]) -> Money {
    let cents: i64 = entries
        .iter()
        .filter(|e| !e.discount.is_full())
        .map(|e| {
            let remaining = i64::from(e.discount.remaining_bps());
            (i64::from(FULL_BPS) + remaining - 1) / remaining
        })
        .sum();
    Money::from_cents(cents)
}

/// Whether `|Σ coverage - subtotal|` exceeds [`coverage_tolerance`],
/// compared at `1 / COVERAGE_SCALE` cent precision.
pub(crate) fn coverage_drift_exceeds(entries: &[AllocationEntry], subtotal: Money) -> bool {
    let covered: i128 = entries.iter().map(AllocationEntry::scaled_coverage).sum();
    let expected = i128::from(subtotal.cents()) * COVERAGE_SCALE;
    let tolerance = i128::from(coverage_tolerance(entries).cents()) * COVERAGE_SCALE;
    (covered - expected).abs() > tolerance
}

// =============================================================================
// Unit Tests
// =============================================================================
