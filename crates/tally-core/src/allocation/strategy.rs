//! # Allocation Strategies
//!
//! How a target coverage is split across an ordered list of entries.
//!
//! ## Strategy Comparison
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Allocation Strategy Comparison                      │
//! │                                                                         │
//! │  ORDERED SEQUENTIAL (Default)       │  PROPORTIONAL BY COVERAGE         │
//! │  ────────────────────────────       │  ─────────────────────────        │
//! │  • Walk entries in list order       │  • Weight = 1 / (1 - discount)    │
//! │  • share = remaining / entries left │  • Largest Remainder Method       │
//! │  • Last entry takes what is left    │  • 100% discount → weight 0       │
//! │  • Ignores previous amounts         │  • Ignores previous amounts       │
//! │                                                                         │
//! │  Example: $90.00 over [0%, 50%]                                        │
//! │                                                                         │
//! │  SEQUENTIAL:                        │  PROPORTIONAL (weights 1 : 2):    │
//! │  → covers  [$45, $45]               │  → covers  [$30, $60]             │
//! │  → charges [$45, $22.50]            │  → charges [$30, $30]             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both split in coverage space (whole cents of subtotal) and only then apply
//! each entry's discount, so `Σ coverage` lands on the target.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::{AllocationEntry, COVERAGE_SCALE};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::FULL_BPS;

/// The named strategy behind every distribution and redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Equal split of what remains, walking the list in order.
    #[default]
    #[serde(alias = "ordered", alias = "sequential")]
    OrderedSequential,

    /// Split in proportion to `1 / (1 - discount)`, so every method that
    /// is not fully discounted charges the same amount up to rounding.
    #[serde(alias = "proportional")]
    ProportionalByCoverage,
}

impl AllocationStrategy {
    /// Resets every entry's amount so the entries cover `subtotal`.
    ///
    /// Empty lists are left untouched.
    pub fn distribute(&self, entries: &mut [AllocationEntry], subtotal: Money) {
        if entries.is_empty() {
            return;
        }

        let amounts = self.allocate(entries, subtotal);
        for (entry, amount) in entries.iter_mut().zip(amounts) {
            entry.amount = amount;
        }

        debug!(
            strategy = %self,
            entries = entries.len(),
            subtotal = %subtotal,
            "Distributed subtotal across payment entries"
        );
    }

    /// Commits a user-typed amount on `entries[index]`, then splits the
    /// coverage it leaves over the other entries in their original order.
    ///
    /// ## Rules
    /// - Empty list: no-op, returns zero
    /// - Index past the end: `EntryIndexOutOfRange`, nothing changes
    /// - 100% discount: the typed amount is clamped to zero
    /// - Typed coverage ≥ subtotal: every other entry drops to zero
    ///
    /// Returns the amount actually committed on `entries[index]`.
    pub fn redistribute(
        &self,
        entries: &mut [AllocationEntry],
        subtotal: Money,
        index: usize,
        new_amount: Money,
    ) -> CoreResult<Money> {
        if entries.is_empty() {
            return Ok(Money::zero());
        }

        let len = entries.len();
        let edited = entries
            .get_mut(index)
            .ok_or(CoreError::EntryIndexOutOfRange { index, len })?;

        let committed = if edited.discount.is_full() && new_amount.is_positive() {
            warn!(
                index,
                requested = %new_amount,
                "Amount on a 100% discounted method clamped to zero"
            );
            Money::zero()
        } else {
            new_amount
        };
        edited.amount = committed;

        let remaining = subtotal - edited.coverage();
        let others: Vec<usize> = (0..len).filter(|&i| i != index).collect();

        if remaining.is_zero() {
            for &i in &others {
                entries[i].amount = Money::zero();
            }
        } else {
            let view: Vec<AllocationEntry> = others.iter().map(|&i| entries[i].clone()).collect();
            let amounts = self.allocate(&view, remaining);
            for (&i, amount) in others.iter().zip(amounts) {
                entries[i].amount = amount;
            }
        }

        debug!(
            strategy = %self,
            index,
            committed = %committed,
            remaining = %remaining,
            "Redistributed after manual amount edit"
        );
        Ok(committed)
    }

    /// Amounts (post-discount) that make `entries` cover `target`.
    fn allocate(&self, entries: &[AllocationEntry], target: Money) -> Vec<Money> {
        match self {
            AllocationStrategy::OrderedSequential => ordered_sequential(entries, target),
            AllocationStrategy::ProportionalByCoverage => proportional_by_coverage(entries, target),
        }
    }
}

/// Each entry but the last takes `remaining / entries_left` of coverage;
/// the last takes whatever is left. Integer division floors, so leftover
/// cents roll forward to later entries.
fn ordered_sequential(entries: &[AllocationEntry], target: Money) -> Vec<Money> {
    let count = entries.len();
    let mut remaining = target.cents();

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let share = if i + 1 == count {
                remaining
            } else {
                remaining / (count - i) as i64
            };
            remaining -= share;
            Money::from_cents(share).apply_discount(entry.discount)
        })
        .collect()
}

/// Largest Remainder Method over gross-up weights: floor every exact
/// share, then hand the leftover cents to the largest fractional parts
/// (earlier entries win ties).
///
/// Weights depend only on the discounts, never on current amounts, so a
/// freshly added row takes its share on the next distribution.
fn proportional_by_coverage(entries: &[AllocationEntry], target: Money) -> Vec<Money> {
    let weights: Vec<i128> = entries.iter().map(gross_up_weight).collect();
    let total_weight: i128 = weights.iter().sum();

    if total_weight == 0 {
        return ordered_sequential(entries, target);
    }

    let target_cents = i128::from(target.cents());
    let mut shares: Vec<i128> = Vec::with_capacity(entries.len());
    let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(entries.len());
    for (i, weight) in weights.iter().enumerate() {
        let exact = target_cents * weight;
        shares.push(exact / total_weight);
        remainders.push((i, exact % total_weight));
    }

    let allocated: i128 = shares.iter().sum();
    let leftover = usize::try_from(target_cents - allocated).unwrap_or(0);

    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    for &(i, _) in remainders.iter().take(leftover) {
        shares[i] += 1;
    }

    entries
        .iter()
        .zip(shares)
        .map(|(entry, share)| {
            Money::from_cents(i64::try_from(share).unwrap_or(i64::MAX)).apply_discount(entry.discount)
        })
        .collect()
}

/// `1 / (1 - discount)` in fixed point; zero at the 100% boundary.
fn gross_up_weight(entry: &AllocationEntry) -> i128 {
    let remaining = i128::from(entry.discount.remaining_bps());
    if remaining == 0 {
        return 0;
    }
    i128::from(FULL_BPS) * COVERAGE_SCALE / remaining
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationStrategy::OrderedSequential => write!(f, "ordered_sequential"),
            AllocationStrategy::ProportionalByCoverage => write!(f, "proportional_by_coverage"),
        }
    }
}

impl std::str::FromStr for AllocationStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ordered" | "ordered_sequential" | "sequential" => {
                Ok(AllocationStrategy::OrderedSequential)
            }
            "proportional" | "proportional_by_coverage" => {
                Ok(AllocationStrategy::ProportionalByCoverage)
            }
            other => Err(CoreError::InvalidConfig(format!(
                "Unknown allocation strategy: '{}'. Valid options: ordered_sequential, proportional_by_coverage",
                other
            ))),
        }
    }
}
