//! # Sale Submission
//!
//! Flattens the allocation into what the persistence layer receives when a
//! sale is created or updated.
//!
//! ```text
//!   entries (form)                         SalePaymentPlan
//!   ───────────────────────────            ─────────────────────────────
//!   [#1, 0%,  $50.00]           ──►        payment_methods:
//!   [--, 0%,  $0.00 ] (dropped)              #1  $50.00   0%
//!   [#2, 10%, $45.00]                        #2  $45.00  10%
//!                                          total_price:    $95.00
//!                                          total_discount:  $5.00
//!                                          subtotal:      $100.00
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::allocation::{final_total, total_discount, AllocationEntry};
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::SalePaymentRequest;
use crate::validation::{validate_allocation, CoverageDrift, ValidationResult};

/// The payment part of a sale create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePaymentPlan {
    /// One row per picked payment method, in form order.
    pub payment_methods: Vec<SalePaymentRequest>,
    /// What is actually collected: `Σ amount`.
    pub total_price: Money,
    pub total_discount: Money,
    pub subtotal: Money,
    /// Coverage drift found while validating. The sale is still accepted.
    pub drift: Option<CoverageDrift>,
}

impl SalePaymentPlan {
    /// Builds the plan from the form's entries.
    ///
    /// ## Rules
    /// - Rows with no method and no amount are placeholders and are dropped
    /// - A row with no method but a positive amount is rejected
    /// - At least one row must remain
    /// - The remaining rows must pass [`validate_allocation`]
    pub fn from_entries(entries: &[AllocationEntry], subtotal: Money) -> ValidationResult<Self> {
        let mut kept: Vec<AllocationEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.method_id {
                Some(_) => kept.push(entry.clone()),
                None if entry.amount.is_zero() => {}
                None => {
                    return Err(ValidationError::Required {
                        field: "payment_method".to_string(),
                    })
                }
            }
        }

        // Fails with `Required` when nothing was kept.
        let report = validate_allocation(&kept, subtotal)?;

        let payment_methods: Vec<SalePaymentRequest> = kept
            .iter()
            .filter_map(|entry| {
                entry.method_id.map(|payment_method_id| SalePaymentRequest {
                    payment_method_id,
                    amount: entry.amount,
                    discount: entry.discount,
                })
            })
            .collect();

        let plan = SalePaymentPlan {
            payment_methods,
            total_price: final_total(&kept),
            total_discount: total_discount(&kept),
            subtotal,
            drift: report.drift,
        };

        debug!(
            methods = plan.payment_methods.len(),
            total_price = %plan.total_price,
            total_discount = %plan.total_discount,
            drifted = plan.drift.is_some(),
            "Built sale payment plan"
        );
        Ok(plan)
    }
}
