//! # tally-core: Payment Allocation for Tally POS
//!
//! This crate splits a sale's subtotal across the payment methods a customer
//! uses, each of which may carry its own discount. It is pure logic: the
//! only I/O is the optional config file loader.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Sale Form (frontend)                         │   │
//! │  │   Product picker ──► Payment rows ──► Totals ──► Submit         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ FormEvent                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌──────────┐ │   │
//! │  │   │ controller │─►│ allocation │  │ validation │  │submission│ │   │
//! │  │   │   Form     │  │  Entries   │  │  Report    │  │   Plan   │ │   │
//! │  │   │  Events    │  │ Strategies │  │  Drift     │  │          │ │   │
//! │  │   └────────────┘  └────────────┘  └────────────┘  └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   money • types • config • error                                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ SalePaymentPlan                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 Sales REST service (external)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Percentage, payment method and line item types
//! - [`allocation`] - The allocation engine and its strategies
//! - [`validation`] - Field rules and allocation consistency checks
//! - [`controller`] - The sale form's event router
//! - [`submission`] - What gets sent when a sale is saved
//! - [`config`] - Strategy and limits from TOML / environment
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: amounts are cents (i64), discounts are basis points
//! 2. **Clamp at the Boundary**: negative or malformed input becomes a valid
//!    value before any arithmetic runs
//! 3. **One Writer**: each open form owns its state and commits whole lists
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::allocation::{distribute_across_all, AllocationEntry};
//! use tally_core::money::Money;
//! use tally_core::types::Percentage;
//!
//! let mut entries = vec![
//!     AllocationEntry { discount: Percentage::zero(), ..Default::default() },
//!     AllocationEntry { discount: Percentage::from_percent(10), ..Default::default() },
//! ];
//! distribute_across_all(&mut entries, Money::from_cents(10_000));
//!
//! // $50.00 by card, $45.00 in cash with its 10% discount
//! assert_eq!(entries[0].amount.cents(), 5000);
//! assert_eq!(entries[1].amount.cents(), 4500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod config;
pub mod controller;
pub mod error;
pub mod money;
pub mod submission;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use allocation::{AllocationEntry, AllocationState, AllocationStrategy};
pub use config::AllocationConfig;
pub use controller::{EditField, FormEvent, FormPhase, PaymentMethodCatalog, SaleAllocationForm};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use submission::SalePaymentPlan;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum payment methods on a single sale.
///
/// Overridable through [`AllocationConfig::max_payment_methods`].
pub const MAX_PAYMENT_METHODS: usize = 10;

/// Largest quantity a line item may carry when the form recomputes its
/// subtotal. See [`types::SubtotalProvider::check`].
pub const MAX_ITEM_QUANTITY: i64 = 999;
