//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Form/engine/config failures                    │
//! │  └── ValidationError  - Input and allocation validation failures       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → caller (sale form / REST layer)   │
//! │                                                                         │
//! │  Every variant is locally recoverable: the allocation engine never     │
//! │  aborts, it clamps or reports and leaves the committed state intact.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (index, method id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::types::PaymentMethodId;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent rejected form events or configuration problems.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An event referenced a payment row that does not exist.
    ///
    /// ## When This Occurs
    /// - The UI sent an index from a stale render
    /// - A row was removed between two keystrokes
    #[error("Payment entry {index} does not exist (entries: {len})")]
    EntryIndexOutOfRange { index: usize, len: usize },

    /// The sale form must always keep at least one payment row.
    #[error("A sale needs at least one payment method row")]
    CannotRemoveLastEntry,

    /// Adding another payment row would exceed the configured maximum.
    #[error("A sale cannot have more than {max} payment methods")]
    TooManyPaymentMethods { max: usize },

    /// Payment method cannot be found in the catalog.
    ///
    /// ## User Workflow
    /// ```text
    /// Select method #7
    ///      │
    ///      ▼
    /// catalog.lookup(7) → None
    ///      │
    ///      ▼
    /// PaymentMethodNotFound(7)
    ///      │
    ///      ▼
    /// UI keeps the previous selection
    /// ```
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(PaymentMethodId),

    /// Payment method exists but has been deactivated.
    #[error("Payment method {name} ({id}) is inactive")]
    PaymentMethodInactive { id: PaymentMethodId, name: String },

    /// Configuration values are out of their allowed domain.
    #[error("Invalid allocation configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read.
    #[error("Failed to read config: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Config file is not valid TOML for `AllocationConfig`.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input or an allocation snapshot doesn't
/// meet requirements. Used for early validation and at submit time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., "12,5" typed into an amount box).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A method discounted at 100% cannot carry a positive amount:
    /// its coverage would be infinite.
    #[error("payment entry {index} has a 100% discount but a positive amount")]
    DegenerateDiscount { index: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
