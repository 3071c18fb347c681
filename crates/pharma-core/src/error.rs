//! # Error Types
//!
//! Domain-specific error types for pharma-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Kinds                                     │
//! │                                                                         │
//! │  Validation errors  - rejected before any write; fix input and retry   │
//! │  ├── EmptyCart, InvalidQuantity, ProductUnavailable, Validation(..)    │
//! │  │                                                                     │
//! │  Consistency errors - a guard inside/before the transaction fired;     │
//! │  │                    retry only after re-reading current state        │
//! │  ├── InsufficientStock, StockExhausted                                 │
//! │  ├── SaleNotFound, SaleClosed, AlreadyCompleted                        │
//! │  │                                                                     │
//! │  Persistence errors - opaque infrastructure failure; the operation     │
//! │  │                    committed nothing, retry it whole                │
//! │  └── Persistence(..)                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, sale id, quantities)
//! 3. Errors are enum variants, never bare strings
//! 4. No operation is ever half-applied: every error means "nothing changed"

use thiserror::Error;

use crate::types::SaleStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule and consistency errors for the sale lifecycle engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A draft order arrived with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A draft line carried a non-positive quantity.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: i64 },

    /// Product does not exist or is archived (soft-deleted).
    #[error("Product unavailable: {product_id}")]
    ProductUnavailable { product_id: String },

    /// Point-in-time stock check at order intake failed.
    ///
    /// Stock is NOT reserved at intake; this is advisory and is re-verified
    /// by the ledger guard at checkout.
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The ledger guard fired inside a checkout transaction: applying the
    /// decrement would drive stock below zero. The whole transaction rolled
    /// back; no other line's delta was applied.
    #[error("Stock exhausted for {name}: available {available}, requested {requested}")]
    StockExhausted {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Sale id does not resolve to any sale.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Finalize was issued against a sale that is already Completed.
    #[error("Sale {0} is already completed")]
    AlreadyCompleted(String),

    /// The sale's current status forbids the requested transition.
    #[error("Sale {sale_id} is {status:?}, operation rejected")]
    SaleClosed { sale_id: String, status: SaleStatus },

    /// Storage-layer failure. Nothing was committed; retry the whole
    /// operation, do not resume it.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Field-level validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., malformed draft payload).
    #[error("{field} has invalid format: {reason}")]
    InvalidInput { field: String, reason: String },
}

// =============================================================================
// Auth Error
// =============================================================================

/// Seller authentication failures (code + PIN check).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Seller code not found")]
    UnknownCode,

    #[error("Incorrect PIN")]
    WrongPin,

    #[error("Seller is inactive")]
    Inactive,

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p1".to_string(),
            name: "Dipirona 500mg".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Dipirona 500mg: available 2, requested 5"
        );

        let err = CoreError::SaleClosed {
            sale_id: "s1".to_string(),
            status: SaleStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Sale s1 is Cancelled, operation rejected");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "seller_id".to_string(),
        };
        assert_eq!(err.to_string(), "seller_id is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
