//! # pharma-core: Pure Business Logic for Pharma POS
//!
//! This crate is the **heart** of Pharma POS. It contains all business rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Pharma POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Caller (POS front end)                       │   │
//! │  │    Product search ──► Cart ──► Checkout ──► History             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ pharma-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │ lifecycle │  │   │
//! │  │   │  Product  │  │   Money   │  │DraftOrder │  │ SaleStatus│  │   │
//! │  │   │   Sale    │  │  (cents)  │  │ DraftLine │  │ SaleEvent │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    pharma-db (Database Layer)                   │   │
//! │  │        SQLite queries, Stock Ledger, sale transactions          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleLine, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`lifecycle`] - The sale state machine (Pending/Completed/Cancelled)
//! - [`cart`] - Draft order accumulation and validation
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{DraftLine, DraftOrder};
pub use error::{AuthError, CoreError, CoreResult, ValidationError};
pub use lifecycle::{SaleEvent, TransitionDenied};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single draft order.
///
/// ## Business Reason
/// Prevents runaway carts and keeps a single checkout transaction short.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in a draft order.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum length of a free-text customer name on a sale.
pub const MAX_CUSTOMER_NAME_LEN: usize = 120;
