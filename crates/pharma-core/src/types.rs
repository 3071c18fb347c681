//! # Domain Types
//!
//! Core domain types used throughout Pharma POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  status         │   │  sale_id (FK)   │       │
//! │  │  price_cents    │   │  total_cents    │   │  product_id(FK) │       │
//! │  │  stock          │◄──┼─ seller_id      │   │  quantity       │       │
//! │  │  is_active      │   │  payment_method │   │  price snapshot │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   SaleStatus    │   │ PaymentMethod   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  Pending        │   │  Cash  Pix      │                             │
//! │  │  Completed      │   │  Debit Credit   │                             │
//! │  │  Cancelled      │   └─────────────────┘                             │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `SaleLine` freezes the product's name and unit price at order intake.
//! Catalog edits after that point never change what was sold or for how much.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product (the pharmacy calls these "medicamentos", but any
/// sellable item lives here).
///
/// ## Stock Invariant
/// `stock >= 0` at all observable times. The only code allowed to change it
/// for sale-driven reasons is the Stock Ledger in pharma-db; administrative
/// edits go through the catalog repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the operator and on receipts.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Unit price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Current stock level. Never negative.
    pub stock: i64,

    /// Category label (e.g. "MEDICAMENTO", "HIGIENE").
    pub category: String,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Point-in-time sellability check used at order intake.
    ///
    /// This is advisory only: the authoritative check happens again inside
    /// the checkout transaction, where it cannot race with other sales.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity > 0 && self.stock >= quantity
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// Transitions are governed by [`crate::lifecycle`]; nothing else in the
/// system writes a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Created by order intake, awaiting checkout. No stock reserved.
    Pending,
    /// Paid and finalized. Stock has been decremented.
    Completed,
    /// Closed without effect (from Pending) or refunded (from Completed).
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Accepted payment methods, recorded on the sale at checkout time only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Instant bank transfer (Pix).
    Pix,
    /// Debit card.
    Debit,
    /// Credit card.
    Credit,
}

// =============================================================================
// Sale
// =============================================================================

/// A customer order progressing through Pending → Completed/Cancelled.
///
/// ## Total Invariant
/// `total_cents` equals the sum of `quantity × unit_price_cents` over the
/// sale's lines, fixed at intake and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub status: SaleStatus,
    /// Optional free-text customer name.
    pub customer_name: Option<String>,
    /// Opaque reference to the authenticated seller who took the order.
    pub seller_id: String,
    /// Sum of line subtotals at creation time. Never recalculated.
    pub total_cents: i64,
    /// Set exactly once, by checkout. None while Pending.
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One product-quantity-price entry within a sale.
///
/// Immutable after creation: a correction requires cancelling and
/// re-creating the sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Quantity sold. Always positive.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line subtotal (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price() * self.quantity
    }
}

/// A sale together with its owned lines, as read-side projections return it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleWithLines {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

// =============================================================================
// Seller
// =============================================================================

/// A system user who can be attached to sales as the seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Seller {
    pub id: String,
    pub name: String,
    /// Short operator code typed at the terminal.
    pub code: String,
    /// Numeric PIN typed together with the code at the terminal.
    pub pin: String,
    /// Role label ("ADMIN" or "USER").
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The identity handed back by a successful authentication. The core treats
/// `id` as an opaque foreign key on Sale and does no further authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerIdentity {
    pub id: String,
    pub name: String,
    pub code: String,
}

impl From<&Seller> for SellerIdentity {
    fn from(seller: &Seller) -> Self {
        SellerIdentity {
            id: seller.id.clone(),
            name: seller.name.clone(),
            code: seller.code.clone(),
        }
    }
}

// =============================================================================
// Product Deletion Outcome
// =============================================================================

/// Result of a catalog delete request.
///
/// Deletion is a tagged-variant decision made at delete time: products
/// referenced by sale history are archived (soft delete), never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Physically deleted: no sale line ever referenced the product.
    Removed,
    /// Soft-deleted (`is_active = false`): sale history references it.
    Archived,
}

// =============================================================================
// Audit Log
// =============================================================================

/// What kind of change an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Sale,
    Error,
}

/// Which entity an audit entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditEntity {
    User,
    Product,
    Sale,
    System,
}

/// An append-only audit log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEntry {
    pub id: String,
    pub action: AuditAction,
    pub entity: AuditEntity,
    pub entity_id: Option<String>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64, active: bool) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            name: "Dipirona 500mg".to_string(),
            description: None,
            price_cents: 1250,
            stock,
            category: "MEDICAMENTO".to_string(),
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_can_sell() {
        assert!(product(10, true).can_sell(3));
        assert!(product(10, true).can_sell(10));
        assert!(!product(10, true).can_sell(11));
        assert!(!product(10, true).can_sell(0));
        assert!(!product(10, false).can_sell(1));
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Pending);
    }

    #[test]
    fn test_line_total() {
        let now = Utc::now();
        let line = SaleLine {
            id: "l1".to_string(),
            sale_id: "s1".to_string(),
            product_id: "p1".to_string(),
            name_snapshot: "Dipirona 500mg".to_string(),
            quantity: 3,
            unit_price_cents: 1250,
            created_at: now,
        };
        assert_eq!(line.line_total().cents(), 3750);
    }

    #[test]
    fn test_seller_identity_strips_pin() {
        let seller = Seller {
            id: "u1".to_string(),
            name: "Maria".to_string(),
            code: "V01".to_string(),
            pin: "1234".to_string(),
            role: "USER".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        let identity = SellerIdentity::from(&seller);
        assert_eq!(identity.code, "V01");
        // identity carries no pin field at all
    }
}
