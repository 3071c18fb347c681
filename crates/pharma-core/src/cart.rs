//! # Cart Builder
//!
//! Client-side accumulation of products into a draft order.
//!
//! ## Ownership of the Draft
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Draft Order Flow                                  │
//! │                                                                         │
//! │  Operator scans/picks products                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DraftOrder::add_line() ──► merges duplicates, caps quantity           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DraftOrder::validate() ──► EmptyCart / InvalidQuantity / field rules  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pharma-db create_order() ─► persists Sale{Pending} + lines atomically │
//! │                                                                         │
//! │  The draft is in-memory only. Nothing is persisted and NO stock is     │
//! │  reserved until intake, and even then stock only moves at checkout.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::validation::{validate_customer_name, validate_quantity};
use crate::MAX_CART_LINES;

// =============================================================================
// Draft Line
// =============================================================================

/// One requested product-quantity pair in a draft order.
///
/// Carries no price: prices are snapshotted by order intake from the catalog
/// at that moment, never trusted from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DraftLine {
    pub product_id: String,
    pub quantity: i64,
}

// =============================================================================
// Draft Order
// =============================================================================

/// A not-yet-persisted order draft, built up at the terminal.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product again
///   increases the quantity)
/// - At most [`MAX_CART_LINES`] lines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DraftOrder {
    /// The authenticated seller taking the order.
    pub seller_id: String,
    /// Optional free-text customer name for the receipt.
    #[serde(default)]
    pub customer_name: Option<String>,
    pub lines: Vec<DraftLine>,
}

impl DraftOrder {
    /// Creates an empty draft for the given seller.
    pub fn new(seller_id: impl Into<String>) -> Self {
        DraftOrder {
            seller_id: seller_id.into(),
            customer_name: None,
            lines: Vec::new(),
        }
    }

    /// Sets the customer name (builder style).
    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    /// Adds a product to the draft, merging with an existing line for the
    /// same product.
    pub fn add_line(&mut self, product_id: impl Into<String>, quantity: i64) -> CoreResult<()> {
        let product_id = product_id.into();

        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity {
                product_id,
                quantity,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            // checked_add: an absurd quantity must be rejected, not overflow
            let merged = line.quantity.checked_add(quantity).ok_or_else(|| {
                CoreError::InvalidQuantity {
                    product_id: product_id.clone(),
                    quantity,
                }
            })?;
            validate_quantity(merged).map_err(|_| CoreError::InvalidQuantity {
                product_id,
                quantity: merged,
            })?;
            line.quantity = merged;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(ValidationError::OutOfRange {
                field: "lines".to_string(),
                min: 1,
                max: MAX_CART_LINES as i64,
            }
            .into());
        }

        validate_quantity(quantity).map_err(|_| CoreError::InvalidQuantity {
            product_id: product_id.clone(),
            quantity,
        })?;

        self.lines.push(DraftLine {
            product_id,
            quantity,
        });
        Ok(())
    }

    /// Removes the line for a product, if present.
    pub fn remove_line(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Total quantity across all lines (units, not distinct products).
    pub fn unit_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Checks the draft against the order-intake constraints.
    ///
    /// Catalog-dependent checks (existence, active flag, stock) are NOT done
    /// here; intake re-reads the catalog for those.
    pub fn validate(&self) -> CoreResult<()> {
        if self.seller_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "seller_id".to_string(),
            }
            .into());
        }

        if let Some(name) = &self.customer_name {
            validate_customer_name(name)?;
        }

        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        for line in &self.lines {
            if line.quantity <= 0 {
                return Err(CoreError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
            }
            validate_quantity(line.quantity)?;
            if line.product_id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "product_id".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Parses a draft from a JSON payload, as terminals submit it.
    ///
    /// A malformed payload is a distinct input error, never a silently
    /// empty cart.
    pub fn parse_json(payload: &str) -> CoreResult<DraftOrder> {
        let draft: DraftOrder =
            serde_json::from_str(payload).map_err(|e| ValidationError::InvalidInput {
                field: "draft_order".to_string(),
                reason: e.to_string(),
            })?;
        draft.validate()?;
        Ok(draft)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
