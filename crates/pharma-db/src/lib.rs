//! # pharma-db: Database Layer for Pharma POS
//!
//! This crate provides database access for the Pharma POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Pharma POS Data Flow                              │
//! │                                                                         │
//! │  Terminal frontend (intake / checkout / refund)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    pharma-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (sale.rs)    │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ SaleRepo      │    │ 001_init.sql │  │   │
//! │  │   │ IMMEDIATE tx  │◄───│ ProductRepo   │    │              │  │   │
//! │  │   │ helpers       │    │ SellerRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │              e.g. ~/.local/share/pharma-pos/pharma.db          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration, transaction helpers
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, product, seller, audit)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharma_db::{Database, DbConfig};
//! use pharma_core::{DraftOrder, PaymentMethod};
//!
//! let db = Database::new(DbConfig::new("path/to/pharma.db")).await?;
//!
//! let mut draft = DraftOrder::new(seller_id);
//! draft.add_line(product_id, 2)?;
//!
//! let sale = db.sales().create_order(&draft).await?;
//! db.sales().finalize(&sale.sale.id, PaymentMethod::Pix).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::AuditRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::seller::SellerRepository;
