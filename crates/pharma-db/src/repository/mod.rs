//! # Repository Layer
//!
//! One repository per aggregate, all cheap clones over the shared pool:
//!
//! * [`product::ProductRepository`] - catalog CRUD, search, delete-or-archive
//! * [`sale::SaleRepository`] - order intake and the sale lifecycle
//! * [`seller::SellerRepository`] - operator accounts and authentication
//! * [`audit::AuditRepository`] - append-only audit trail
//! * `stock` - crate-internal guarded stock deltas, only callable from
//!   inside an open lifecycle transaction

pub mod audit;
pub mod product;
pub mod sale;
pub mod seller;
pub(crate) mod stock;

pub use audit::AuditRepository;
pub use product::{generate_product_id, ProductRepository};
pub use sale::{generate_line_id, generate_sale_id, SaleRepository};
pub use seller::{generate_seller_id, new_seller, SellerRepository};
