//! # Sale Repository
//!
//! Order intake and the sale lifecycle operations.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. ORDER INTAKE                                                       │
//! │     └── create_order(draft) → Sale { status: Pending } + lines         │
//! │         Stock checked but NOT decremented. Prices snapshotted.         │
//! │                                                                         │
//! │  2. CHECKOUT                                                           │
//! │     └── finalize(sale_id, payment) → Sale { status: Completed }        │
//! │         Stock Ledger decrement per line + status CAS, one transaction. │
//! │                                                                         │
//! │  3a. CANCELLATION (from Pending)                                       │
//! │     └── cancel(sale_id) → Sale { status: Cancelled }                   │
//! │         NO stock call: nothing was ever decremented for a pending sale.│
//! │                                                                         │
//! │  3b. REVERSAL (from Completed)                                         │
//! │     └── reverse(sale_id) → Sale { status: Cancelled }                  │
//! │         Stock Ledger increment per line + status CAS, one transaction. │
//! │                                                                         │
//! │  Stock changes hands at Finalize and Reverse, NEVER at intake or       │
//! │  cancellation. That asymmetry is what keeps the inventory invariant:   │
//! │  stock = baseline − Σ(lines of currently-Completed sales).             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every lifecycle write runs inside one IMMEDIATE transaction together with
//! its stock deltas, so the status precondition check and the status write
//! are atomic (see `pool::begin_immediate`).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::{begin_immediate, commit_tx, rollback_tx};
use crate::repository::audit::AuditRepository;
use crate::repository::stock;
use pharma_core::{
    AuditAction, AuditEntity, CoreError, CoreResult, DraftOrder, Money, PaymentMethod, Product,
    Sale, SaleEvent, SaleLine, SaleStatus, SaleWithLines,
};

const SALE_COLUMNS: &str =
    "id, status, customer_name, seller_id, total_cents, payment_method, created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, sale_id, product_id, name_snapshot, quantity, unit_price_cents, created_at";

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, stock, category, is_active, created_at, updated_at";

/// Repository for sale lifecycle operations and read-side projections.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    audit: AuditRepository,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditRepository::new(pool.clone());
        SaleRepository { pool, audit }
    }

    // =========================================================================
    // Order Intake
    // =========================================================================

    /// Validates a draft against the current catalog and persists it as a
    /// Pending sale with immutable line snapshots. Does NOT touch stock.
    ///
    /// ## Errors
    /// * `EmptyCart` / `InvalidQuantity` / `Validation` - draft malformed
    /// * `ProductUnavailable` - unknown or archived product
    /// * `InsufficientStock` - point-in-time stock check failed (advisory;
    ///   checkout re-verifies under its own transaction)
    /// * `Persistence` - nothing was committed, retry the whole intake
    pub async fn create_order(&self, draft: &DraftOrder) -> CoreResult<SaleWithLines> {
        draft.validate()?;

        let mut conn = begin_immediate(&self.pool).await?;
        let result = create_order_tx(&mut conn, draft).await;

        match result {
            Ok(sale) => {
                commit_tx(&mut conn).await?;
                drop(conn);

                info!(
                    sale_id = %sale.sale.id,
                    total = %sale.sale.total(),
                    lines = sale.lines.len(),
                    "Order created"
                );
                self.audit_best_effort(
                    AuditAction::Create,
                    &sale.sale.id,
                    format!(
                        "Created pending sale, {} lines, total {}",
                        sale.lines.len(),
                        sale.sale.total()
                    ),
                )
                .await;

                Ok(sale)
            }
            Err(e) => {
                rollback_tx(&mut conn).await;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Checkout (Finalize)
    // =========================================================================

    /// Commits a Pending sale: decrements stock for every line and flips the
    /// status to Completed, all inside one transaction.
    ///
    /// ## Errors
    /// * `SaleNotFound` - unknown sale id
    /// * `AlreadyCompleted` - sale was finalized before (concurrent or not)
    /// * `SaleClosed` - sale is cancelled
    /// * `StockExhausted` - some line cannot be covered; the sale stays
    ///   Pending and NO stock changed, not even for the other lines
    pub async fn finalize(&self, sale_id: &str, method: PaymentMethod) -> CoreResult<Sale> {
        debug!(sale_id = %sale_id, method = ?method, "Finalize requested");

        let mut conn = begin_immediate(&self.pool).await?;
        let result = finalize_tx(&mut conn, sale_id, method).await;

        match result {
            Ok(sale) => {
                commit_tx(&mut conn).await?;
                drop(conn);

                info!(sale_id = %sale_id, total = %sale.total(), "Sale finalized");
                self.audit_best_effort(
                    AuditAction::Sale,
                    sale_id,
                    format!("Finalized sale, total {}", sale.total()),
                )
                .await;

                Ok(sale)
            }
            Err(e) => {
                rollback_tx(&mut conn).await;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    /// Closes a Pending sale without any stock movement.
    ///
    /// Pending sales never decremented stock, so there is nothing to put
    /// back. Completed sales must go through [`SaleRepository::reverse`].
    pub async fn cancel(&self, sale_id: &str) -> CoreResult<Sale> {
        debug!(sale_id = %sale_id, "Cancel requested");

        let mut conn = begin_immediate(&self.pool).await?;
        let result = cancel_tx(&mut conn, sale_id).await;

        match result {
            Ok(sale) => {
                commit_tx(&mut conn).await?;
                drop(conn);

                info!(sale_id = %sale_id, "Sale cancelled");
                self.audit_best_effort(AuditAction::Update, sale_id, "Cancelled pending sale".to_string())
                    .await;

                Ok(sale)
            }
            Err(e) => {
                rollback_tx(&mut conn).await;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Reversal (Refund)
    // =========================================================================

    /// Undoes a Completed sale: restores stock for every line and closes the
    /// sale as Cancelled, all inside one transaction.
    ///
    /// The status CAS makes this idempotency-guarded the same way finalize
    /// is: a sale already Cancelled cannot be reversed again.
    pub async fn reverse(&self, sale_id: &str) -> CoreResult<Sale> {
        debug!(sale_id = %sale_id, "Reverse requested");

        let mut conn = begin_immediate(&self.pool).await?;
        let result = reverse_tx(&mut conn, sale_id).await;

        match result {
            Ok(sale) => {
                commit_tx(&mut conn).await?;
                drop(conn);

                info!(sale_id = %sale_id, total = %sale.total(), "Sale reversed, stock restored");
                self.audit_best_effort(
                    AuditAction::Update,
                    sale_id,
                    format!("Reversed sale, restored stock, total {}", sale.total()),
                )
                .await;

                Ok(sale)
            }
            Err(e) => {
                rollback_tx(&mut conn).await;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Read-side Projections
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all lines for a sale, in insertion order.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let sql =
            format!("SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY created_at, id");

        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    /// Gets a sale together with its lines.
    pub async fn get_with_lines(&self, id: &str) -> DbResult<Option<SaleWithLines>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let lines = self.get_lines(id).await?;
        Ok(Some(SaleWithLines { sale, lines }))
    }

    /// The cashier queue: pending sales, oldest first.
    pub async fn list_pending(&self) -> DbResult<Vec<SaleWithLines>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE status = 'pending' ORDER BY created_at"
        );

        let sales = sqlx::query_as::<_, Sale>(&sql).fetch_all(&self.pool).await?;
        self.attach_lines(sales).await
    }

    /// History view: completed and cancelled sales, newest first.
    pub async fn list_history(&self, limit: u32) -> DbResult<Vec<SaleWithLines>> {
        let sql = format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE status IN ('completed', 'cancelled')
            ORDER BY created_at DESC
            LIMIT ?1
            "#
        );

        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        self.attach_lines(sales).await
    }

    async fn attach_lines(&self, sales: Vec<Sale>) -> DbResult<Vec<SaleWithLines>> {
        let mut out = Vec::with_capacity(sales.len());
        for sale in sales {
            let lines = self.get_lines(&sale.id).await?;
            out.push(SaleWithLines { sale, lines });
        }
        Ok(out)
    }

    /// Audit writes are fire-and-forget: a failed log line never fails the
    /// sale operation that already committed.
    async fn audit_best_effort(&self, action: AuditAction, sale_id: &str, details: String) {
        if let Err(e) = self
            .audit
            .record(action, AuditEntity::Sale, Some(sale_id), &details)
            .await
        {
            warn!(sale_id = %sale_id, error = %e, "Audit write failed");
        }
    }
}

// =============================================================================
// Transaction Bodies
// =============================================================================
// Free functions over the open transaction's connection. They never commit
// or roll back themselves; the public methods above own the boundary.

async fn create_order_tx(
    conn: &mut SqliteConnection,
    draft: &DraftOrder,
) -> CoreResult<SaleWithLines> {
    let now = Utc::now();
    let sale_id = generate_sale_id();

    let product_sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

    let mut total = Money::zero();
    let mut lines = Vec::with_capacity(draft.lines.len());

    for request in &draft.lines {
        let product = sqlx::query_as::<_, Product>(&product_sql)
            .bind(&request.product_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?;

        let product = match product {
            Some(p) if p.is_active => p,
            _ => {
                return Err(CoreError::ProductUnavailable {
                    product_id: request.product_id.clone(),
                })
            }
        };

        // Point-in-time check only. Stock is not reserved here; checkout
        // re-verifies under its own transaction.
        if request.quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                name: product.name,
                available: product.stock,
                requested: request.quantity,
            });
        }

        total += product.price() * request.quantity;

        lines.push(SaleLine {
            id: generate_line_id(),
            sale_id: sale_id.clone(),
            product_id: product.id,
            name_snapshot: product.name,
            quantity: request.quantity,
            unit_price_cents: product.price_cents,
            created_at: now,
        });
    }

    let sale = Sale {
        id: sale_id.clone(),
        status: SaleStatus::Pending,
        customer_name: draft.customer_name.clone(),
        seller_id: draft.seller_id.clone(),
        total_cents: total.cents(),
        payment_method: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, status, customer_name, seller_id,
            total_cents, payment_method, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.status)
    .bind(&sale.customer_name)
    .bind(&sale.seller_id)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    for line in &lines {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, product_id, name_snapshot,
                quantity, unit_price_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(&line.product_id)
        .bind(&line.name_snapshot)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.created_at)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;
    }

    Ok(SaleWithLines { sale, lines })
}

async fn finalize_tx(
    conn: &mut SqliteConnection,
    sale_id: &str,
    method: PaymentMethod,
) -> CoreResult<Sale> {
    let mut sale = load_sale(conn, sale_id).await?;

    let target = sale
        .status
        .transition(SaleEvent::Finalize)
        .map_err(|denied| denied.into_core_error(sale_id))?;

    let lines = load_lines(conn, sale_id).await?;
    for line in &lines {
        stock::apply_delta(conn, &line.product_id, -line.quantity).await?;
    }

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = ?2, payment_method = ?3, updated_at = ?4
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(sale_id)
    .bind(target)
    .bind(method)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    // The IMMEDIATE transaction makes a stale read impossible; a zero here
    // would mean the invariant broke, so fail closed rather than commit.
    if result.rows_affected() == 0 {
        return Err(CoreError::SaleClosed {
            sale_id: sale_id.to_string(),
            status: sale.status,
        });
    }

    sale.status = target;
    sale.payment_method = Some(method);
    sale.updated_at = now;
    Ok(sale)
}

async fn cancel_tx(conn: &mut SqliteConnection, sale_id: &str) -> CoreResult<Sale> {
    let mut sale = load_sale(conn, sale_id).await?;

    let target = sale
        .status
        .transition(SaleEvent::Cancel)
        .map_err(|denied| denied.into_core_error(sale_id))?;

    // No Stock Ledger call on purpose: a pending sale never decremented
    // stock, so cancelling it must not increment anything.
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = ?2, updated_at = ?3
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(sale_id)
    .bind(target)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    if result.rows_affected() == 0 {
        return Err(CoreError::SaleClosed {
            sale_id: sale_id.to_string(),
            status: sale.status,
        });
    }

    sale.status = target;
    sale.updated_at = now;
    Ok(sale)
}

async fn reverse_tx(conn: &mut SqliteConnection, sale_id: &str) -> CoreResult<Sale> {
    let mut sale = load_sale(conn, sale_id).await?;

    let target = sale
        .status
        .transition(SaleEvent::Reverse)
        .map_err(|denied| denied.into_core_error(sale_id))?;

    let lines = load_lines(conn, sale_id).await?;
    for line in &lines {
        stock::apply_delta(conn, &line.product_id, line.quantity).await?;
    }

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = ?2, updated_at = ?3
        WHERE id = ?1 AND status = 'completed'
        "#,
    )
    .bind(sale_id)
    .bind(target)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    if result.rows_affected() == 0 {
        return Err(CoreError::SaleClosed {
            sale_id: sale_id.to_string(),
            status: sale.status,
        });
    }

    sale.status = target;
    sale.updated_at = now;
    Ok(sale)
}

async fn load_sale(conn: &mut SqliteConnection, sale_id: &str) -> CoreResult<Sale> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");

    sqlx::query_as::<_, Sale>(&sql)
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)?
        .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))
}

async fn load_lines(conn: &mut SqliteConnection, sale_id: &str) -> CoreResult<Vec<SaleLine>> {
    let sql =
        format!("SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY created_at, id");

    let lines = sqlx::query_as::<_, SaleLine>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(DbError::from)?;

    Ok(lines)
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharma_core::Seller;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_seller(db: &Database) -> String {
        let seller = Seller {
            id: Uuid::new_v4().to_string(),
            name: "Ana Souza".to_string(),
            code: "1001".to_string(),
            pin: "4321".to_string(),
            role: "USER".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        db.sellers().insert(&seller).await.unwrap();
        seller.id
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: None,
            price_cents,
            stock,
            category: "MEDICAMENTO".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product.id
    }

    async fn stock_of(db: &Database, product_id: &str) -> i64 {
        db.products()
            .get_by_id(product_id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    fn draft(seller_id: &str, lines: &[(&str, i64)]) -> DraftOrder {
        let mut order = DraftOrder::new(seller_id);
        for (product_id, quantity) in lines {
            order.add_line(*product_id, *quantity).unwrap();
        }
        order
    }

    async fn sale_count(db: &Database) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    // =========================================================================
    // Order Intake
    // =========================================================================

    #[tokio::test]
    async fn intake_leaves_stock_untouched() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Dipirona 500mg", 550, 10).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 3)]))
            .await
            .unwrap();

        assert_eq!(sale.sale.status, SaleStatus::Pending);
        assert_eq!(sale.sale.total_cents, 1650);
        assert_eq!(sale.lines.len(), 1);
        assert_eq!(sale.lines[0].quantity, 3);
        assert_eq!(stock_of(&db, &product).await, 10);
    }

    #[tokio::test]
    async fn intake_snapshots_name_and_price() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product_id = seed_product(&db, "Amoxicilina 500mg", 1200, 20).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product_id, 2)]))
            .await
            .unwrap();

        // Reprice and rename the product after intake.
        let mut product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        product.price_cents = 9900;
        product.name = "Amoxicilina 875mg".to_string();
        db.products().update(&product).await.unwrap();

        let stored = db
            .sales()
            .get_with_lines(&sale.sale.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.lines[0].unit_price_cents, 1200);
        assert_eq!(stored.lines[0].name_snapshot, "Amoxicilina 500mg");
        assert_eq!(stored.sale.total_cents, 2400);
    }

    #[tokio::test]
    async fn intake_rejects_unknown_product() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;

        let err = db
            .sales()
            .create_order(&draft(&seller, &[("no-such-id", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ProductUnavailable { .. }));
        assert_eq!(sale_count(&db).await, 0);
    }

    #[tokio::test]
    async fn intake_rejects_archived_product() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product_id = seed_product(&db, "Paracetamol 750mg", 800, 5).await;

        let mut product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        product.is_active = false;
        db.products().update(&product).await.unwrap();

        let err = db
            .sales()
            .create_order(&draft(&seller, &[(&product_id, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::ProductUnavailable { .. }));
    }

    // Scenario: intake for more than the shelf holds fails fast and leaves
    // no partial sale behind.
    #[tokio::test]
    async fn intake_insufficient_stock_persists_nothing() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Ibuprofeno 600mg", 900, 2).await;

        let err = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 5)]))
            .await
            .unwrap_err();

        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(sale_count(&db).await, 0);
        assert_eq!(stock_of(&db, &product).await, 2);
    }

    #[tokio::test]
    async fn intake_rejects_empty_cart() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;

        let err = db
            .sales()
            .create_order(&DraftOrder::new(&seller))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    #[tokio::test]
    async fn finalize_decrements_stock_and_completes() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Dipirona 500mg", 550, 10).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 3)]))
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &product).await, 10);

        let finalized = db
            .sales()
            .finalize(&sale.sale.id, PaymentMethod::Pix)
            .await
            .unwrap();

        assert_eq!(finalized.status, SaleStatus::Completed);
        assert_eq!(finalized.payment_method, Some(PaymentMethod::Pix));
        assert_eq!(stock_of(&db, &product).await, 7);
    }

    #[tokio::test]
    async fn finalize_unknown_sale() {
        let db = test_db().await;
        let err = db
            .sales()
            .finalize("missing", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SaleNotFound(_)));
    }

    #[tokio::test]
    async fn second_finalize_is_rejected() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Omeprazol 20mg", 700, 10).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 2)]))
            .await
            .unwrap();
        db.sales()
            .finalize(&sale.sale.id, PaymentMethod::Cash)
            .await
            .unwrap();

        let err = db
            .sales()
            .finalize(&sale.sale.id, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::AlreadyCompleted(_)));
        // Stock debited exactly once.
        assert_eq!(stock_of(&db, &product).await, 8);
    }

    // A three-line sale where the middle line cannot be covered: the whole
    // checkout rolls back, every product keeps its stock, sale stays Pending.
    #[tokio::test]
    async fn finalize_partial_failure_rolls_back_every_line() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let a = seed_product(&db, "Dipirona 500mg", 550, 10).await;
        let b = seed_product(&db, "Vitamina C 1g", 1500, 10).await;
        let c = seed_product(&db, "Soro Fisiologico 250ml", 600, 10).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&a, 2), (&b, 4), (&c, 1)]))
            .await
            .unwrap();

        // Drain product B behind the pending sale's back.
        let mut drained = db.products().get_by_id(&b).await.unwrap().unwrap();
        drained.stock = 1;
        db.products().update(&drained).await.unwrap();

        let err = db
            .sales()
            .finalize(&sale.sale.id, PaymentMethod::Debit)
            .await
            .unwrap_err();

        match err {
            CoreError::StockExhausted {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 4);
            }
            other => panic!("expected StockExhausted, got {other:?}"),
        }

        // Line A was decremented inside the transaction; the rollback must
        // have undone it.
        assert_eq!(stock_of(&db, &a).await, 10);
        assert_eq!(stock_of(&db, &b).await, 1);
        assert_eq!(stock_of(&db, &c).await, 10);

        let stored = db.sales().get_by_id(&sale.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Pending);
        assert_eq!(stored.payment_method, None);
    }

    #[tokio::test]
    async fn finalize_can_drain_stock_to_zero() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Losartana 50mg", 450, 4).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 4)]))
            .await
            .unwrap();
        db.sales()
            .finalize(&sale.sale.id, PaymentMethod::Credit)
            .await
            .unwrap();

        assert_eq!(stock_of(&db, &product).await, 0);
    }

    // =========================================================================
    // Cancellation
    // =========================================================================

    #[tokio::test]
    async fn cancel_pending_never_touches_stock() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Dipirona 500mg", 550, 10).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 3)]))
            .await
            .unwrap();

        let cancelled = db.sales().cancel(&sale.sale.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(stock_of(&db, &product).await, 10);

        // A cancelled sale cannot be resurrected at the till.
        let err = db
            .sales()
            .finalize(&sale.sale.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::SaleClosed {
                status: SaleStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(stock_of(&db, &product).await, 10);
    }

    #[tokio::test]
    async fn cancel_completed_points_at_reverse() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Omeprazol 20mg", 700, 10).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 1)]))
            .await
            .unwrap();
        db.sales()
            .finalize(&sale.sale.id, PaymentMethod::Cash)
            .await
            .unwrap();

        let err = db.sales().cancel(&sale.sale.id).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCompleted(_)));
        assert_eq!(stock_of(&db, &product).await, 9);
    }

    // =========================================================================
    // Reversal
    // =========================================================================

    #[tokio::test]
    async fn reverse_restores_stock() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Dipirona 500mg", 550, 10).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 3)]))
            .await
            .unwrap();
        db.sales()
            .finalize(&sale.sale.id, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(stock_of(&db, &product).await, 7);

        let reversed = db.sales().reverse(&sale.sale.id).await.unwrap();
        assert_eq!(reversed.status, SaleStatus::Cancelled);
        assert_eq!(stock_of(&db, &product).await, 10);
    }

    #[tokio::test]
    async fn reverse_twice_increments_once() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Vitamina C 1g", 1500, 8).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 2)]))
            .await
            .unwrap();
        db.sales()
            .finalize(&sale.sale.id, PaymentMethod::Pix)
            .await
            .unwrap();
        db.sales().reverse(&sale.sale.id).await.unwrap();

        let err = db.sales().reverse(&sale.sale.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::SaleClosed {
                status: SaleStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(stock_of(&db, &product).await, 8);
    }

    #[tokio::test]
    async fn reverse_pending_is_rejected() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Soro Fisiologico 250ml", 600, 5).await;

        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 1)]))
            .await
            .unwrap();

        let err = db.sales().reverse(&sale.sale.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::SaleClosed {
                status: SaleStatus::Pending,
                ..
            }
        ));
        assert_eq!(stock_of(&db, &product).await, 5);
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    // Two cashiers race to finalize the same pending sale. Exactly one wins;
    // the loser sees a committed Completed status, and stock moves once.
    // Runs against a file-backed database so both tasks share real
    // connections instead of the single-connection in-memory pool.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_finalize_has_one_winner() {
        let path = std::env::temp_dir().join(format!("pharma-test-{}.db", Uuid::new_v4()));
        let config = DbConfig::new(&path).max_connections(4);
        let db = Database::new(config).await.unwrap();

        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Dipirona 500mg", 550, 10).await;
        let sale = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 3)]))
            .await
            .unwrap();

        let repo_a = db.sales();
        let repo_b = db.sales();
        let (a, b) = tokio::join!(
            repo_a.finalize(&sale.sale.id, PaymentMethod::Cash),
            repo_b.finalize(&sale.sale.id, PaymentMethod::Pix),
        );

        let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one finalize must win: {a:?} / {b:?}");

        let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(
            matches!(loser, CoreError::AlreadyCompleted(_)),
            "loser must see the committed completion, got {loser:?}"
        );

        assert_eq!(stock_of(&db, &product).await, 7);
        let stored = db.sales().get_by_id(&sale.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Completed);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    // =========================================================================
    // Projections
    // =========================================================================

    #[tokio::test]
    async fn pending_queue_and_history_split_by_status() {
        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Dipirona 500mg", 550, 50).await;

        let pending = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 1)]))
            .await
            .unwrap();
        let completed = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 2)]))
            .await
            .unwrap();
        db.sales()
            .finalize(&completed.sale.id, PaymentMethod::Cash)
            .await
            .unwrap();
        let cancelled = db
            .sales()
            .create_order(&draft(&seller, &[(&product, 3)]))
            .await
            .unwrap();
        db.sales().cancel(&cancelled.sale.id).await.unwrap();

        let queue = db.sales().list_pending().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].sale.id, pending.sale.id);
        assert_eq!(queue[0].lines.len(), 1);

        let history = db.sales().list_history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history
            .iter()
            .all(|s| s.sale.status != SaleStatus::Pending));
    }

    // A product referenced by sale history cannot be physically deleted;
    // it gets archived so the lines keep a valid foreign key.
    #[tokio::test]
    async fn referenced_product_archives_instead_of_deleting() {
        use pharma_core::DeleteOutcome;

        let db = test_db().await;
        let seller = seed_seller(&db).await;
        let product = seed_product(&db, "Dipirona 500mg", 550, 10).await;

        db.sales()
            .create_order(&draft(&seller, &[(&product, 1)]))
            .await
            .unwrap();

        let outcome = db.products().delete_or_archive(&product).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Archived);

        let archived = db.products().get_by_id(&product).await.unwrap().unwrap();
        assert!(!archived.is_active);
    }
}
