//! # Product Repository
//!
//! Catalog store: product lookups for order intake, plus the administrative
//! edit path (create/update/delete) whose writes the sale checks observe.
//!
//! ## Delete Is a Decision, Not an Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      delete_or_archive(id)                              │
//! │                                                                         │
//! │  SELECT COUNT(*) FROM sale_lines WHERE product_id = ?                  │
//! │       │                                                                 │
//! │       ├── 0 references  ──► DELETE row        ──► DeleteOutcome::Removed│
//! │       │                                                                 │
//! │       └── ≥1 reference  ──► UPDATE is_active=0 ──► DeleteOutcome::Archived
//! │                                                                         │
//! │  Both run in one IMMEDIATE transaction, so a sale created between the  │
//! │  count and the delete cannot orphan its lines. The FK from sale_lines  │
//! │  backs this up at the schema level.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::{begin_immediate, commit_tx, rollback_tx};
use crate::repository::audit::AuditRepository;
use pharma_core::{AuditAction, AuditEntity, DeleteOutcome, Product};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, stock, category, is_active, created_at, updated_at";

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    audit: AuditRepository,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditRepository::new(pool.clone());
        ProductRepository { pool, audit }
    }

    /// Unified search: name substring or exact id, with an optional
    /// category filter. Archived products never appear.
    ///
    /// ## Arguments
    /// * `term` - Search term (can be empty: returns active products)
    /// * `category` - Optional category filter
    /// * `limit` - Maximum results to return
    pub async fn search(
        &self,
        term: &str,
        category: Option<&str>,
        limit: u32,
    ) -> DbResult<Vec<Product>> {
        let term = term.trim();

        debug!(term = %term, category = ?category, limit = %limit, "Searching products");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (?1 = '' OR name LIKE ?2 OR id = ?1)
              AND (?3 IS NULL OR category = ?3)
            ORDER BY name
            LIMIT ?4
            "#
        );

        let pattern = format!("%{term}%");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(term)
            .bind(pattern)
            .bind(category)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Distinct category labels among active products, sorted.
    pub async fn list_categories(&self) -> DbResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM products WHERE is_active = 1 ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Gets a product by its ID (active or archived).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, stock,
                category, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        self.audit_best_effort(
            AuditAction::Create,
            &product.id,
            format!("Created product: {}", product.name),
        )
        .await;

        Ok(())
    }

    /// Updates an existing product (administrative edit path).
    ///
    /// Sets price, stock, name, description, category and active flag
    /// absolutely. Sale-driven stock changes never come through here.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                stock = ?5,
                category = ?6,
                is_active = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        self.audit_best_effort(
            AuditAction::Update,
            &product.id,
            format!("Updated product: {}", product.name),
        )
        .await;

        Ok(())
    }

    /// Deletes a product, or archives it if sale history references it.
    ///
    /// ## Returns
    /// * `DeleteOutcome::Removed` - physically deleted, no references existed
    /// * `DeleteOutcome::Archived` - soft-deleted, history kept intact
    pub async fn delete_or_archive(&self, id: &str) -> DbResult<DeleteOutcome> {
        debug!(id = %id, "Delete/archive product");

        let mut conn = begin_immediate(&self.pool).await?;

        let outcome = async {
            let references: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM sale_lines WHERE product_id = ?1")
                    .bind(id)
                    .fetch_one(&mut *conn)
                    .await?;

            if references > 0 {
                let now = Utc::now();
                let result =
                    sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                        .bind(id)
                        .bind(now)
                        .execute(&mut *conn)
                        .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("Product", id));
                }
                Ok(DeleteOutcome::Archived)
            } else {
                let result = sqlx::query("DELETE FROM products WHERE id = ?1")
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(DbError::not_found("Product", id));
                }
                Ok(DeleteOutcome::Removed)
            }
        }
        .await;

        match outcome {
            Ok(outcome) => {
                commit_tx(&mut conn).await?;
                drop(conn);
                debug!(id = %id, outcome = ?outcome, "Product delete resolved");

                let details = match outcome {
                    DeleteOutcome::Removed => "Deleted product",
                    DeleteOutcome::Archived => "Archived product (referenced by sale history)",
                };
                self.audit_best_effort(AuditAction::Delete, id, details.to_string())
                    .await;

                Ok(outcome)
            }
            Err(e) => {
                rollback_tx(&mut conn).await;
                Err(e)
            }
        }
    }

    /// Audit writes are fire-and-forget: a failed log line never fails the
    /// catalog operation that already committed.
    async fn audit_best_effort(&self, action: AuditAction, product_id: &str, details: String) {
        if let Err(e) = self
            .audit
            .record(action, AuditEntity::Product, Some(product_id), &details)
            .await
        {
            warn!(product_id = %product_id, error = %e, "Audit write failed");
        }
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn sample(name: &str, category: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            name: name.to_string(),
            description: None,
            price_cents: 990,
            stock,
            category: category.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_admin_writes_leave_audit_trail() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut product = sample("Dipirona 500mg", "MEDICAMENTO", 10);

        db.products().insert(&product).await.unwrap();
        product.price_cents = 650;
        db.products().update(&product).await.unwrap();
        db.products().delete_or_archive(&product.id).await.unwrap();

        let trail = db.audit().for_entity(&product.id).await.unwrap();
        assert_eq!(trail.len(), 3);
        assert!(trail.iter().all(|e| e.entity == AuditEntity::Product));

        let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
        assert!(actions.contains(&AuditAction::Create));
        assert!(actions.contains(&AuditAction::Update));
        assert!(actions.contains(&AuditAction::Delete));
    }

    #[tokio::test]
    async fn test_insert_and_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&sample("Dipirona 500mg", "MEDICAMENTO", 10))
            .await
            .unwrap();
        repo.insert(&sample("Sabonete Neutro", "HIGIENE", 5))
            .await
            .unwrap();

        let hits = repo.search("dipi", None, 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Dipirona 500mg");

        let hits = repo.search("", Some("HIGIENE"), 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].category, "HIGIENE");

        let all = repo.list_active(50).await.unwrap();
        assert_eq!(all.len(), 2);

        let cats = repo.list_categories().await.unwrap();
        assert_eq!(cats, vec!["HIGIENE".to_string(), "MEDICAMENTO".to_string()]);
    }

    #[tokio::test]
    async fn test_search_by_exact_id() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = sample("Paracetamol 750mg", "MEDICAMENTO", 3);
        repo.insert(&product).await.unwrap();

        let hits = repo.search(&product.id, None, 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, product.id);
    }

    #[tokio::test]
    async fn test_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut product = sample("Vitamina C", "SUPLEMENTO", 8);
        repo.insert(&product).await.unwrap();

        product.price_cents = 1590;
        product.stock = 20;
        repo.update(&product).await.unwrap();

        let reloaded = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.price_cents, 1590);
        assert_eq!(reloaded.stock, 20);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = sample("Fantasma", "MEDICAMENTO", 1);
        let err = repo.update(&product).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_without_references_removes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = sample("Criado por engano", "MEDICAMENTO", 0);
        repo.insert(&product).await.unwrap();

        let outcome = repo.delete_or_archive(&product.id).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed);
        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_archived_products_hidden_from_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut product = sample("Descontinuado", "MEDICAMENTO", 2);
        repo.insert(&product).await.unwrap();

        product.is_active = false;
        repo.update(&product).await.unwrap();

        assert!(repo.search("Descontinuado", None, 20).await.unwrap().is_empty());
        // still reachable by direct id lookup for history screens
        assert!(repo.get_by_id(&product.id).await.unwrap().is_some());
    }
}
