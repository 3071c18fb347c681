//! # Stock Ledger
//!
//! The ONLY code in the system that mutates a product's stock count for
//! sale-driven reasons. Called by checkout (negative deltas) and reversal
//! (positive deltas); never exposed to external collaborators.
//!
//! ## The Guarded Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Stock Update Inside a Sale Transaction                   │
//! │                                                                         │
//! │  ❌ WRONG: read-then-write (lost update under concurrency)            │
//! │     let s = SELECT stock ...;                                          │
//! │     UPDATE products SET stock = {s - qty} WHERE id = ?                 │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta, atomic in SQL                          │
//! │     UPDATE products SET stock = stock - qty                            │
//! │     WHERE id = ? AND stock >= qty                                      │
//! │                                                                         │
//! │  rows_affected == 0 means the guard fired: the decrement would have    │
//! │  driven stock below zero (or the product vanished). The caller's       │
//! │  transaction rolls back, so deltas already applied for earlier lines   │
//! │  of the same sale disappear with it - all or nothing.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Increments have no lower-bound failure mode; once the owning sale's
//! transition is legal they always succeed.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbError;
use pharma_core::{CoreError, CoreResult};

/// Applies one stock delta to a product, inside the caller's transaction.
///
/// ## Arguments
/// * `conn` - the open transaction's connection
/// * `product_id` - product to adjust
/// * `delta` - negative for checkout, positive for reversal
///
/// ## Errors
/// * [`CoreError::StockExhausted`] - a negative delta would drive stock
///   below zero; names the product and the shortfall
/// * [`CoreError::ProductUnavailable`] - the product row does not exist
pub(crate) async fn apply_delta(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
) -> CoreResult<()> {
    if delta == 0 {
        return Ok(());
    }

    debug!(product_id = %product_id, delta = %delta, "Applying stock delta");

    let now = Utc::now();

    let result = if delta < 0 {
        let needed = -delta;
        sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(needed)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?
    } else {
        sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?
    };

    if result.rows_affected() == 0 {
        return Err(classify_guard_failure(conn, product_id, -delta).await);
    }

    Ok(())
}

/// Distinguishes "product gone" from "guard fired" after a zero-row update.
///
/// Runs on the same transaction connection, so the row it reads is exactly
/// the row the guard evaluated.
async fn classify_guard_failure(
    conn: &mut SqliteConnection,
    product_id: &str,
    requested: i64,
) -> CoreError {
    let row: Result<Option<(String, i64)>, sqlx::Error> =
        sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await;

    match row {
        Ok(Some((name, available))) => CoreError::StockExhausted {
            product_id: product_id.to_string(),
            name,
            available,
            requested,
        },
        Ok(None) => CoreError::ProductUnavailable {
            product_id: product_id.to_string(),
        },
        Err(e) => DbError::from(e).into(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{begin_immediate, commit_tx, rollback_tx, Database, DbConfig};
    use crate::repository::product::generate_product_id;
    use pharma_core::Product;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let id = generate_product_id();
        let product = Product {
            id: id.clone(),
            name: "Dipirona 500mg".to_string(),
            description: None,
            price_cents: 1250,
            stock: 10,
            category: "MEDICAMENTO".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        (db, id)
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_decrement_within_stock() {
        let (db, id) = setup().await;

        let mut conn = begin_immediate(db.pool()).await.unwrap();
        apply_delta(&mut conn, &id, -3).await.unwrap();
        commit_tx(&mut conn).await.unwrap();
        drop(conn);

        assert_eq!(stock_of(&db, &id).await, 7);
    }

    #[tokio::test]
    async fn test_decrement_past_zero_is_rejected() {
        let (db, id) = setup().await;

        let mut conn = begin_immediate(db.pool()).await.unwrap();
        let err = apply_delta(&mut conn, &id, -11).await.unwrap_err();
        rollback_tx(&mut conn).await;
        drop(conn);

        match err {
            CoreError::StockExhausted {
                available,
                requested,
                name,
                ..
            } => {
                assert_eq!(available, 10);
                assert_eq!(requested, 11);
                assert_eq!(name, "Dipirona 500mg");
            }
            other => panic!("expected StockExhausted, got {other:?}"),
        }

        assert_eq!(stock_of(&db, &id).await, 10);
    }

    #[tokio::test]
    async fn test_decrement_to_exactly_zero() {
        let (db, id) = setup().await;

        let mut conn = begin_immediate(db.pool()).await.unwrap();
        apply_delta(&mut conn, &id, -10).await.unwrap();
        commit_tx(&mut conn).await.unwrap();
        drop(conn);

        assert_eq!(stock_of(&db, &id).await, 0);
    }

    #[tokio::test]
    async fn test_increment_restores() {
        let (db, id) = setup().await;

        let mut conn = begin_immediate(db.pool()).await.unwrap();
        apply_delta(&mut conn, &id, -4).await.unwrap();
        apply_delta(&mut conn, &id, 4).await.unwrap();
        commit_tx(&mut conn).await.unwrap();
        drop(conn);

        assert_eq!(stock_of(&db, &id).await, 10);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let (db, _) = setup().await;

        let mut conn = begin_immediate(db.pool()).await.unwrap();
        let err = apply_delta(&mut conn, "missing", -1).await.unwrap_err();
        rollback_tx(&mut conn).await;

        assert!(matches!(err, CoreError::ProductUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_rollback_discards_applied_deltas() {
        let (db, id) = setup().await;

        let mut conn = begin_immediate(db.pool()).await.unwrap();
        apply_delta(&mut conn, &id, -5).await.unwrap();
        rollback_tx(&mut conn).await;
        drop(conn);

        assert_eq!(stock_of(&db, &id).await, 10);
    }
}
