//! # Seller Repository
//!
//! Terminal operator accounts and code + PIN authentication. Sales reference
//! a seller by id; the lifecycle engine treats that id as opaque.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::audit::AuditRepository;
use pharma_core::{AuditAction, AuditEntity, AuthError, Seller, SellerIdentity};

const SELLER_COLUMNS: &str = "id, name, code, pin, role, is_active, created_at";

/// Repository for seller accounts.
#[derive(Debug, Clone)]
pub struct SellerRepository {
    pool: SqlitePool,
    audit: AuditRepository,
}

impl SellerRepository {
    /// Creates a new SellerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        let audit = AuditRepository::new(pool.clone());
        SellerRepository { pool, audit }
    }

    /// Authenticates an operator by terminal code and PIN.
    ///
    /// Returns the minimal identity needed to attach the operator to sales.
    /// Unknown code, wrong PIN, and deactivated accounts are distinct errors
    /// so the terminal can show the right message.
    pub async fn authenticate(&self, code: &str, pin: &str) -> Result<SellerIdentity, AuthError> {
        let seller = self.get_by_code(code).await?;

        let Some(seller) = seller else {
            warn!(code = %code, "Authentication failed: unknown code");
            return Err(AuthError::UnknownCode);
        };

        if seller.pin != pin {
            warn!(code = %code, "Authentication failed: wrong PIN");
            return Err(AuthError::WrongPin);
        }

        if !seller.is_active {
            warn!(code = %code, "Authentication failed: account deactivated");
            return Err(AuthError::Inactive);
        }

        debug!(code = %code, seller_id = %seller.id, "Operator authenticated");
        Ok(SellerIdentity::from(&seller))
    }

    /// Gets a seller by terminal code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Seller>> {
        let sql = format!("SELECT {SELLER_COLUMNS} FROM users WHERE code = ?1");

        let seller = sqlx::query_as::<_, Seller>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(seller)
    }

    /// Gets a seller by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Seller>> {
        let sql = format!("SELECT {SELLER_COLUMNS} FROM users WHERE id = ?1");

        let seller = sqlx::query_as::<_, Seller>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(seller)
    }

    /// Inserts a new seller. The code must be unique.
    pub async fn insert(&self, seller: &Seller) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, code, pin, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&seller.id)
        .bind(&seller.name)
        .bind(&seller.code)
        .bind(&seller.pin)
        .bind(&seller.role)
        .bind(seller.is_active)
        .bind(seller.created_at)
        .execute(&self.pool)
        .await?;

        self.audit_best_effort(
            AuditAction::Create,
            &seller.id,
            format!("Created operator: {} (code {})", seller.name, seller.code),
        )
        .await;

        Ok(())
    }

    /// Flips the active flag. Deactivated sellers keep their sale history
    /// but can no longer authenticate.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("user", id));
        }

        let details = if active {
            "Reactivated operator"
        } else {
            "Deactivated operator"
        };
        self.audit_best_effort(AuditAction::Update, id, details.to_string())
            .await;

        Ok(())
    }

    /// Audit writes are fire-and-forget: a failed log line never fails the
    /// account operation that already committed.
    async fn audit_best_effort(&self, action: AuditAction, seller_id: &str, details: String) {
        if let Err(e) = self
            .audit
            .record(action, AuditEntity::User, Some(seller_id), &details)
            .await
        {
            warn!(seller_id = %seller_id, error = %e, "Audit write failed");
        }
    }
}

/// Generates a new seller ID.
pub fn generate_seller_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a seller record with sensible defaults for insertion.
pub fn new_seller(name: &str, code: &str, pin: &str, role: &str) -> Seller {
    Seller {
        id: generate_seller_id(),
        name: name.to_string(),
        code: code.to_string(),
        pin: pin.to_string(),
        role: role.to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}
