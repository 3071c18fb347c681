//! # Audit Repository
//!
//! Append-only audit trail. Lifecycle operations record here after their
//! own transaction commits; a failed audit write is logged and swallowed by
//! the caller, never propagated into the sale result.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use pharma_core::{AuditAction, AuditEntity, AuditEntry};

/// Repository for the audit log.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one audit entry.
    pub async fn record(
        &self,
        action: AuditAction,
        entity: AuditEntity,
        entity_id: Option<&str>,
        details: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, action, entity, entity_id, details, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .bind(details)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the most recent entries, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, action, entity, entity_id, details, created_at
            FROM audit_log
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Returns all entries touching one entity, newest first.
    pub async fn for_entity(&self, entity_id: &str) -> DbResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, action, entity, entity_id, details, created_at
            FROM audit_log
            WHERE entity_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
