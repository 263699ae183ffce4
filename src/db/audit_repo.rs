// src/db/audit_repo.rs

use sqlx::{Executor, Postgres};

use crate::{common::error::AppError, models::audit::AuditEntry};

#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, entry: &AuditEntry) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (workspace_id, actor_id, entity_type, entity_id, action, before, after, meta)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.workspace_id)
        .bind(entry.actor_id)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.action)
        .bind(&entry.before)
        .bind(&entry.after)
        .bind(&entry.meta)
        .execute(executor)
        .await?;
        Ok(())
    }
}
