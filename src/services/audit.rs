// src/services/audit.rs

use serde::Serialize;
use serde_json::Value;
use sqlx::PgConnection;

use crate::{
    common::error::AppError,
    db::AuditRepository,
    models::audit::{AuditAction, AuditEntry},
};

#[derive(Clone)]
pub struct AuditService {
    repo: AuditRepository,
}

impl AuditService {
    pub fn new(repo: AuditRepository) -> Self {
        Self { repo }
    }

    /// Grava na mesma transação da mudança. `before`/`after` devem ser a visão mascarada.
    #[allow(clippy::too_many_arguments)]
    pub async fn record<B, A>(
        &self,
        conn: &mut PgConnection,
        workspace_id: i64,
        actor_id: i64,
        entity_type: &'static str,
        entity_id: i64,
        action: AuditAction,
        before: Option<&B>,
        after: Option<&A>,
        meta: Option<Value>,
    ) -> Result<(), AppError>
    where
        B: Serialize + Sync,
        A: Serialize + Sync,
    {
        let entry = AuditEntry {
            workspace_id,
            actor_id,
            entity_type,
            entity_id,
            action,
            before: before.map(to_json).transpose()?,
            after: after.map(to_json).transpose()?,
            meta,
        };
        self.repo.insert(conn, &entry).await
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::InternalServerError(e.into()))
}
