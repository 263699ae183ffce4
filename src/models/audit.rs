// src/models/audit.rs

use serde::Serialize;
use serde_json::Value;

// Mapeia o CREATE TYPE audit_action do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    FileUpload,
    FileReplace,
    FileDelete,
}

/// Uma entrada da trilha de auditoria. `before`/`after` já vêm mascarados.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub workspace_id: i64,
    pub actor_id: i64,
    pub entity_type: &'static str,
    pub entity_id: i64,
    pub action: AuditAction,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub meta: Option<Value>,
}
