// src/models/crm.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::custom_field::{FieldInput, RecordFieldData};

// --- ENUMS ---

// Mapeia o CREATE TYPE lead_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "lead_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Disqualified,
    Converted,
}

// --- REGISTROS (colunas fixas; campos customizados ficam nas tabelas de valores) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i64,
    #[schema(ignore)]
    pub workspace_id: i64,
    pub owner_id: i64,
    #[schema(example = "Acme Ltda")]
    pub name: String,
    #[schema(example = "acme.com.br")]
    pub domain: Option<String>,
    #[schema(example = "Varejo")]
    pub industry: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    #[schema(ignore)]
    pub workspace_id: i64,
    pub owner_id: i64,
    pub company_id: Option<i64>,
    #[schema(example = "Marina")]
    pub first_name: String,
    #[schema(example = "Lopes")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: i64,
    #[schema(ignore)]
    pub workspace_id: i64,
    pub owner_id: i64,
    #[schema(example = "Interesse no plano anual")]
    pub title: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: i64,
    #[schema(ignore)]
    pub workspace_id: i64,
    pub owner_id: i64,
    pub pipeline_id: i64,
    pub stage_id: i64,
    #[schema(example = "Renovação Acme 2027")]
    pub title: String,
    #[schema(value_type = Option<f64>, example = 12500.5)]
    pub amount: Option<Decimal>,
    pub expected_close_date: Option<NaiveDate>,
    pub company_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Registro + campos customizados já mascarados, do jeito que vai para o cliente.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordView<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(flatten)]
    pub fields: RecordFieldData,
    // Avisos das fórmulas (ex: divisão por zero) da última gravação
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Paginação das listagens (`?limit=50&offset=0`).
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Padrão 50, máximo 200.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    /// (limit, offset) já normalizados.
    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

// --- PAYLOADS ---
// PUT substitui as colunas fixas; os campos customizados só mudam quando enviados.

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Acme Ltda")]
    pub name: String,
    #[validate(length(max = 255, message = "too_long"))]
    pub domain: Option<String>,
    #[validate(length(max = 120, message = "too_long"))]
    pub industry: Option<String>,
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub custom_fields: Vec<FieldInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    pub first_name: String,
    #[validate(length(max = 120, message = "too_long"))]
    pub last_name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    #[validate(length(max = 40, message = "too_long"))]
    pub phone: Option<String>,
    pub company_id: Option<i64>,
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub custom_fields: Vec<FieldInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub title: String,
    #[validate(length(max = 200, message = "too_long"))]
    pub contact_name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub status: Option<LeadStatus>,
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub custom_fields: Vec<FieldInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DealPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub title: String,
    pub pipeline_id: i64,
    pub stage_id: i64,
    #[schema(value_type = Option<f64>, example = 12500.5)]
    pub amount: Option<Decimal>,
    pub expected_close_date: Option<NaiveDate>,
    pub company_id: Option<i64>,
    pub contact_id: Option<i64>,
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub custom_fields: Vec<FieldInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_clamped() {
        assert_eq!(ListQuery::default().page(), (50, 0));
        assert_eq!(ListQuery { limit: Some(1000), offset: Some(-5) }.page(), (200, 0));
        assert_eq!(ListQuery { limit: Some(0), offset: Some(40) }.page(), (1, 40));
    }
}
