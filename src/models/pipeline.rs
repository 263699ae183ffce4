// src/models/pipeline.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(ignore)] // Vem do token, não precisa aparecer na doc
    pub workspace_id: i64,
    #[schema(example = "Funil de Vendas Padrão")]
    pub name: String,
    #[schema(example = true)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    #[schema(example = 3)]
    pub id: i64,
    pub pipeline_id: i64,
    #[schema(example = "Em Negociação")]
    pub name: String,
    #[schema(example = 1)]
    pub position: i32,
    #[schema(example = 40)]
    pub win_probability: i16,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineWithStages {
    #[serde(flatten)]
    pub pipeline: Pipeline,
    pub stages: Vec<PipelineStage>,
}

// --- PAYLOADS ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipelinePayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Vendas Enterprise")]
    pub name: String,

    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddStagePayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Proposta Enviada")]
    pub name: String,

    // Sem posição: entra no fim do funil
    pub position: Option<i32>,

    #[validate(range(min = 0, max = 100, message = "out_of_range"))]
    #[serde(default)]
    #[schema(example = 60)]
    pub win_probability: i16,
}
