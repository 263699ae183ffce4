// src/handlers/pipelines.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
        tenancy::WorkspaceContext,
    },
    models::pipeline::{AddStagePayload, CreatePipelinePayload, Pipeline, PipelineStage, PipelineWithStages},
};

// GET /api/pipelines
#[utoipa::path(
    get,
    path = "/api/pipelines",
    tag = "Pipelines",
    responses(
        (status = 200, description = "Pipelines do workspace com as etapas", body = Vec<PipelineWithStages>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_pipelines(
    State(app_state): State<AppState>,
    locale: Locale,
    workspace: WorkspaceContext,
) -> Result<impl IntoResponse, ApiError> {
    let pipelines = app_state
        .pipeline_service
        .list_pipelines(&app_state.db_pool, workspace.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(pipelines))
}

// POST /api/pipelines
#[utoipa::path(
    post,
    path = "/api/pipelines",
    tag = "Pipelines",
    request_body = CreatePipelinePayload,
    responses(
        (status = 201, description = "Pipeline criado", body = Pipeline),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_pipeline(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Json(payload): Json<CreatePipelinePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let pipeline = app_state
        .pipeline_service
        .create_pipeline(&app_state.db_pool, workspace.0, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(pipeline)))
}

// POST /api/pipelines/{id}/stages
#[utoipa::path(
    post,
    path = "/api/pipelines/{id}/stages",
    tag = "Pipelines",
    params(("id" = i64, Path, description = "ID do pipeline")),
    request_body = AddStagePayload,
    responses(
        (status = 201, description = "Etapa criada", body = PipelineStage),
        (status = 404, description = "Pipeline não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_stage(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Path(pipeline_id): Path<i64>,
    Json(payload): Json<AddStagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let stage = app_state
        .pipeline_service
        .add_stage(&app_state.db_pool, workspace.0, pipeline_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(stage)))
}
