// src/handlers/custom_fields.rs

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
    models::custom_field::{
        CreateFieldPayload, CreateOptionPayload, CustomField, CustomFieldOption, FieldDefinition, FieldId, ObjectType,
        ReorderFieldsPayload, UpdateFieldPayload,
    },
};

// =============================================================================
//  DEFINIÇÕES
// =============================================================================

// GET /api/fields/{objectType}
#[utoipa::path(
    get,
    path = "/api/fields/{objectType}",
    tag = "Campos customizados",
    params(("objectType" = ObjectType, Path, description = "deal, lead, contact ou company")),
    responses(
        (status = 200, description = "Campos ativos com as opções, na ordem de exibição", body = Vec<FieldDefinition>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    workspace: WorkspaceContext,
    Path(object_type): Path<ObjectType>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .custom_field_service
        .list_definitions(&app_state.db_pool, workspace.0, object_type)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(fields))
}

// POST /api/fields/{objectType}
#[utoipa::path(
    post,
    path = "/api/fields/{objectType}",
    tag = "Campos customizados",
    params(("objectType" = ObjectType, Path, description = "deal, lead, contact ou company")),
    request_body = CreateFieldPayload,
    responses(
        (status = 201, description = "Campo criado", body = FieldDefinition),
        (status = 400, description = "Dados ou fórmula inválidos"),
        (status = 403, description = "Apenas administradores"),
        (status = 409, description = "Opções iniciais repetidas")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_field(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Path(object_type): Path<ObjectType>,
    Json(payload): Json<CreateFieldPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let field = app_state
        .custom_field_service
        .create_field(&app_state.db_pool, workspace.0, object_type, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(field)))
}

// PUT /api/fields/{objectType}/{fieldId}
#[utoipa::path(
    put,
    path = "/api/fields/{objectType}/{fieldId}",
    tag = "Campos customizados",
    params(
        ("objectType" = ObjectType, Path, description = "deal, lead, contact ou company"),
        ("fieldId" = i64, Path, description = "ID do campo")
    ),
    request_body = UpdateFieldPayload,
    responses(
        (status = 200, description = "Campo atualizado", body = CustomField),
        (status = 400, description = "Dados ou fórmula inválidos"),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_field(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Path((object_type, field_id)): Path<(ObjectType, FieldId)>,
    Json(payload): Json<UpdateFieldPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let field = app_state
        .custom_field_service
        .update_field(&app_state.db_pool, workspace.0, object_type, field_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(field))
}

// DELETE /api/fields/{objectType}/{fieldId}
#[utoipa::path(
    delete,
    path = "/api/fields/{objectType}/{fieldId}",
    tag = "Campos customizados",
    params(
        ("objectType" = ObjectType, Path, description = "deal, lead, contact ou company"),
        ("fieldId" = i64, Path, description = "ID do campo")
    ),
    responses(
        (status = 204, description = "Campo removido"),
        (status = 404, description = "Campo não encontrado"),
        (status = 409, description = "Campo usado por uma fórmula")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_field(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Path((object_type, field_id)): Path<(ObjectType, FieldId)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .custom_field_service
        .delete_field(&app_state.db_pool, workspace.0, object_type, field_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/fields/{objectType}/reorder
#[utoipa::path(
    post,
    path = "/api/fields/{objectType}/reorder",
    tag = "Campos customizados",
    params(("objectType" = ObjectType, Path, description = "deal, lead, contact ou company")),
    request_body = ReorderFieldsPayload,
    responses(
        (status = 200, description = "Campos na nova ordem", body = Vec<CustomField>),
        (status = 400, description = "A lista precisa conter cada campo ativo exatamente uma vez")
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_fields(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Path(object_type): Path<ObjectType>,
    Json(payload): Json<ReorderFieldsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let fields = app_state
        .custom_field_service
        .reorder_fields(&app_state.db_pool, workspace.0, object_type, &payload.field_ids)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(fields))
}

// =============================================================================
//  OPÇÕES
// =============================================================================

// GET /api/fields/{objectType}/{fieldId}/options
#[utoipa::path(
    get,
    path = "/api/fields/{objectType}/{fieldId}/options",
    tag = "Campos customizados",
    params(
        ("objectType" = ObjectType, Path, description = "deal, lead, contact ou company"),
        ("fieldId" = i64, Path, description = "ID do campo de seleção")
    ),
    responses(
        (status = 200, description = "Opções ativas", body = Vec<CustomFieldOption>),
        (status = 404, description = "Campo não encontrado"),
        (status = 409, description = "Campo não é de seleção")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_options(
    State(app_state): State<AppState>,
    locale: Locale,
    workspace: WorkspaceContext,
    Path((object_type, field_id)): Path<(ObjectType, FieldId)>,
) -> Result<impl IntoResponse, ApiError> {
    let options = app_state
        .custom_field_service
        .list_options(&app_state.db_pool, workspace.0, object_type, field_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(options))
}

// POST /api/fields/{objectType}/{fieldId}/options
#[utoipa::path(
    post,
    path = "/api/fields/{objectType}/{fieldId}/options",
    tag = "Campos customizados",
    params(
        ("objectType" = ObjectType, Path, description = "deal, lead, contact ou company"),
        ("fieldId" = i64, Path, description = "ID do campo de seleção")
    ),
    request_body = CreateOptionPayload,
    responses(
        (status = 201, description = "Opção criada no fim da lista", body = CustomFieldOption),
        (status = 409, description = "Rótulo já usado neste campo")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_option(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Path((object_type, field_id)): Path<(ObjectType, FieldId)>,
    Json(payload): Json<CreateOptionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let option = app_state
        .custom_field_service
        .add_option(&app_state.db_pool, workspace.0, object_type, field_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(option)))
}

// DELETE /api/fields/{objectType}/{fieldId}/options/{optionId}
#[utoipa::path(
    delete,
    path = "/api/fields/{objectType}/{fieldId}/options/{optionId}",
    tag = "Campos customizados",
    params(
        ("objectType" = ObjectType, Path, description = "deal, lead, contact ou company"),
        ("fieldId" = i64, Path, description = "ID do campo de seleção"),
        ("optionId" = i64, Path, description = "ID da opção")
    ),
    responses(
        (status = 204, description = "Opção removida; as demais são renumeradas"),
        (status = 404, description = "Campo ou opção não encontrados")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_option(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    workspace: WorkspaceContext,
    Path((object_type, field_id, option_id)): Path<(ObjectType, FieldId, i64)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .custom_field_service
        .delete_option(&app_state.db_pool, workspace.0, object_type, field_id, option_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
