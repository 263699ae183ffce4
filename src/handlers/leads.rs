// src/handlers/leads.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::records,
    middleware::{auth::AuthenticatedUser, i18n::Locale, submission::RecordSubmission},
    models::crm::{Lead, LeadPayload, ListQuery, RecordView},
};

// GET /api/leads
#[utoipa::path(
    get,
    path = "/api/leads",
    tag = "Leads",
    params(ListQuery),
    responses(
        (status = 200, description = "Leads visíveis para o usuário", body = [RecordView<Lead>])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RecordView<Lead>>>, ApiError> {
    records::list::<Lead>(&app_state, &locale, &user, &query).await
}

// POST /api/leads
#[utoipa::path(
    post,
    path = "/api/leads",
    tag = "Leads",
    request_body(
        content = LeadPayload,
        description = "JSON puro, ou multipart com a parte `payload` e arquivos em `file:<fieldId>`"
    ),
    responses(
        (status = 201, description = "Lead criado", body = RecordView<Lead>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Dono fora do alcance do usuário"),
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    submission: RecordSubmission<LeadPayload>,
) -> Result<(StatusCode, Json<RecordView<Lead>>), ApiError> {
    records::create::<Lead>(&app_state, &locale, &user, submission).await
}

// GET /api/leads/{id}
#[utoipa::path(
    get,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 200, description = "Lead com os campos customizados", body = RecordView<Lead>),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RecordView<Lead>>, ApiError> {
    records::get::<Lead>(&app_state, &locale, &user, id).await
}

// PUT /api/leads/{id}
#[utoipa::path(
    put,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do registro")),
    request_body(
        content = LeadPayload,
        description = "Campos customizados omitidos mantêm o valor gravado"
    ),
    responses(
        (status = 200, description = "Lead atualizado", body = RecordView<Lead>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    submission: RecordSubmission<LeadPayload>,
) -> Result<Json<RecordView<Lead>>, ApiError> {
    records::update::<Lead>(&app_state, &locale, &user, id, submission).await
}

// DELETE /api/leads/{id}
#[utoipa::path(
    delete,
    path = "/api/leads/{id}",
    tag = "Leads",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 204, description = "Lead removido"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    records::delete::<Lead>(&app_state, &locale, &user, id).await
}
