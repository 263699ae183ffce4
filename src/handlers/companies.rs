// src/handlers/companies.rs

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
    models::crm::{Company, CompanyPayload, ListQuery, RecordView},
};

// GET /api/companies
#[utoipa::path(
    get,
    path = "/api/companies",
    tag = "Empresas",
    params(ListQuery),
    responses(
        (status = 200, description = "Empresas visíveis para o usuário", body = [RecordView<Company>])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_companies(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RecordView<Company>>>, ApiError> {
    records::list::<Company>(&app_state, &locale, &user, &query).await
}

// POST /api/companies
#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "Empresas",
    request_body(
        content = CompanyPayload,
        description = "JSON puro, ou multipart com a parte `payload` e arquivos em `file:<fieldId>`"
    ),
    responses(
        (status = 201, description = "Empresa criada", body = RecordView<Company>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Dono fora do alcance do usuário"),
    ),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    submission: RecordSubmission<CompanyPayload>,
) -> Result<(StatusCode, Json<RecordView<Company>>), ApiError> {
    records::create::<Company>(&app_state, &locale, &user, submission).await
}

// GET /api/companies/{id}
#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    tag = "Empresas",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 200, description = "Empresa com os campos customizados", body = RecordView<Company>),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RecordView<Company>>, ApiError> {
    records::get::<Company>(&app_state, &locale, &user, id).await
}

// PUT /api/companies/{id}
#[utoipa::path(
    put,
    path = "/api/companies/{id}",
    tag = "Empresas",
    params(("id" = i64, Path, description = "ID do registro")),
    request_body(
        content = CompanyPayload,
        description = "Campos customizados omitidos mantêm o valor gravado"
    ),
    responses(
        (status = 200, description = "Empresa atualizada", body = RecordView<Company>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_company(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    submission: RecordSubmission<CompanyPayload>,
) -> Result<Json<RecordView<Company>>, ApiError> {
    records::update::<Company>(&app_state, &locale, &user, id, submission).await
}

// DELETE /api/companies/{id}
#[utoipa::path(
    delete,
    path = "/api/companies/{id}",
    tag = "Empresas",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 204, description = "Empresa removida"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_company(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    records::delete::<Company>(&app_state, &locale, &user, id).await
}
