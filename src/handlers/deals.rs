// src/handlers/deals.rs

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
    models::crm::{Deal, DealPayload, ListQuery, RecordView},
};

// GET /api/deals
#[utoipa::path(
    get,
    path = "/api/deals",
    tag = "Negócios",
    params(ListQuery),
    responses(
        (status = 200, description = "Negócios visíveis para o usuário", body = [RecordView<Deal>])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_deals(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RecordView<Deal>>>, ApiError> {
    records::list::<Deal>(&app_state, &locale, &user, &query).await
}

// POST /api/deals
#[utoipa::path(
    post,
    path = "/api/deals",
    tag = "Negócios",
    request_body(
        content = DealPayload,
        description = "JSON puro, ou multipart com a parte `payload` e arquivos em `file:<fieldId>`"
    ),
    responses(
        (status = 201, description = "Negócio criado", body = RecordView<Deal>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Dono fora do alcance do usuário"),
        (status = 404, description = "Pipeline, etapa, empresa ou contato não encontrado"),
    ),
    security(("api_jwt" = []))
)]
pub async fn create_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    submission: RecordSubmission<DealPayload>,
) -> Result<(StatusCode, Json<RecordView<Deal>>), ApiError> {
    records::create::<Deal>(&app_state, &locale, &user, submission).await
}

// GET /api/deals/{id}
#[utoipa::path(
    get,
    path = "/api/deals/{id}",
    tag = "Negócios",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 200, description = "Negócio com os campos customizados", body = RecordView<Deal>),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RecordView<Deal>>, ApiError> {
    records::get::<Deal>(&app_state, &locale, &user, id).await
}

// PUT /api/deals/{id}
#[utoipa::path(
    put,
    path = "/api/deals/{id}",
    tag = "Negócios",
    params(("id" = i64, Path, description = "ID do registro")),
    request_body(
        content = DealPayload,
        description = "Campos customizados omitidos mantêm o valor gravado"
    ),
    responses(
        (status = 200, description = "Negócio atualizado", body = RecordView<Deal>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    submission: RecordSubmission<DealPayload>,
) -> Result<Json<RecordView<Deal>>, ApiError> {
    records::update::<Deal>(&app_state, &locale, &user, id, submission).await
}

// DELETE /api/deals/{id}
#[utoipa::path(
    delete,
    path = "/api/deals/{id}",
    tag = "Negócios",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 204, description = "Negócio removido"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_deal(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    records::delete::<Deal>(&app_state, &locale, &user, id).await
}
