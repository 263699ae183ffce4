// src/handlers/contacts.rs

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
    models::crm::{Contact, ContactPayload, ListQuery, RecordView},
};

// GET /api/contacts
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "Contatos",
    params(ListQuery),
    responses(
        (status = 200, description = "Contatos visíveis para o usuário", body = [RecordView<Contact>])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_contacts(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RecordView<Contact>>>, ApiError> {
    records::list::<Contact>(&app_state, &locale, &user, &query).await
}

// POST /api/contacts
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "Contatos",
    request_body(
        content = ContactPayload,
        description = "JSON puro, ou multipart com a parte `payload` e arquivos em `file:<fieldId>`"
    ),
    responses(
        (status = 201, description = "Contato criado", body = RecordView<Contact>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Dono fora do alcance do usuário"),
        (status = 404, description = "Empresa informada não existe"),
    ),
    security(("api_jwt" = []))
)]
pub async fn create_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    submission: RecordSubmission<ContactPayload>,
) -> Result<(StatusCode, Json<RecordView<Contact>>), ApiError> {
    records::create::<Contact>(&app_state, &locale, &user, submission).await
}

// GET /api/contacts/{id}
#[utoipa::path(
    get,
    path = "/api/contacts/{id}",
    tag = "Contatos",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 200, description = "Contato com os campos customizados", body = RecordView<Contact>),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<RecordView<Contact>>, ApiError> {
    records::get::<Contact>(&app_state, &locale, &user, id).await
}

// PUT /api/contacts/{id}
#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    tag = "Contatos",
    params(("id" = i64, Path, description = "ID do registro")),
    request_body(
        content = ContactPayload,
        description = "Campos customizados omitidos mantêm o valor gravado"
    ),
    responses(
        (status = 200, description = "Contato atualizado", body = RecordView<Contact>),
        (status = 400, description = "Dados ou campos customizados inválidos"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    submission: RecordSubmission<ContactPayload>,
) -> Result<Json<RecordView<Contact>>, ApiError> {
    records::update::<Contact>(&app_state, &locale, &user, id, submission).await
}

// DELETE /api/contacts/{id}
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "Contatos",
    params(("id" = i64, Path, description = "ID do registro")),
    responses(
        (status = 204, description = "Contato removido"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_contact(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    records::delete::<Contact>(&app_state, &locale, &user, id).await
}
