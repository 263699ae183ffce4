// src/handlers/files.rs

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, submission::read_single_file},
    models::custom_field::FileAttachment,
};

// GET /api/files/{id}/download
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "Arquivos",
    params(("id" = i64, Path, description = "ID do anexo (qualquer versão)")),
    responses(
        (status = 200, description = "Conteúdo do arquivo", content_type = "application/octet-stream"),
        (status = 403, description = "Registro de outro dono"),
        (status = 404, description = "Anexo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_file(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let download = app_state
        .file_service
        .download(&app_state.db_pool, &user, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let disposition = format!("attachment; filename=\"{}\"", download.file.original_name.replace('"', "'"));
    Ok((
        [(header::CONTENT_TYPE, download.file.mime_type), (header::CONTENT_DISPOSITION, disposition)],
        download.bytes,
    ))
}

// GET /api/files/{id}/versions
#[utoipa::path(
    get,
    path = "/api/files/{id}/versions",
    tag = "Arquivos",
    params(("id" = i64, Path, description = "ID de qualquer versão do anexo")),
    responses(
        (status = 200, description = "Histórico de versões, da mais antiga para a mais nova", body = Vec<FileAttachment>),
        (status = 404, description = "Anexo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_versions(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<FileAttachment>>, ApiError> {
    let versions = app_state
        .file_service
        .versions(&app_state.db_pool, &user, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(versions))
}

// PUT /api/files/{id}
#[utoipa::path(
    put,
    path = "/api/files/{id}",
    tag = "Arquivos",
    params(("id" = i64, Path, description = "ID do anexo a substituir")),
    request_body(content = Vec<u8>, content_type = "multipart/form-data", description = "Parte `file` com o novo conteúdo"),
    responses(
        (status = 200, description = "Nova versão atual", body = FileAttachment),
        (status = 404, description = "Anexo não encontrado"),
        (status = 413, description = "Arquivo maior que o permitido")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_file(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<FileAttachment>, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let upload = read_single_file(&mut multipart, app_state.config.max_upload_bytes)
        .await
        .map_err(to_api)?;

    let file = app_state
        .file_service
        .replace(&app_state.db_pool, &user, id, upload)
        .await
        .map_err(to_api)?;

    Ok(Json(file))
}

// DELETE /api/files/{id}
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "Arquivos",
    params(("id" = i64, Path, description = "ID de qualquer versão do anexo")),
    responses(
        (status = 204, description = "Anexo e todas as versões removidos"),
        (status = 404, description = "Anexo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_file(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    app_state
        .file_service
        .delete(&app_state.db_pool, &user, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
