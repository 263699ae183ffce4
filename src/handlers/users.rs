// src/handlers/users.rs

use axum::{Json, extract::State};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{User, UserSummary},
};

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Usuários",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Token inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

// GET /api/users/assignable
#[utoipa::path(
    get,
    path = "/api/users/assignable",
    tag = "Usuários",
    responses(
        (status = 200, description = "Usuários que podem ser donos ou escolhidos em campos de usuário", body = Vec<UserSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_assignable(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut conn = app_state.db_pool.acquire().await.map_err(|e| to_api(e.into()))?;
    let users = app_state
        .access_policy
        .assignable_users(&mut *conn, &user)
        .await
        .map_err(to_api)?;

    Ok(Json(users))
}
