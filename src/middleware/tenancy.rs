// src/middleware/tenancy.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

// Workspace da requisição. Vem do usuário autenticado (nunca de um header),
// então todo acesso a dados fica preso ao workspace do token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceContext(pub i64);

impl<S> FromRequestParts<S> for WorkspaceContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<WorkspaceContext>().copied().ok_or_else(|| {
            let app_state = AppState::from_ref(state);
            AppError::InvalidToken.to_api_error(&Locale::from_headers(&parts.headers), &app_state.i18n_store)
        })
    }
}
