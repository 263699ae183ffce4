// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::UserRole,
};

/// 1. O Trait que define uma exigência de papel
pub trait RoleRequirement: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
    /// Chave da mensagem quando o papel não basta.
    fn denial() -> &'static str;
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);

        let error = match parts.extensions.get::<AuthenticatedUser>() {
            None => AppError::InvalidToken,
            Some(user) if T::allows(user.0.role) => return Ok(RequireRole(PhantomData)),
            Some(user) => {
                tracing::info!(user_id = user.0.id, role = ?user.0.role, "Acesso negado por papel");
                AppError::Forbidden(T::denial())
            }
        };

        Err(error.to_api_error(&locale, &app_state.i18n_store))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

/// Configuração de campos e pipelines: só papel A.
pub struct AdminOnly;
impl RoleRequirement for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Admin
    }

    fn denial() -> &'static str {
        "admin_only"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_only_accepts_just_role_a() {
        assert!(AdminOnly::allows(UserRole::Admin));
        assert!(!AdminOnly::allows(UserRole::Manager));
        assert!(!AdminOnly::allows(UserRole::Member));
    }
}
