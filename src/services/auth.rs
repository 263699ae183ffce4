// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User, UserRole},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    jwt_ttl_days: i64,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, jwt_ttl_days: i64) -> Self {
        Self { user_repo, jwt_secret, jwt_ttl_days }
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        // Usuário desativado recebe a mesma resposta de senha errada
        if !is_password_valid || !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, workspace_id = user.workspace_id, "Login efetuado");
        self.create_token(&user)
    }

    /// Decodifica o token e recarrega o usuário. Workspace do token precisa bater com o atual.
    pub async fn validate_token(&self, pool: &PgPool, token: &str) -> Result<User, AppError> {
        let claims = self.decode_claims(token)?;

        let user = self
            .user_repo
            .find_by_id(pool, claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !user.is_active || user.workspace_id != claims.wsp {
            return Err(AppError::InvalidToken);
        }
        Ok(user)
    }

    /// Cria o primeiro administrador (e o workspace dele) quando não há nenhum usuário.
    pub async fn ensure_bootstrap_admin(&self, pool: &PgPool, email: &str, password: &str) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        if self.user_repo.count(&mut *tx).await? > 0 {
            return Ok(());
        }

        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let workspace_id = self.user_repo.create_workspace(&mut *tx, "Workspace principal").await?;
        let admin = self
            .user_repo
            .create_user(&mut *tx, workspace_id, email, "Administrador", &hashed_password, UserRole::Admin)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = admin.id, workspace_id, "👤 Administrador inicial criado");
        Ok(())
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.jwt_ttl_days);

        let claims = Claims {
            sub: user.id,
            wsp: user.workspace_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    // Pool preguiçoso: nunca conecta nos testes abaixo
    fn service(secret: &str, ttl_days: i64) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/crm_test")
            .unwrap();
        AuthService::new(UserRepository::new(pool), secret.to_string(), ttl_days)
    }

    fn user() -> User {
        User {
            id: 42,
            workspace_id: 7,
            team_id: None,
            email: "ana@crm.dev".into(),
            name: "Ana".into(),
            password_hash: String::new(),
            role: UserRole::Member,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn token_carries_user_and_workspace() {
        let auth = service("segredo", 7);
        let token = auth.create_token(&user()).unwrap();
        let claims = auth.decode_claims(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.wsp, 7);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let token = service("um", 7).create_token(&user()).unwrap();
        assert!(matches!(service("outro", 7).decode_claims(&token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = service("segredo", -2);
        let token = auth.create_token(&user()).unwrap();
        assert!(matches!(auth.decode_claims(&token), Err(AppError::InvalidToken)));
    }
}
