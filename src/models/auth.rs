// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

// Mapeia o CREATE TYPE user_role do banco.
// A = administrador (workspace inteiro), B = gestor (própria equipe), C = membro (só o próprio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role")]
pub enum UserRole {
    #[sqlx(rename = "A")]
    #[serde(rename = "A")]
    Admin,
    #[sqlx(rename = "B")]
    #[serde(rename = "B")]
    Manager,
    #[sqlx(rename = "C")]
    #[serde(rename = "C")]
    Member,
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = 1)]
    pub id: i64,
    pub workspace_id: i64,
    pub team_id: Option<i64>,
    #[schema(example = "ana@empresa.com")]
    pub email: String,
    #[schema(example = "Ana Souza")]
    pub name: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Versão enxuta usada em listas de atribuição.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub team_id: Option<i64>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "ana@empresa.com")]
    pub email: String,
    #[validate(length(min = 6, message = "too_short"))]
    #[schema(example = "segredo123")]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64, // Subject (ID do usuário)
    pub wsp: i64, // Workspace do usuário no momento do login
    pub exp: usize,
    pub iat: usize,
}
