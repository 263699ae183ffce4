// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::auth::{User, UserRole, UserSummary},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Login acontece fora de qualquer transação, então usa o pool direto
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, workspace_id, team_id, email, name, password_hash,
                   role, is_active, created_at, updated_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i64) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, workspace_id, team_id, email, name, password_hash,
                   role, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(maybe_user)
    }

    /// Usuários ativos do workspace, opcionalmente restritos a uma equipe.
    pub async fn list_active<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        team_id: Option<i64>,
    ) -> Result<Vec<UserSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email, role, team_id
            FROM users
            WHERE workspace_id = $1
              AND is_active
              AND ($2::bigint IS NULL OR team_id = $2)
            ORDER BY name
            "#,
        )
        .bind(workspace_id)
        .bind(team_id)
        .fetch_all(executor)
        .await?;
        Ok(users)
    }

    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn create_workspace<'e, E>(&self, executor: E, name: &str) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: i64 = sqlx::query_scalar("INSERT INTO workspaces (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(executor)
            .await?;
        Ok(id)
    }

    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        email: &str,
        name: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (workspace_id, email, name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, workspace_id, team_id, email, name, password_hash,
                      role, is_active, created_at, updated_at
            "#,
        )
        .bind(workspace_id)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, &[("users_email_key", "email_already_exists")]))
    }
}
