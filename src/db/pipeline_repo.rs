// src/db/pipeline_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    models::pipeline::{Pipeline, PipelineStage},
};

#[derive(Clone, Default)]
pub struct PipelineRepository;

impl PipelineRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_pipeline<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        name: &str,
        is_default: bool,
    ) -> Result<Pipeline, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pipeline = sqlx::query_as::<_, Pipeline>(
            r#"
            INSERT INTO pipelines (workspace_id, name, is_default)
            VALUES ($1, $2, $3)
            RETURNING id, workspace_id, name, is_default, created_at
            "#,
        )
        .bind(workspace_id)
        .bind(name)
        .bind(is_default)
        .fetch_one(executor)
        .await?;

        Ok(pipeline)
    }

    /// Só pode existir um pipeline padrão por workspace.
    pub async fn clear_default<'e, E>(&self, executor: E, workspace_id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE pipelines SET is_default = FALSE WHERE workspace_id = $1 AND is_default")
            .bind(workspace_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn find_pipeline<'e, E>(&self, executor: E, workspace_id: i64, id: i64) -> Result<Option<Pipeline>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pipeline = sqlx::query_as::<_, Pipeline>(
            r#"
            SELECT id, workspace_id, name, is_default, created_at
            FROM pipelines
            WHERE workspace_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(workspace_id)
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(pipeline)
    }

    pub async fn list_pipelines<'e, E>(&self, executor: E, workspace_id: i64) -> Result<Vec<Pipeline>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pipelines = sqlx::query_as::<_, Pipeline>(
            r#"
            SELECT id, workspace_id, name, is_default, created_at
            FROM pipelines
            WHERE workspace_id = $1
            ORDER BY is_default DESC, created_at
            "#,
        )
        .bind(workspace_id)
        .fetch_all(executor)
        .await?;
        Ok(pipelines)
    }

    pub async fn list_stages<'e, E>(&self, executor: E, pipeline_ids: &[i64]) -> Result<Vec<PipelineStage>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stages = sqlx::query_as::<_, PipelineStage>(
            r#"
            SELECT id, pipeline_id, name, position, win_probability
            FROM pipeline_stages
            WHERE pipeline_id = ANY($1)
            ORDER BY pipeline_id, position, id
            "#,
        )
        .bind(pipeline_ids)
        .fetch_all(executor)
        .await?;
        Ok(stages)
    }

    pub async fn shift_stages<'e, E>(&self, executor: E, pipeline_id: i64, from_position: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE pipeline_stages SET position = position + 1 WHERE pipeline_id = $1 AND position >= $2")
            .bind(pipeline_id)
            .bind(from_position)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count_stages<'e, E>(&self, executor: E, pipeline_id: i64) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i32 = sqlx::query_scalar("SELECT COUNT(*)::int FROM pipeline_stages WHERE pipeline_id = $1")
            .bind(pipeline_id)
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    pub async fn add_stage<'e, E>(
        &self,
        executor: E,
        pipeline_id: i64,
        name: &str,
        position: i32,
        win_probability: i16,
    ) -> Result<PipelineStage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stage = sqlx::query_as::<_, PipelineStage>(
            r#"
            INSERT INTO pipeline_stages (pipeline_id, name, position, win_probability)
            VALUES ($1, $2, $3, $4)
            RETURNING id, pipeline_id, name, position, win_probability
            "#,
        )
        .bind(pipeline_id)
        .bind(name)
        .bind(position)
        .bind(win_probability)
        .fetch_one(executor)
        .await?;
        Ok(stage)
    }
}
