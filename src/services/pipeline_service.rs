// src/services/pipeline_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::PipelineRepository,
    models::pipeline::{AddStagePayload, CreatePipelinePayload, Pipeline, PipelineStage, PipelineWithStages},
};

#[derive(Clone)]
pub struct PipelineService {
    repo: PipelineRepository,
}

impl PipelineService {
    pub fn new(repo: PipelineRepository) -> Self {
        Self { repo }
    }

    pub async fn create_pipeline(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        payload: CreatePipelinePayload,
    ) -> Result<Pipeline, AppError> {
        let mut tx = pool.begin().await?;

        // O novo padrão tira o posto do anterior
        if payload.is_default {
            self.repo.clear_default(&mut *tx, workspace_id).await?;
        }
        let pipeline = self
            .repo
            .create_pipeline(&mut *tx, workspace_id, payload.name.trim(), payload.is_default)
            .await?;

        tx.commit().await?;
        Ok(pipeline)
    }

    pub async fn add_stage(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        pipeline_id: i64,
        payload: AddStagePayload,
    ) -> Result<PipelineStage, AppError> {
        let mut tx = pool.begin().await?;

        // Trava o pipeline: duas etapas novas não disputam a mesma posição
        self.repo
            .find_pipeline(&mut *tx, workspace_id, pipeline_id)
            .await?
            .ok_or(AppError::NotFound("pipeline_not_found"))?;

        let total = self.repo.count_stages(&mut *tx, pipeline_id).await?;
        let position = stage_position(payload.position, total);
        if position < total {
            self.repo.shift_stages(&mut *tx, pipeline_id, position).await?;
        }

        let stage = self
            .repo
            .add_stage(&mut *tx, pipeline_id, payload.name.trim(), position, payload.win_probability)
            .await?;

        tx.commit().await?;
        Ok(stage)
    }

    pub async fn list_pipelines(&self, pool: &PgPool, workspace_id: i64) -> Result<Vec<PipelineWithStages>, AppError> {
        let pipelines = self.repo.list_pipelines(pool, workspace_id).await?;
        let ids: Vec<i64> = pipelines.iter().map(|p| p.id).collect();
        let stages = self.repo.list_stages(pool, &ids).await?;

        Ok(pipelines
            .into_iter()
            .map(|pipeline| {
                let own = stages.iter().filter(|s| s.pipeline_id == pipeline.id).cloned().collect();
                PipelineWithStages { pipeline, stages: own }
            })
            .collect())
    }
}

// Sem posição (ou além do fim) = última
fn stage_position(requested: Option<i32>, total: i32) -> i32 {
    requested.map_or(total, |p| p.clamp(0, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_position_defaults_to_the_end() {
        assert_eq!(stage_position(None, 3), 3);
        assert_eq!(stage_position(Some(10), 3), 3);
        assert_eq!(stage_position(Some(-1), 3), 0);
        assert_eq!(stage_position(Some(1), 3), 1);
    }
}
