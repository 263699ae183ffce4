// src/db/custom_field_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::{
        db_utils::{map_unique_violation, normalize_label},
        error::AppError,
    },
    models::custom_field::{CustomField, CustomFieldOption, FieldId, FieldKind, ObjectType},
};

/// Valores editáveis de uma definição (tipo e object_type são fixos).
pub struct FieldAttributes<'a> {
    pub label: &'a str,
    pub is_required: bool,
    pub is_masked: bool,
    pub show_in_create: bool,
    pub show_in_pipeline: bool,
    pub formula: Option<&'a str>,
}

#[derive(Clone, Default)]
pub struct CustomFieldRepository;

impl CustomFieldRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  DEFINIÇÕES
    // =========================================================================

    /// Campos ativos do tipo de objeto, na ordem de exibição.
    pub async fn list_fields<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        object_type: ObjectType,
    ) -> Result<Vec<CustomField>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let fields = sqlx::query_as::<_, CustomField>(
            r#"
            SELECT id, workspace_id, object_type, label, kind, is_required, is_masked,
                   show_in_create, show_in_pipeline, position, formula,
                   created_at, updated_at, deleted_at
            FROM custom_fields
            WHERE workspace_id = $1 AND object_type = $2 AND deleted_at IS NULL
            ORDER BY position, id
            "#,
        )
        .bind(workspace_id)
        .bind(object_type)
        .fetch_all(executor)
        .await?;
        Ok(fields)
    }

    /// Busca um campo ativo em qualquer tipo de objeto do workspace.
    /// `lock` trava a linha do campo até o fim da transação (opções concorrentes).
    pub async fn find_field<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        field_id: FieldId,
        lock: bool,
    ) -> Result<Option<CustomField>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let field = sqlx::query_as::<_, CustomField>(&find_field_sql(lock))
            .bind(workspace_id)
            .bind(field_id)
            .fetch_optional(executor)
            .await?;
        Ok(field)
    }

    /// Trava as definições do tipo para renumerar posições sem corrida.
    pub async fn lock_fields<'e, E>(&self, executor: E, workspace_id: i64, object_type: ObjectType) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            SELECT id FROM custom_fields
            WHERE workspace_id = $1 AND object_type = $2 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(workspace_id)
        .bind(object_type)
        .fetch_all(executor)
        .await?;
        Ok(())
    }

    /// Abre espaço na posição pedida empurrando os seguintes.
    pub async fn shift_positions<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        object_type: ObjectType,
        from_position: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE custom_fields SET position = position + 1
            WHERE workspace_id = $1 AND object_type = $2 AND deleted_at IS NULL AND position >= $3
            "#,
        )
        .bind(workspace_id)
        .bind(object_type)
        .bind(from_position)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Deixa as posições densas (0..n) preservando a ordem atual.
    pub async fn renumber_fields<'e, E>(&self, executor: E, workspace_id: i64, object_type: ObjectType) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE custom_fields f
            SET position = r.new_position
            FROM (
                SELECT id, (ROW_NUMBER() OVER (ORDER BY position, id) - 1)::int AS new_position
                FROM custom_fields
                WHERE workspace_id = $1 AND object_type = $2 AND deleted_at IS NULL
            ) r
            WHERE f.id = r.id AND f.position <> r.new_position
            "#,
        )
        .bind(workspace_id)
        .bind(object_type)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_position<'e, E>(&self, executor: E, field_id: FieldId, position: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE custom_fields SET position = $2, updated_at = NOW() WHERE id = $1")
            .bind(field_id)
            .bind(position)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_field<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        object_type: ObjectType,
        kind: FieldKind,
        attrs: &FieldAttributes<'_>,
        position: i32,
    ) -> Result<CustomField, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let field = sqlx::query_as::<_, CustomField>(
            r#"
            INSERT INTO custom_fields (
                workspace_id, object_type, label, kind, is_required, is_masked,
                show_in_create, show_in_pipeline, position, formula
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, workspace_id, object_type, label, kind, is_required, is_masked,
                      show_in_create, show_in_pipeline, position, formula,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(object_type)
        .bind(attrs.label)
        .bind(kind)
        .bind(attrs.is_required)
        .bind(attrs.is_masked)
        .bind(attrs.show_in_create)
        .bind(attrs.show_in_pipeline)
        .bind(position)
        .bind(attrs.formula)
        .fetch_one(executor)
        .await?;
        Ok(field)
    }

    pub async fn update_field<'e, E>(
        &self,
        executor: E,
        field_id: FieldId,
        attrs: &FieldAttributes<'_>,
    ) -> Result<CustomField, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let field = sqlx::query_as::<_, CustomField>(
            r#"
            UPDATE custom_fields
            SET label = $2, is_required = $3, is_masked = $4,
                show_in_create = $5, show_in_pipeline = $6, formula = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, workspace_id, object_type, label, kind, is_required, is_masked,
                      show_in_create, show_in_pipeline, position, formula,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(field_id)
        .bind(attrs.label)
        .bind(attrs.is_required)
        .bind(attrs.is_masked)
        .bind(attrs.show_in_create)
        .bind(attrs.show_in_pipeline)
        .bind(attrs.formula)
        .fetch_one(executor)
        .await?;
        Ok(field)
    }

    pub async fn soft_delete_field<'e, E>(&self, executor: E, field_id: FieldId) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE custom_fields SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(field_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  OPÇÕES
    // =========================================================================

    /// Opções ativas dos campos informados, ordenadas por campo e posição.
    pub async fn list_options<'e, E>(&self, executor: E, field_ids: &[FieldId]) -> Result<Vec<CustomFieldOption>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let options = sqlx::query_as::<_, CustomFieldOption>(
            r#"
            SELECT id, field_id, label, position, created_at, deleted_at
            FROM custom_field_options
            WHERE field_id = ANY($1) AND deleted_at IS NULL
            ORDER BY field_id, position, id
            "#,
        )
        .bind(field_ids)
        .fetch_all(executor)
        .await?;
        Ok(options)
    }

    pub async fn label_taken<'e, E>(&self, executor: E, field_id: FieldId, label: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM custom_field_options
                WHERE field_id = $1 AND deleted_at IS NULL AND lower(btrim(label)) = $2
            )
            "#,
        )
        .bind(field_id)
        .bind(normalize_label(label))
        .fetch_one(executor)
        .await?;
        Ok(taken)
    }

    pub async fn insert_option<'e, E>(&self, executor: E, field_id: FieldId, label: &str) -> Result<CustomFieldOption, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CustomFieldOption>(
            r#"
            INSERT INTO custom_field_options (field_id, label, position)
            VALUES (
                $1, $2,
                (SELECT COUNT(*)::int FROM custom_field_options WHERE field_id = $1 AND deleted_at IS NULL)
            )
            RETURNING id, field_id, label, position, created_at, deleted_at
            "#,
        )
        .bind(field_id)
        .bind(label.trim())
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, &[("uq_custom_field_options_label", "option_label_taken")]))
    }

    /// Devolve `false` se a opção não existe (ou já foi removida) neste campo.
    pub async fn soft_delete_option<'e, E>(&self, executor: E, field_id: FieldId, option_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE custom_field_options SET deleted_at = NOW()
            WHERE id = $1 AND field_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(option_id)
        .bind(field_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn renumber_options<'e, E>(&self, executor: E, field_id: FieldId) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE custom_field_options o
            SET position = r.new_position
            FROM (
                SELECT id, (ROW_NUMBER() OVER (ORDER BY position, id) - 1)::int AS new_position
                FROM custom_field_options
                WHERE field_id = $1 AND deleted_at IS NULL
            ) r
            WHERE o.id = r.id AND o.position <> r.new_position
            "#,
        )
        .bind(field_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}

fn find_field_sql(lock: bool) -> String {
    format!(
        "SELECT id, workspace_id, object_type, label, kind, is_required, is_masked, \
         show_in_create, show_in_pipeline, position, formula, created_at, updated_at, deleted_at \
         FROM custom_fields WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL{}",
        if lock { " FOR UPDATE" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lookup_locks_only_when_asked() {
        assert!(find_field_sql(true).ends_with("deleted_at IS NULL FOR UPDATE"));
        assert!(!find_field_sql(false).contains("FOR UPDATE"));
    }
}
