// src/db/field_value_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    engine::codec::ScalarColumns,
    models::custom_field::{FieldId, FieldValueRow, FileAttachment, OptionValueRow, StoredFile, UserValueRow},
};

// Os ids de registro se repetem entre as tabelas de cada tipo de objeto.
// Toda leitura filtra também pelos ids de campo do tipo, e isso basta para
// desambiguar: um campo pertence a um único tipo.

// Opção removida deixa de contar como valor do registro
const LOAD_OPTIONS_SQL: &str = r#"
    SELECT v.record_id, v.field_id, v.option_id
    FROM custom_field_value_options v
    JOIN custom_field_options o ON o.id = v.option_id AND o.deleted_at IS NULL
    WHERE v.field_id = ANY($1) AND v.record_id = ANY($2)
    ORDER BY v.record_id, v.field_id, o.position
"#;

#[derive(Clone, Default)]
pub struct FieldValueRepository;

impl FieldValueRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn load_scalars<'e, E>(
        &self,
        executor: E,
        field_ids: &[FieldId],
        record_ids: &[i64],
    ) -> Result<Vec<FieldValueRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, FieldValueRow>(
            r#"
            SELECT record_id, field_id, value_text, value_number, value_date, value_datetime,
                   value_boolean, value_user_id, value_option_id
            FROM custom_field_values
            WHERE field_id = ANY($1) AND record_id = ANY($2)
            ORDER BY record_id, field_id
            "#,
        )
        .bind(field_ids)
        .bind(record_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn load_options<'e, E>(
        &self,
        executor: E,
        field_ids: &[FieldId],
        record_ids: &[i64],
    ) -> Result<Vec<OptionValueRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, OptionValueRow>(LOAD_OPTIONS_SQL)
        .bind(field_ids)
        .bind(record_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn load_users<'e, E>(
        &self,
        executor: E,
        field_ids: &[FieldId],
        record_ids: &[i64],
    ) -> Result<Vec<UserValueRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, UserValueRow>(
            r#"
            SELECT record_id, field_id, user_id
            FROM custom_field_value_users
            WHERE field_id = ANY($1) AND record_id = ANY($2)
            ORDER BY record_id, field_id, user_id
            "#,
        )
        .bind(field_ids)
        .bind(record_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Só as versões atuais. O histórico sai por `list_group`.
    pub async fn load_current_files<'e, E>(
        &self,
        executor: E,
        field_ids: &[FieldId],
        record_ids: &[i64],
    ) -> Result<Vec<FileAttachment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, FileAttachment>(
            r#"
            SELECT id, record_id, field_id, original_name, storage_path, mime_type, size_bytes,
                   group_key, version, is_current, replaced_at, uploaded_by, created_at
            FROM custom_field_files
            WHERE field_id = ANY($1) AND record_id = ANY($2) AND is_current
            ORDER BY record_id, field_id, created_at
            "#,
        )
        .bind(field_ids)
        .bind(record_ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// Upsert pela chave (registro, campo). Colunas nulas limpam o valor anterior.
    pub async fn upsert_scalar<'e, E>(
        &self,
        executor: E,
        record_id: i64,
        field_id: FieldId,
        columns: &ScalarColumns,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO custom_field_values (
                record_id, field_id, value_text, value_number, value_date, value_datetime,
                value_boolean, value_user_id, value_option_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (record_id, field_id) DO UPDATE SET
                value_text = EXCLUDED.value_text,
                value_number = EXCLUDED.value_number,
                value_date = EXCLUDED.value_date,
                value_datetime = EXCLUDED.value_datetime,
                value_boolean = EXCLUDED.value_boolean,
                value_user_id = EXCLUDED.value_user_id,
                value_option_id = EXCLUDED.value_option_id,
                updated_at = NOW()
            "#,
        )
        .bind(record_id)
        .bind(field_id)
        .bind(columns.text.as_deref())
        .bind(columns.number)
        .bind(columns.date)
        .bind(columns.datetime)
        .bind(columns.boolean)
        .bind(columns.user_id)
        .bind(columns.option_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_options<'e, E>(&self, executor: E, record_id: i64, field_id: FieldId) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM custom_field_value_options WHERE record_id = $1 AND field_id = $2")
            .bind(record_id)
            .bind(field_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_options<'e, E>(
        &self,
        executor: E,
        record_id: i64,
        field_id: FieldId,
        option_ids: &[i64],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO custom_field_value_options (record_id, field_id, option_id)
            SELECT $1, $2, UNNEST($3::bigint[])
            "#,
        )
        .bind(record_id)
        .bind(field_id)
        .bind(option_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_users<'e, E>(&self, executor: E, record_id: i64, field_id: FieldId) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM custom_field_value_users WHERE record_id = $1 AND field_id = $2")
            .bind(record_id)
            .bind(field_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn insert_users<'e, E>(
        &self,
        executor: E,
        record_id: i64,
        field_id: FieldId,
        user_ids: &[i64],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO custom_field_value_users (record_id, field_id, user_id)
            SELECT $1, $2, UNNEST($3::bigint[])
            "#,
        )
        .bind(record_id)
        .bind(field_id)
        .bind(user_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    // =========================================================================
    //  ARQUIVOS
    // =========================================================================

    pub async fn insert_file<'e, E>(
        &self,
        executor: E,
        record_id: i64,
        field_id: FieldId,
        stored: &StoredFile,
        group_key: Uuid,
        version: i32,
        uploaded_by: i64,
    ) -> Result<FileAttachment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let file = sqlx::query_as::<_, FileAttachment>(
            r#"
            INSERT INTO custom_field_files (
                record_id, field_id, original_name, storage_path, mime_type, size_bytes,
                group_key, version, is_current, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9)
            RETURNING id, record_id, field_id, original_name, storage_path, mime_type, size_bytes,
                      group_key, version, is_current, replaced_at, uploaded_by, created_at
            "#,
        )
        .bind(record_id)
        .bind(field_id)
        .bind(&stored.original_name)
        .bind(&stored.storage_path)
        .bind(&stored.mime_type)
        .bind(stored.size)
        .bind(group_key)
        .bind(version)
        .bind(uploaded_by)
        .fetch_one(executor)
        .await?;
        Ok(file)
    }

    pub async fn find_file<'e, E>(&self, executor: E, file_id: i64) -> Result<Option<FileAttachment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let file = sqlx::query_as::<_, FileAttachment>(
            r#"
            SELECT id, record_id, field_id, original_name, storage_path, mime_type, size_bytes,
                   group_key, version, is_current, replaced_at, uploaded_by, created_at
            FROM custom_field_files
            WHERE id = $1
            "#,
        )
        .bind(file_id)
        .fetch_optional(executor)
        .await?;
        Ok(file)
    }

    /// Todas as versões do grupo, da mais antiga para a mais nova.
    pub async fn list_group<'e, E>(&self, executor: E, group_key: Uuid) -> Result<Vec<FileAttachment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let files = sqlx::query_as::<_, FileAttachment>(
            r#"
            SELECT id, record_id, field_id, original_name, storage_path, mime_type, size_bytes,
                   group_key, version, is_current, replaced_at, uploaded_by, created_at
            FROM custom_field_files
            WHERE group_key = $1
            ORDER BY version
            "#,
        )
        .bind(group_key)
        .fetch_all(executor)
        .await?;
        Ok(files)
    }

    /// Igual a `list_group`, mas segura as linhas até o fim da transação.
    pub async fn lock_group<'e, E>(&self, executor: E, group_key: Uuid) -> Result<Vec<FileAttachment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let files = sqlx::query_as::<_, FileAttachment>(
            r#"
            SELECT id, record_id, field_id, original_name, storage_path, mime_type, size_bytes,
                   group_key, version, is_current, replaced_at, uploaded_by, created_at
            FROM custom_field_files
            WHERE group_key = $1
            ORDER BY version
            FOR UPDATE
            "#,
        )
        .bind(group_key)
        .fetch_all(executor)
        .await?;
        Ok(files)
    }

    pub async fn supersede<'e, E>(&self, executor: E, file_ids: &[i64]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE custom_field_files SET is_current = FALSE, replaced_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(file_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_group<'e, E>(&self, executor: E, group_key: Uuid) -> Result<Vec<FileAttachment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let removed = sqlx::query_as::<_, FileAttachment>(
            r#"
            DELETE FROM custom_field_files
            WHERE group_key = $1
            RETURNING id, record_id, field_id, original_name, storage_path, mime_type, size_bytes,
                      group_key, version, is_current, replaced_at, uploaded_by, created_at
            "#,
        )
        .bind(group_key)
        .fetch_all(executor)
        .await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::files::plan_replacement;
    use sqlx::PgPool;

    #[test]
    fn stored_options_skip_deleted_ones() {
        assert!(LOAD_OPTIONS_SQL.contains("JOIN custom_field_options o ON o.id = v.option_id AND o.deleted_at IS NULL"));
    }

    fn stored(name: &str) -> StoredFile {
        StoredFile {
            original_name: name.to_string(),
            storage_path: format!("company/1/{name}"),
            mime_type: "application/pdf".into(),
            size: 3,
        }
    }

    #[sqlx::test]
    #[ignore = "precisa de DATABASE_URL apontando para um Postgres"]
    async fn replacing_a_file_leaves_one_current_version(pool: PgPool) {
        let workspace_id: i64 = sqlx::query_scalar("INSERT INTO workspaces (name) VALUES ('Teste') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();
        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (workspace_id, email, name, password_hash, role) \
             VALUES ($1, 'ana@teste.com', 'Ana', 'x', 'A') RETURNING id",
        )
        .bind(workspace_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let field_id: i64 = sqlx::query_scalar(
            "INSERT INTO custom_fields (workspace_id, object_type, label, kind) \
             VALUES ($1, 'COMPANY', 'Contrato', 'file') RETURNING id",
        )
        .bind(workspace_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let repo = FieldValueRepository::new();
        let key = Uuid::new_v4();
        let first = repo.insert_file(&pool, 1, field_id, &stored("v1.pdf"), key, 1, user_id).await.unwrap();

        for name in ["v2.pdf", "v3.pdf"] {
            let mut tx = pool.begin().await.unwrap();
            let group = repo.lock_group(&mut *tx, key).await.unwrap();
            let plan = plan_replacement(&group).unwrap();
            repo.supersede(&mut *tx, &plan.superseded_ids).await.unwrap();
            repo.insert_file(&mut *tx, 1, field_id, &stored(name), key, plan.next_version, user_id)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        let versions = repo.list_group(&pool, key).await.unwrap();
        assert_eq!(versions.len(), 3);

        let current: Vec<_> = versions.iter().filter(|f| f.is_current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].version, 3);
        assert_eq!(current[0].original_name, "v3.pdf");

        let old = versions.iter().find(|f| f.id == first.id).unwrap();
        assert!(!old.is_current);
        assert!(old.replaced_at.is_some());
    }
}
