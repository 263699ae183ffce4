// src/services/files.rs

use std::sync::Arc;

use serde_json::{Value, json};
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    db::{CrmRepository, CustomFieldRepository, FieldValueRepository},
    engine::files::plan_replacement,
    models::{
        audit::AuditAction,
        auth::User,
        custom_field::{CustomField, FieldKind, FileAttachment, UploadedFile},
    },
    services::{access_policy::AccessPolicy, audit::AuditService, storage::FileStorage},
};

/// Bytes + metadados de um download.
pub struct FileDownload {
    pub file: FileAttachment,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Operações sobre anexos já existentes: download, histórico, substituição e exclusão.
#[derive(Clone)]
pub struct FileService {
    value_repo: FieldValueRepository,
    field_repo: CustomFieldRepository,
    crm_repo: CrmRepository,
    access_policy: AccessPolicy,
    audit: AuditService,
    storage: Arc<dyn FileStorage>,
}

impl FileService {
    pub fn new(
        value_repo: FieldValueRepository,
        field_repo: CustomFieldRepository,
        crm_repo: CrmRepository,
        access_policy: AccessPolicy,
        audit: AuditService,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self { value_repo, field_repo, crm_repo, access_policy, audit, storage }
    }

    pub async fn download(&self, pool: &PgPool, actor: &User, file_id: i64) -> Result<FileDownload, AppError> {
        let mut conn = pool.acquire().await?;
        let file = self.find(&mut *conn, file_id).await?;
        self.authorize(&mut *conn, actor, &file, Access::Read).await?;
        drop(conn);

        let bytes = self.storage.read_file(&file.storage_path).await?;
        Ok(FileDownload { file, bytes })
    }

    /// Todas as versões do grupo do arquivo, da mais antiga para a mais nova.
    pub async fn versions(&self, pool: &PgPool, actor: &User, file_id: i64) -> Result<Vec<FileAttachment>, AppError> {
        let mut conn = pool.acquire().await?;
        let file = self.find(&mut *conn, file_id).await?;
        self.authorize(&mut *conn, actor, &file, Access::Read).await?;
        self.value_repo.list_group(&mut *conn, file.group_key).await
    }

    /// Nova versão no mesmo grupo. A anterior continua guardada, só deixa de ser a atual.
    pub async fn replace(
        &self,
        pool: &PgPool,
        actor: &User,
        file_id: i64,
        upload: UploadedFile,
    ) -> Result<FileAttachment, AppError> {
        let mut tx = pool.begin().await?;

        let file = self.find(&mut *tx, file_id).await?;
        let field = self.authorize(&mut *tx, actor, &file, Access::Write).await?;

        let group = self.value_repo.lock_group(&mut *tx, file.group_key).await?;
        let plan = plan_replacement(&group).ok_or(AppError::NotFound("file_not_found"))?;

        let stored = self
            .storage
            .save_file(&upload.bytes, &upload.original_name, &upload.mime_type, field.object_type, field.id)
            .await?;

        self.value_repo.supersede(&mut *tx, &plan.superseded_ids).await?;
        let replacement = self
            .value_repo
            .insert_file(&mut *tx, file.record_id, field.id, &stored, file.group_key, plan.next_version, actor.id)
            .await?;

        let meta = json!({
            "fieldId": field.id,
            "groupKey": file.group_key,
            "fileId": replacement.id,
            "version": replacement.version,
            "supersededIds": plan.superseded_ids,
        });
        self.audit
            .record(
                &mut *tx,
                actor.workspace_id,
                actor.id,
                field.object_type.as_str(),
                file.record_id,
                AuditAction::FileReplace,
                None::<&Value>,
                None::<&Value>,
                Some(meta),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            file_id = replacement.id,
            version = replacement.version,
            group_key = %file.group_key,
            "Anexo substituído"
        );
        Ok(replacement)
    }

    /// Remove o grupo inteiro. Os bytes saem do storage depois do commit, sem garantia.
    pub async fn delete(&self, pool: &PgPool, actor: &User, file_id: i64) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        let file = self.find(&mut *tx, file_id).await?;
        let field = self.authorize(&mut *tx, actor, &file, Access::Write).await?;

        let removed = self.value_repo.delete_group(&mut *tx, file.group_key).await?;

        let meta = json!({
            "fieldId": field.id,
            "groupKey": file.group_key,
            "fileIds": removed.iter().map(|f| f.id).collect::<Vec<_>>(),
        });
        self.audit
            .record(
                &mut *tx,
                actor.workspace_id,
                actor.id,
                field.object_type.as_str(),
                file.record_id,
                AuditAction::FileDelete,
                None::<&Value>,
                None::<&Value>,
                Some(meta),
            )
            .await?;

        tx.commit().await?;

        for version in &removed {
            if let Err(e) = self.storage.delete_file(&version.storage_path).await {
                tracing::warn!(file_id = version.id, error = %e, "Falha ao apagar o arquivo do storage");
            }
        }
        Ok(())
    }

    async fn find(&self, conn: &mut PgConnection, file_id: i64) -> Result<FileAttachment, AppError> {
        self.value_repo
            .find_file(conn, file_id)
            .await?
            .ok_or(AppError::NotFound("file_not_found"))
    }

    // Campo ativo do workspace + registro visível. Leitura de campo mascarado é 404.
    async fn authorize(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        file: &FileAttachment,
        access: Access,
    ) -> Result<CustomField, AppError> {
        let field = self
            .field_repo
            .find_field(&mut *conn, actor.workspace_id, file.field_id, false)
            .await?
            .filter(|f| f.kind == FieldKind::File)
            .ok_or(AppError::NotFound("file_not_found"))?;

        if access == Access::Read && field.is_masked {
            return Err(AppError::NotFound("file_not_found"));
        }

        let owner_id = self
            .crm_repo
            .owner_of(&mut *conn, actor.workspace_id, field.object_type, file.record_id)
            .await?
            .ok_or(AppError::NotFound("file_not_found"))?;
        self.access_policy.ensure_visible(conn, actor, owner_id).await?;

        Ok(field)
    }
}
