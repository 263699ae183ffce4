// src/services/crm_service.rs

use serde_json::{Value, json};
use sqlx::{PgConnection, PgPool};

use crate::{
    common::error::AppError,
    db::{CrmRecord, CrmRepository},
    models::{
        audit::AuditAction,
        auth::User,
        crm::{ListQuery, RecordView},
        custom_field::{FieldId, FileAttachment, UploadedFile},
    },
    services::{access_policy::AccessPolicy, audit::AuditService, field_values::FieldValueService},
};

/// Create/update/leitura dos quatro tipos de registro.
/// O que muda entre eles fica em `CrmRecord`; o resto é o mesmo fluxo.
#[derive(Clone)]
pub struct RecordService {
    repo: CrmRepository,
    field_values: FieldValueService,
    access_policy: AccessPolicy,
    audit: AuditService,
}

impl RecordService {
    pub fn new(
        repo: CrmRepository,
        field_values: FieldValueService,
        access_policy: AccessPolicy,
        audit: AuditService,
    ) -> Self {
        Self { repo, field_values, access_policy, audit }
    }

    pub async fn create<T: CrmRecord>(
        &self,
        pool: &PgPool,
        actor: &User,
        payload: T::Payload,
        uploads: Vec<(FieldId, UploadedFile)>,
    ) -> Result<RecordView<T>, AppError> {
        let workspace_id = actor.workspace_id;
        let mut tx = pool.begin().await?;

        // Sem dono explícito, o registro fica com quem criou
        let owner_id = T::requested_owner(&payload).unwrap_or(actor.id);
        self.access_policy.ensure_can_assign(&mut *tx, actor, owner_id).await?;
        T::check_references(&mut *tx, workspace_id, &payload).await?;

        // Toda a validação roda antes da primeira escrita
        let prepared = self
            .field_values
            .prepare(&mut *tx, actor, T::OBJECT_TYPE, None, T::custom_fields(&payload), uploads)
            .await?;
        let warnings = prepared.warnings().to_vec();

        let record = T::insert(&mut *tx, workspace_id, owner_id, &payload).await?;
        let created_files = self.field_values.persist(&mut *tx, record.id(), actor, prepared).await?;

        let view = self.view(&mut *tx, workspace_id, record, warnings).await?;
        self.audit
            .record(
                &mut *tx,
                workspace_id,
                actor.id,
                T::OBJECT_TYPE.as_str(),
                view.record.id(),
                AuditAction::Create,
                None::<&Value>,
                Some(&view),
                None,
            )
            .await?;
        self.audit_uploads::<T>(&mut *tx, actor, view.record.id(), &created_files).await?;

        tx.commit().await?;

        tracing::info!(
            record_id = view.record.id(),
            object_type = T::OBJECT_TYPE.as_str(),
            workspace_id,
            "Registro criado"
        );
        Ok(view)
    }

    /// PUT: colunas fixas substituídas; campos customizados só os enviados.
    pub async fn update<T: CrmRecord>(
        &self,
        pool: &PgPool,
        actor: &User,
        id: i64,
        payload: T::Payload,
        uploads: Vec<(FieldId, UploadedFile)>,
    ) -> Result<RecordView<T>, AppError> {
        let workspace_id = actor.workspace_id;
        let mut tx = pool.begin().await?;

        let existing = self
            .repo
            .find::<T, _>(&mut *tx, workspace_id, id, true)
            .await?
            .ok_or(AppError::NotFound("record_not_found"))?;
        self.access_policy.ensure_visible(&mut *tx, actor, existing.owner_id()).await?;

        // Dono omitido mantém o atual; troca de dono passa pela política
        let owner_id = T::requested_owner(&payload).unwrap_or(existing.owner_id());
        if owner_id != existing.owner_id() {
            self.access_policy.ensure_can_assign(&mut *tx, actor, owner_id).await?;
        }
        T::check_references(&mut *tx, workspace_id, &payload).await?;

        let prepared = self
            .field_values
            .prepare(&mut *tx, actor, T::OBJECT_TYPE, Some(id), T::custom_fields(&payload), uploads)
            .await?;
        let warnings = prepared.warnings().to_vec();

        let before = self.view(&mut *tx, workspace_id, existing, Vec::new()).await?;

        let record = T::update(&mut *tx, workspace_id, id, owner_id, &payload).await?;
        let created_files = self.field_values.persist(&mut *tx, id, actor, prepared).await?;

        let after = self.view(&mut *tx, workspace_id, record, warnings).await?;
        self.audit
            .record(
                &mut *tx,
                workspace_id,
                actor.id,
                T::OBJECT_TYPE.as_str(),
                id,
                AuditAction::Update,
                Some(&before),
                Some(&after),
                None,
            )
            .await?;
        self.audit_uploads::<T>(&mut *tx, actor, id, &created_files).await?;

        tx.commit().await?;
        Ok(after)
    }

    pub async fn get<T: CrmRecord>(&self, pool: &PgPool, actor: &User, id: i64) -> Result<RecordView<T>, AppError> {
        let mut conn = pool.acquire().await?;

        let record = self
            .repo
            .find::<T, _>(&mut *conn, actor.workspace_id, id, false)
            .await?
            .ok_or(AppError::NotFound("record_not_found"))?;
        self.access_policy.ensure_visible(&mut *conn, actor, record.owner_id()).await?;

        self.view(&mut *conn, actor.workspace_id, record, Vec::new()).await
    }

    /// Só os registros de donos visíveis ao usuário.
    pub async fn list<T: CrmRecord>(
        &self,
        pool: &PgPool,
        actor: &User,
        query: &ListQuery,
    ) -> Result<Vec<RecordView<T>>, AppError> {
        let (limit, offset) = query.page();
        let mut conn = pool.acquire().await?;

        let owners = self.access_policy.visible_owner_ids(&mut *conn, actor).await?;
        let records = self
            .repo
            .list::<T, _>(&mut *conn, actor.workspace_id, owners.as_deref(), limit, offset)
            .await?;

        let ids: Vec<i64> = records.iter().map(|r| r.id()).collect();
        let mut data = self
            .field_values
            .load_many(&mut *conn, actor.workspace_id, T::OBJECT_TYPE, &ids)
            .await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let fields = data.remove(&record.id()).unwrap_or_default();
                RecordView { record, fields, warnings: Vec::new() }
            })
            .collect())
    }

    /// Exclusão lógica. Valores e anexos ficam no banco.
    pub async fn delete<T: CrmRecord>(&self, pool: &PgPool, actor: &User, id: i64) -> Result<(), AppError> {
        let workspace_id = actor.workspace_id;
        let mut tx = pool.begin().await?;

        let existing = self
            .repo
            .find::<T, _>(&mut *tx, workspace_id, id, true)
            .await?
            .ok_or(AppError::NotFound("record_not_found"))?;
        self.access_policy.ensure_visible(&mut *tx, actor, existing.owner_id()).await?;

        let before = self.view(&mut *tx, workspace_id, existing, Vec::new()).await?;
        self.repo.soft_delete(&mut *tx, workspace_id, T::OBJECT_TYPE, id).await?;

        self.audit
            .record(
                &mut *tx,
                workspace_id,
                actor.id,
                T::OBJECT_TYPE.as_str(),
                id,
                AuditAction::Delete,
                Some(&before),
                None::<&Value>,
                None,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(record_id = id, object_type = T::OBJECT_TYPE.as_str(), workspace_id, "Registro removido");
        Ok(())
    }

    async fn view<T: CrmRecord>(
        &self,
        conn: &mut PgConnection,
        workspace_id: i64,
        record: T,
        warnings: Vec<String>,
    ) -> Result<RecordView<T>, AppError> {
        let fields = self
            .field_values
            .load_record_data(conn, workspace_id, T::OBJECT_TYPE, record.id())
            .await?;
        Ok(RecordView { record, fields, warnings })
    }

    async fn audit_uploads<T: CrmRecord>(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        record_id: i64,
        files: &[FileAttachment],
    ) -> Result<(), AppError> {
        if files.is_empty() {
            return Ok(());
        }
        // Só ids: o nome do arquivo pode pertencer a um campo mascarado
        let meta = json!({ "fileIds": files.iter().map(|f| f.id).collect::<Vec<_>>() });
        self.audit
            .record(
                conn,
                actor.workspace_id,
                actor.id,
                T::OBJECT_TYPE.as_str(),
                record_id,
                AuditAction::FileUpload,
                None::<&Value>,
                None::<&Value>,
                Some(meta),
            )
            .await
    }
}
