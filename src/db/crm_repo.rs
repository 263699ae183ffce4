// src/db/crm_repo.rs

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Executor, FromRow, PgConnection, Postgres, postgres::PgRow};

use crate::{
    common::error::AppError,
    models::{
        crm::{Company, CompanyPayload, Contact, ContactPayload, Deal, DealPayload, Lead, LeadPayload, LeadStatus},
        custom_field::{FieldInput, ObjectType},
    },
};

// =========================================================================
//  CONTRATO DOS REGISTROS
// =========================================================================

/// O que muda de um tipo de registro para outro: colunas fixas e como gravá-las.
/// Busca, listagem e exclusão são genéricas (ver `CrmRepository`).
#[async_trait]
pub trait CrmRecord: Serialize + for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static {
    const OBJECT_TYPE: ObjectType;
    const COLUMNS: &'static str;
    type Payload: validator::Validate + Send + Sync;

    fn id(&self) -> i64;
    fn owner_id(&self) -> i64;

    fn custom_fields(payload: &Self::Payload) -> &[FieldInput];
    fn requested_owner(payload: &Self::Payload) -> Option<i64>;

    /// Confere que empresas, contatos e pipelines citados existem no workspace.
    async fn check_references(
        _conn: &mut PgConnection,
        _workspace_id: i64,
        _payload: &Self::Payload,
    ) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert(
        conn: &mut PgConnection,
        workspace_id: i64,
        owner_id: i64,
        payload: &Self::Payload,
    ) -> Result<Self, AppError>;

    async fn update(
        conn: &mut PgConnection,
        workspace_id: i64,
        id: i64,
        owner_id: i64,
        payload: &Self::Payload,
    ) -> Result<Self, AppError>;
}

async fn ensure_exists(
    conn: &mut PgConnection,
    workspace_id: i64,
    object_type: ObjectType,
    id: Option<i64>,
    not_found: &'static str,
) -> Result<(), AppError> {
    let Some(id) = id else {
        return Ok(());
    };
    if CrmRepository::new().exists(&mut *conn, workspace_id, object_type, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(not_found))
    }
}

// --- COMPANY ---

#[async_trait]
impl CrmRecord for Company {
    const OBJECT_TYPE: ObjectType = ObjectType::Company;
    const COLUMNS: &'static str =
        "id, workspace_id, owner_id, name, domain, industry, created_at, updated_at, deleted_at";
    type Payload = CompanyPayload;

    fn id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn custom_fields(payload: &CompanyPayload) -> &[FieldInput] {
        &payload.custom_fields
    }

    fn requested_owner(payload: &CompanyPayload) -> Option<i64> {
        payload.owner_id
    }

    async fn insert(
        conn: &mut PgConnection,
        workspace_id: i64,
        owner_id: i64,
        payload: &CompanyPayload,
    ) -> Result<Self, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (workspace_id, owner_id, name, domain, industry)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, workspace_id, owner_id, name, domain, industry, created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(owner_id)
        .bind(payload.name.trim())
        .bind(payload.domain.as_deref())
        .bind(payload.industry.as_deref())
        .fetch_one(&mut *conn)
        .await?;
        Ok(company)
    }

    async fn update(
        conn: &mut PgConnection,
        workspace_id: i64,
        id: i64,
        owner_id: i64,
        payload: &CompanyPayload,
    ) -> Result<Self, AppError> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET owner_id = $3, name = $4, domain = $5, industry = $6, updated_at = NOW()
            WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL
            RETURNING id, workspace_id, owner_id, name, domain, industry, created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(id)
        .bind(owner_id)
        .bind(payload.name.trim())
        .bind(payload.domain.as_deref())
        .bind(payload.industry.as_deref())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("record_not_found"))?;
        Ok(company)
    }
}

// --- CONTACT ---

#[async_trait]
impl CrmRecord for Contact {
    const OBJECT_TYPE: ObjectType = ObjectType::Contact;
    const COLUMNS: &'static str = "id, workspace_id, owner_id, company_id, first_name, last_name, email, phone, \
         created_at, updated_at, deleted_at";
    type Payload = ContactPayload;

    fn id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn custom_fields(payload: &ContactPayload) -> &[FieldInput] {
        &payload.custom_fields
    }

    fn requested_owner(payload: &ContactPayload) -> Option<i64> {
        payload.owner_id
    }

    async fn check_references(
        conn: &mut PgConnection,
        workspace_id: i64,
        payload: &ContactPayload,
    ) -> Result<(), AppError> {
        ensure_exists(conn, workspace_id, ObjectType::Company, payload.company_id, "company_not_found").await
    }

    async fn insert(
        conn: &mut PgConnection,
        workspace_id: i64,
        owner_id: i64,
        payload: &ContactPayload,
    ) -> Result<Self, AppError> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (workspace_id, owner_id, company_id, first_name, last_name, email, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, workspace_id, owner_id, company_id, first_name, last_name, email, phone,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(owner_id)
        .bind(payload.company_id)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.phone.as_deref())
        .fetch_one(&mut *conn)
        .await?;
        Ok(contact)
    }

    async fn update(
        conn: &mut PgConnection,
        workspace_id: i64,
        id: i64,
        owner_id: i64,
        payload: &ContactPayload,
    ) -> Result<Self, AppError> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
            SET owner_id = $3, company_id = $4, first_name = $5, last_name = $6,
                email = $7, phone = $8, updated_at = NOW()
            WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL
            RETURNING id, workspace_id, owner_id, company_id, first_name, last_name, email, phone,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(id)
        .bind(owner_id)
        .bind(payload.company_id)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.phone.as_deref())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("record_not_found"))?;
        Ok(contact)
    }
}

// --- LEAD ---

#[async_trait]
impl CrmRecord for Lead {
    const OBJECT_TYPE: ObjectType = ObjectType::Lead;
    const COLUMNS: &'static str =
        "id, workspace_id, owner_id, title, contact_name, email, status, created_at, updated_at, deleted_at";
    type Payload = LeadPayload;

    fn id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn custom_fields(payload: &LeadPayload) -> &[FieldInput] {
        &payload.custom_fields
    }

    fn requested_owner(payload: &LeadPayload) -> Option<i64> {
        payload.owner_id
    }

    async fn insert(
        conn: &mut PgConnection,
        workspace_id: i64,
        owner_id: i64,
        payload: &LeadPayload,
    ) -> Result<Self, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (workspace_id, owner_id, title, contact_name, email, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, workspace_id, owner_id, title, contact_name, email, status,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(owner_id)
        .bind(payload.title.trim())
        .bind(payload.contact_name.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.status.unwrap_or(LeadStatus::New))
        .fetch_one(&mut *conn)
        .await?;
        Ok(lead)
    }

    async fn update(
        conn: &mut PgConnection,
        workspace_id: i64,
        id: i64,
        owner_id: i64,
        payload: &LeadPayload,
    ) -> Result<Self, AppError> {
        // Status omitido mantém o atual
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET owner_id = $3, title = $4, contact_name = $5, email = $6,
                status = COALESCE($7, status), updated_at = NOW()
            WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL
            RETURNING id, workspace_id, owner_id, title, contact_name, email, status,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(id)
        .bind(owner_id)
        .bind(payload.title.trim())
        .bind(payload.contact_name.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.status)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("record_not_found"))?;
        Ok(lead)
    }
}

// --- DEAL ---

#[async_trait]
impl CrmRecord for Deal {
    const OBJECT_TYPE: ObjectType = ObjectType::Deal;
    const COLUMNS: &'static str = "id, workspace_id, owner_id, pipeline_id, stage_id, title, amount, \
         expected_close_date, company_id, contact_id, created_at, updated_at, deleted_at";
    type Payload = DealPayload;

    fn id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn custom_fields(payload: &DealPayload) -> &[FieldInput] {
        &payload.custom_fields
    }

    fn requested_owner(payload: &DealPayload) -> Option<i64> {
        payload.owner_id
    }

    async fn check_references(conn: &mut PgConnection, workspace_id: i64, payload: &DealPayload) -> Result<(), AppError> {
        let stage_ok: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM pipeline_stages s
                JOIN pipelines p ON p.id = s.pipeline_id
                WHERE p.workspace_id = $1 AND p.id = $2 AND s.id = $3
            )
            "#,
        )
        .bind(workspace_id)
        .bind(payload.pipeline_id)
        .bind(payload.stage_id)
        .fetch_one(&mut *conn)
        .await?;
        if !stage_ok {
            return Err(AppError::NotFound("stage_not_in_pipeline"));
        }

        ensure_exists(conn, workspace_id, ObjectType::Company, payload.company_id, "company_not_found").await?;
        ensure_exists(conn, workspace_id, ObjectType::Contact, payload.contact_id, "contact_not_found").await
    }

    async fn insert(
        conn: &mut PgConnection,
        workspace_id: i64,
        owner_id: i64,
        payload: &DealPayload,
    ) -> Result<Self, AppError> {
        let deal = sqlx::query_as::<_, Deal>(
            r#"
            INSERT INTO deals (
                workspace_id, owner_id, pipeline_id, stage_id, title, amount,
                expected_close_date, company_id, contact_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, workspace_id, owner_id, pipeline_id, stage_id, title, amount,
                      expected_close_date, company_id, contact_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(owner_id)
        .bind(payload.pipeline_id)
        .bind(payload.stage_id)
        .bind(payload.title.trim())
        .bind(payload.amount)
        .bind(payload.expected_close_date)
        .bind(payload.company_id)
        .bind(payload.contact_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(deal)
    }

    async fn update(
        conn: &mut PgConnection,
        workspace_id: i64,
        id: i64,
        owner_id: i64,
        payload: &DealPayload,
    ) -> Result<Self, AppError> {
        let deal = sqlx::query_as::<_, Deal>(
            r#"
            UPDATE deals
            SET owner_id = $3, pipeline_id = $4, stage_id = $5, title = $6, amount = $7,
                expected_close_date = $8, company_id = $9, contact_id = $10, updated_at = NOW()
            WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL
            RETURNING id, workspace_id, owner_id, pipeline_id, stage_id, title, amount,
                      expected_close_date, company_id, contact_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(id)
        .bind(owner_id)
        .bind(payload.pipeline_id)
        .bind(payload.stage_id)
        .bind(payload.title.trim())
        .bind(payload.amount)
        .bind(payload.expected_close_date)
        .bind(payload.company_id)
        .bind(payload.contact_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("record_not_found"))?;
        Ok(deal)
    }
}

// =========================================================================
//  OPERAÇÕES GENÉRICAS
// =========================================================================

#[derive(Clone, Default)]
pub struct CrmRepository;

impl CrmRepository {
    pub fn new() -> Self {
        Self
    }

    /// `lock` = true segura a linha até o fim da transação (fluxo de update).
    pub async fn find<'e, T, E>(&self, executor: E, workspace_id: i64, id: i64, lock: bool) -> Result<Option<T>, AppError>
    where
        T: CrmRecord,
        E: Executor<'e, Database = Postgres>,
    {
        // Tabela e colunas vêm de constantes do tipo, nunca da requisição
        let sql = format!(
            "SELECT {} FROM {} WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL{}",
            T::COLUMNS,
            T::OBJECT_TYPE.table(),
            if lock { " FOR UPDATE" } else { "" }
        );
        let record = sqlx::query_as::<_, T>(&sql)
            .bind(workspace_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(record)
    }

    /// `owners` = None lista o workspace inteiro.
    pub async fn list<'e, T, E>(
        &self,
        executor: E,
        workspace_id: i64,
        owners: Option<&[i64]>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<T>, AppError>
    where
        T: CrmRecord,
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {} FROM {}
            WHERE workspace_id = $1
              AND deleted_at IS NULL
              AND ($2::bigint[] IS NULL OR owner_id = ANY($2))
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
            T::COLUMNS,
            T::OBJECT_TYPE.table()
        );
        let records = sqlx::query_as::<_, T>(&sql)
            .bind(workspace_id)
            .bind(owners)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;
        Ok(records)
    }

    pub async fn soft_delete<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        object_type: ObjectType,
        id: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE {} SET deleted_at = NOW(), updated_at = NOW() \
             WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL",
            object_type.table()
        );
        let result = sqlx::query(&sql).bind(workspace_id).bind(id).execute(executor).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists<'e, E>(&self, executor: E, workspace_id: i64, object_type: ObjectType, id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        Ok(self.owner_of(executor, workspace_id, object_type, id).await?.is_some())
    }

    /// Dono de um registro ativo, para checar visibilidade sem carregar o tipo concreto.
    pub async fn owner_of<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        object_type: ObjectType,
        id: i64,
    ) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT owner_id FROM {} WHERE workspace_id = $1 AND id = $2 AND deleted_at IS NULL",
            object_type.table()
        );
        let owner: Option<i64> = sqlx::query_scalar(&sql)
            .bind(workspace_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(owner)
    }
}
