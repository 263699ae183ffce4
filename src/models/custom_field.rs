// src/models/custom_field.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub type FieldId = i64;

// --- ENUMS ---

// Mapeia o CREATE TYPE crm_object_type do banco.
// Os aliases permitem usar o tipo direto no path (/api/fields/deal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "crm_object_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectType {
    #[serde(alias = "deal", alias = "deals")]
    Deal,
    #[serde(alias = "lead", alias = "leads")]
    Lead,
    #[serde(alias = "contact", alias = "contacts")]
    Contact,
    #[serde(alias = "company", alias = "companies")]
    Company,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Deal => "DEAL",
            ObjectType::Lead => "LEAD",
            ObjectType::Contact => "CONTACT",
            ObjectType::Company => "COMPANY",
        }
    }

    /// Tabela que guarda as colunas fixas do registro.
    pub fn table(&self) -> &'static str {
        match self {
            ObjectType::Deal => "deals",
            ObjectType::Lead => "leads",
            ObjectType::Contact => "contacts",
            ObjectType::Company => "companies",
        }
    }
}

// Mapeia o CREATE TYPE custom_field_kind do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "custom_field_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Datetime,
    Boolean,
    SingleSelect,
    MultiSelect,
    User,
    Users,
    File,
    Calculation,
}

impl FieldKind {
    /// Tipos que podem ser referenciados por uma fórmula.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Number | FieldKind::Calculation)
    }

    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::SingleSelect | FieldKind::MultiSelect)
    }
}

// --- DEFINIÇÕES (O Molde) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    #[schema(example = 12)]
    pub id: FieldId,
    #[schema(ignore)]
    pub workspace_id: i64,
    pub object_type: ObjectType,

    #[schema(example = "Valor do contrato")]
    pub label: String,
    pub kind: FieldKind,

    pub is_required: bool,
    pub is_masked: bool,
    pub show_in_create: bool,
    pub show_in_pipeline: bool,

    #[schema(example = 0)]
    pub position: i32,

    // Só existe quando kind = calculation
    #[schema(example = "{{3}} * {{4}}")]
    pub formula: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldOption {
    pub id: i64,
    pub field_id: FieldId,
    #[schema(example = "Enterprise")]
    pub label: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// --- VALORES (O Dado) ---

/// Linha escalar: no máximo uma por (registro, campo).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldValueRow {
    pub record_id: i64,
    pub field_id: FieldId,
    pub value_text: Option<String>,
    pub value_number: Option<f64>,
    pub value_date: Option<NaiveDate>,
    pub value_datetime: Option<DateTime<Utc>>,
    pub value_boolean: Option<bool>,
    pub value_user_id: Option<i64>,
    pub value_option_id: Option<i64>,
}

impl FieldValueRow {
    pub fn has_value(&self) -> bool {
        self.value_text.is_some()
            || self.value_number.is_some()
            || self.value_date.is_some()
            || self.value_datetime.is_some()
            || self.value_boolean.is_some()
            || self.value_user_id.is_some()
            || self.value_option_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionValueRow {
    pub record_id: i64,
    pub field_id: FieldId,
    pub option_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserValueRow {
    pub record_id: i64,
    pub field_id: FieldId,
    pub user_id: i64,
}

/// Anexo versionado. Todas as versões de um mesmo "slot" compartilham o group_key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub id: i64,
    pub record_id: i64,
    pub field_id: FieldId,
    #[schema(example = "proposta.pdf")]
    pub original_name: String,
    // Caminho interno do storage, nunca exposto
    #[serde(skip_serializing)]
    pub storage_path: String,
    #[schema(example = "application/pdf")]
    pub mime_type: String,
    pub size_bytes: i64,
    pub group_key: Uuid,
    #[schema(example = 1)]
    pub version: i32,
    pub is_current: bool,
    pub replaced_at: Option<DateTime<Utc>>,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

/// O que o storage devolve depois de gravar os bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub original_name: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size: i64,
}

/// Arquivo recebido no multipart, ainda não gravado.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

// --- WIRE FORMAT ---

/// Entrada de um campo no corpo da requisição: { "fieldId": 3, "value": ... }
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldInput {
    #[schema(example = 3)]
    pub field_id: FieldId,

    // string | number | boolean | null | number[]
    #[serde(default)]
    #[schema(value_type = Object, example = 1500)]
    pub value: Value,
}

/// Tudo que um registro carrega de campos customizados na resposta.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordFieldData {
    pub field_values: Vec<FieldValueRow>,
    pub option_values: Vec<OptionValueRow>,
    pub user_values: Vec<UserValueRow>,
    pub files: Vec<FileAttachment>,
}

/// Definição com as opções ativas, como a tela de configuração consome.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(flatten)]
    pub field: CustomField,
    pub options: Vec<CustomFieldOption>,
}

// --- PAYLOADS DE CONFIGURAÇÃO ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Valor do contrato")]
    pub label: String,

    pub kind: FieldKind,

    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_masked: bool,
    #[serde(default = "default_true")]
    pub show_in_create: bool,
    #[serde(default)]
    pub show_in_pipeline: bool,

    // Sem posição: entra no fim da lista
    #[validate(range(min = 0, message = "out_of_range"))]
    pub position: Option<i32>,

    // Obrigatória quando kind = calculation, ignorada nos demais
    #[schema(example = "{{3}} * {{4}}")]
    pub formula: Option<String>,

    // Opções iniciais para campos de seleção
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// O tipo do campo não muda depois de criado.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    pub label: Option<String>,
    pub is_required: Option<bool>,
    pub is_masked: Option<bool>,
    pub show_in_create: Option<bool>,
    pub show_in_pipeline: Option<bool>,
    pub formula: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderFieldsPayload {
    // Todos os campos ativos do tipo, na nova ordem
    #[validate(length(min = 1, message = "required"))]
    pub field_ids: Vec<FieldId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptionPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Enterprise")]
    pub label: String,
}
