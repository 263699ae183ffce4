// src/engine/error.rs

use thiserror::Error;

use crate::models::custom_field::{FieldId, FieldKind};

/// Falhas do motor de campos customizados. Todas são corrigíveis pelo usuário
/// e abortam o lote inteiro.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldValueError {
    #[error("custom field information is invalid")]
    InvalidFieldReference { field_id: FieldId },

    #[error("value for field {field_id} is not a valid {kind:?}")]
    InvalidValue { field_id: FieldId, kind: FieldKind },

    #[error("option {option_id} is not available for field {field_id}")]
    OptionNotAllowed { field_id: FieldId, option_id: i64 },

    #[error("user {user_id} cannot be assigned in field {field_id}")]
    UserNotAllowed { field_id: FieldId, user_id: i64 },

    // Os ids ficam só para log; a resposta nunca lista quais campos faltam
    #[error("required custom fields are missing")]
    MissingRequired { field_ids: Vec<FieldId> },

    #[error("formula may only contain digits, arithmetic operators, parentheses, and field placeholders")]
    InvalidFormulaSyntax,

    #[error("formula is not a well-formed arithmetic expression")]
    MalformedFormula,

    #[error("formula references field {field_id}, which is not a numeric field of this object type")]
    InvalidFormulaReference { field_id: FieldId },

    #[error("formula creates a circular reference")]
    CircularFormula,
}

impl FieldValueError {
    /// Chave usada no catálogo de mensagens (i18n).
    pub fn code(&self) -> &'static str {
        match self {
            FieldValueError::InvalidFieldReference { .. } => "custom_field_invalid",
            FieldValueError::InvalidValue { .. } => "custom_field_value_invalid",
            FieldValueError::OptionNotAllowed { .. } => "custom_field_option_not_allowed",
            FieldValueError::UserNotAllowed { .. } => "custom_field_user_not_allowed",
            FieldValueError::MissingRequired { .. } => "required_fields_missing",
            FieldValueError::InvalidFormulaSyntax => "formula_invalid_syntax",
            FieldValueError::MalformedFormula => "formula_malformed",
            FieldValueError::InvalidFormulaReference { .. } => "formula_invalid_reference",
            FieldValueError::CircularFormula => "formula_circular",
        }
    }
}
