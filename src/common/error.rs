// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::engine::error::FieldValueError;
use crate::middleware::i18n::Locale;

// Erro de domínio: repositórios e serviços devolvem este tipo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo customizado: {0}")]
    FieldValue(#[from] FieldValueError),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // A chave do catálogo explica o motivo (ex: "admin_only")
    #[error("Acesso negado: {0}")]
    Forbidden(&'static str),

    #[error("Não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Conflito: {0}")]
    Conflict(&'static str),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Arquivo maior que o permitido")]
    PayloadTooLarge,

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Falha no storage: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Erro de API: o que sai para o cliente, já traduzido.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::FieldValue(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::StorageError(_)
            | AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Converte para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        let (error, details) = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            let key = e.message.as_deref().unwrap_or(&*e.code);
                            store.translate(lang, key)
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                (store.translate(lang, "validation_failed"), Some(Value::Object(details)))
            }
            AppError::FieldValue(err) => {
                // Campos faltando nunca são listados na resposta
                let details = match err {
                    FieldValueError::InvalidValue { field_id, .. }
                    | FieldValueError::OptionNotAllowed { field_id, .. }
                    | FieldValueError::UserNotAllowed { field_id, .. }
                    | FieldValueError::InvalidFormulaReference { field_id } => Some(json!({ "fieldId": field_id })),
                    _ => None,
                };
                (store.translate(lang, err.code()), details)
            }
            AppError::InvalidCredentials => (store.translate(lang, "invalid_credentials"), None),
            AppError::InvalidToken => (store.translate(lang, "invalid_token"), None),
            AppError::UserNotFound => (store.translate(lang, "user_not_found"), None),
            AppError::Forbidden(key) | AppError::NotFound(key) | AppError::Conflict(key) => {
                (store.translate(lang, key), None)
            }
            AppError::UniqueConstraintViolation(constraint) => {
                (store.translate(lang, "unique_violation"), Some(json!({ "constraint": constraint })))
            }
            AppError::PayloadTooLarge => (store.translate(lang, "payload_too_large"), None),
            AppError::BadRequest(reason) => (store.translate(lang, "bad_request"), Some(json!({ "reason": reason }))),
            AppError::StorageError(e) => {
                tracing::error!("Falha no storage: {}", e);
                (store.translate(lang, "storage_failure"), None)
            }
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (store.translate(lang, "internal_error"), None)
            }
        };

        ApiError { status, error, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn en() -> Locale {
        Locale("en".into())
    }

    #[test]
    fn field_value_errors_are_bad_requests() {
        let store = I18nStore::new();
        let api = AppError::from(FieldValueError::InvalidFieldReference { field_id: 9 }).to_api_error(&en(), &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.error, "custom field information is invalid");
        assert!(api.details.is_none());
    }

    #[test]
    fn missing_required_does_not_name_fields() {
        let store = I18nStore::new();
        let err = AppError::from(FieldValueError::MissingRequired { field_ids: vec![1, 2] });
        let api = err.to_api_error(&Locale("pt".into()), &store);
        assert_eq!(api.error, "Campos customizados obrigatórios não foram preenchidos.");
        assert!(api.details.is_none());
    }

    #[test]
    fn validation_details_are_translated() {
        #[derive(Validate)]
        struct Payload {
            #[validate(length(min = 1, message = "required"))]
            label: String,
        }

        let store = I18nStore::new();
        let errors = Payload { label: String::new() }.validate().unwrap_err();
        let api = AppError::from(errors).to_api_error(&Locale("pt".into()), &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details, Some(json!({ "label": ["Este campo é obrigatório."] })));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::Forbidden("forbidden").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("file_not_found").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("option_label_taken").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let io = std::io::Error::other("disco cheio");
        assert_eq!(AppError::from(io).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let store = I18nStore::new();
        let api = AppError::from(anyhow::anyhow!("segredo")).to_api_error(&en(), &store);
        assert_eq!(api.error, "An unexpected error occurred.");
    }
}
