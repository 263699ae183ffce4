// src/common/db_utils.rs

use crate::common::error::AppError;

/// Traduz violação de UNIQUE em um erro de conflito conhecido.
///
/// `known` liga o nome da constraint (como está na migration) à chave de mensagem.
pub(crate) fn map_unique_violation(err: sqlx::Error, known: &[(&str, &'static str)]) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            return match known.iter().find(|(name, _)| *name == constraint) {
                Some((_, key)) => AppError::Conflict(key),
                None => AppError::UniqueConstraintViolation(constraint.to_string()),
            };
        }
    }
    AppError::DatabaseError(err)
}

/// Normalização usada na comparação de rótulos de opção.
pub(crate) fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_pass_through() {
        let err = map_unique_violation(sqlx::Error::RowNotFound, &[("users_email_key", "email_already_exists")]);
        assert!(matches!(err, AppError::DatabaseError(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn labels_compare_trimmed_and_case_insensitive() {
        assert_eq!(normalize_label("  Enterprise "), normalize_label("enterprise"));
    }
}
