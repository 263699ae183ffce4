// src/common/i18n.rs

use std::collections::HashMap;

const DEFAULT_LANG: &str = "en";

// --- CATÁLOGOS ---

const EN: &[(&str, &str)] = &[
    ("validation_failed", "One or more fields are invalid."),
    ("required", "This field is required."),
    ("invalid_email", "The e-mail address is invalid."),
    ("too_short", "The value is too short."),
    ("too_long", "The value is too long."),
    ("out_of_range", "The value is out of range."),
    ("invalid_credentials", "Invalid e-mail or password."),
    ("invalid_token", "Authentication token is invalid or missing."),
    ("user_not_found", "User not found."),
    ("forbidden", "You are not allowed to perform this action."),
    ("admin_only", "Only workspace administrators can perform this action."),
    ("record_not_found", "Record not found."),
    ("field_not_found", "Custom field not found."),
    ("option_not_found", "Option not found."),
    ("file_not_found", "File not found."),
    ("pipeline_not_found", "Pipeline not found."),
    ("stage_not_in_pipeline", "The stage does not belong to the selected pipeline."),
    ("company_not_found", "Company not found."),
    ("contact_not_found", "Contact not found."),
    ("email_already_exists", "This e-mail is already in use."),
    ("option_label_taken", "An option with this label already exists for the field."),
    ("field_referenced_by_formula", "This field is used by a calculation field and cannot be deleted."),
    ("field_has_no_options", "This field type does not have options."),
    ("unique_violation", "A record with these values already exists."),
    ("payload_too_large", "The uploaded file exceeds the size limit."),
    ("bad_request", "The request could not be understood."),
    ("storage_failure", "The file could not be processed."),
    ("internal_error", "An unexpected error occurred."),
    ("custom_field_invalid", "custom field information is invalid"),
    ("custom_field_value_invalid", "A custom field value does not match the field type."),
    ("custom_field_option_not_allowed", "The selected option is not available for this field."),
    ("custom_field_user_not_allowed", "The selected user cannot be assigned."),
    ("required_fields_missing", "Required custom fields are missing."),
    (
        "formula_invalid_syntax",
        "formula may only contain digits, arithmetic operators, parentheses, and field placeholders",
    ),
    ("formula_malformed", "The formula is not a well-formed arithmetic expression."),
    ("formula_invalid_reference", "The formula references a field that is not a numeric field of this object."),
    ("formula_circular", "The formula creates a circular reference."),
];

const PT: &[(&str, &str)] = &[
    ("validation_failed", "Um ou mais campos são inválidos."),
    ("required", "Este campo é obrigatório."),
    ("invalid_email", "O e-mail fornecido é inválido."),
    ("too_short", "O valor é curto demais."),
    ("too_long", "O valor é longo demais."),
    ("out_of_range", "O valor está fora do intervalo permitido."),
    ("invalid_credentials", "E-mail ou senha inválidos."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    ("user_not_found", "Usuário não encontrado."),
    ("forbidden", "Você não tem permissão para realizar esta ação."),
    ("admin_only", "Apenas administradores do workspace podem realizar esta ação."),
    ("record_not_found", "Registro não encontrado."),
    ("field_not_found", "Campo customizado não encontrado."),
    ("option_not_found", "Opção não encontrada."),
    ("file_not_found", "Arquivo não encontrado."),
    ("pipeline_not_found", "Pipeline não encontrado."),
    ("stage_not_in_pipeline", "A etapa não pertence ao pipeline selecionado."),
    ("company_not_found", "Empresa não encontrada."),
    ("contact_not_found", "Contato não encontrado."),
    ("email_already_exists", "Este e-mail já está em uso."),
    ("option_label_taken", "Já existe uma opção com este nome no campo."),
    ("field_referenced_by_formula", "Este campo é usado por um campo de cálculo e não pode ser removido."),
    ("field_has_no_options", "Este tipo de campo não possui opções."),
    ("unique_violation", "Já existe um registro com estes valores."),
    ("payload_too_large", "O arquivo enviado excede o tamanho máximo."),
    ("bad_request", "A requisição não pôde ser interpretada."),
    ("storage_failure", "Não foi possível processar o arquivo."),
    ("internal_error", "Ocorreu um erro inesperado."),
    ("custom_field_invalid", "As informações de campo customizado são inválidas."),
    ("custom_field_value_invalid", "Um valor de campo customizado não corresponde ao tipo do campo."),
    ("custom_field_option_not_allowed", "A opção selecionada não está disponível para este campo."),
    ("custom_field_user_not_allowed", "O usuário selecionado não pode ser atribuído."),
    ("required_fields_missing", "Campos customizados obrigatórios não foram preenchidos."),
    (
        "formula_invalid_syntax",
        "A fórmula só pode conter dígitos, operadores aritméticos, parênteses e referências de campo.",
    ),
    ("formula_malformed", "A fórmula não é uma expressão aritmética válida."),
    ("formula_invalid_reference", "A fórmula referencia um campo que não é numérico neste objeto."),
    ("formula_circular", "A fórmula cria uma referência circular."),
];

/// Catálogo de mensagens de erro por idioma.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let catalogs = [("en", EN), ("pt", PT)]
            .into_iter()
            .map(|(lang, entries)| (lang, entries.iter().copied().collect()))
            .collect();
        Self { catalogs }
    }

    /// Busca a mensagem no idioma pedido, cai para o inglês e por fim devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        [lang, DEFAULT_LANG]
            .iter()
            .filter_map(|l| self.catalogs.get(l))
            .find_map(|catalog| catalog.get(key))
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_then_to_the_key() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "file_not_found"), "Arquivo não encontrado.");
        assert_eq!(store.translate("fr", "file_not_found"), "File not found.");
        assert_eq!(store.translate("pt", "nao_existe"), "nao_existe");
    }

    #[test]
    fn catalogs_have_the_same_keys() {
        let en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        let pt: Vec<_> = PT.iter().map(|(k, _)| *k).collect();
        assert_eq!(en, pt);
    }

    #[test]
    fn formula_syntax_message_is_stable() {
        let store = I18nStore::new();
        assert_eq!(
            store.translate("en", "formula_invalid_syntax"),
            "formula may only contain digits, arithmetic operators, parentheses, and field placeholders"
        );
    }
}
