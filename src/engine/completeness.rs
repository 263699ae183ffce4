// src/engine/completeness.rs

use std::collections::{HashMap, HashSet};

use crate::engine::error::FieldValueError;
use crate::engine::validator::ValidatedInputs;
use crate::models::custom_field::{
    CustomField, FieldId, FieldKind, FieldValueRow, FileAttachment, OptionValueRow, UserValueRow,
};

/// O que já está gravado para o registro (vazio na criação).
#[derive(Debug, Default)]
pub struct StoredState {
    pub scalar_has_value: HashSet<FieldId>,
    pub multi_counts: HashMap<FieldId, usize>,
    pub current_files: HashMap<FieldId, usize>,
}

impl StoredState {
    pub fn from_rows(
        scalars: &[FieldValueRow],
        options: &[OptionValueRow],
        users: &[UserValueRow],
        files: &[FileAttachment],
    ) -> Self {
        let mut state = StoredState::default();

        for row in scalars.iter().filter(|r| r.has_value()) {
            state.scalar_has_value.insert(row.field_id);
        }
        for field_id in options.iter().map(|r| r.field_id).chain(users.iter().map(|r| r.field_id)) {
            *state.multi_counts.entry(field_id).or_default() += 1;
        }
        for file in files.iter().filter(|f| f.is_current) {
            *state.current_files.entry(file.field_id).or_default() += 1;
        }

        state
    }
}

/// O que a requisição atual traz.
pub struct RequestState<'a> {
    pub validated: &'a ValidatedInputs,
    /// Quantidade de uploads novos por campo de arquivo.
    pub uploads: &'a HashMap<FieldId, usize>,
    /// Valores recém-calculados de cada campo de cálculo.
    pub calculations: &'a HashMap<FieldId, Option<f64>>,
}

/// Ids dos campos obrigatórios que ficariam sem valor após a operação.
pub fn missing_required_fields(
    fields: &[CustomField],
    stored: &StoredState,
    request: &RequestState<'_>,
) -> Vec<FieldId> {
    fields
        .iter()
        .filter(|f| f.is_required && f.deleted_at.is_none())
        .filter(|f| is_missing(f, stored, request))
        .map(|f| f.id)
        .collect()
}

fn is_missing(field: &CustomField, stored: &StoredState, request: &RequestState<'_>) -> bool {
    match field.kind {
        FieldKind::File => {
            let existing = stored.current_files.get(&field.id).copied().unwrap_or(0);
            let incoming = request.uploads.get(&field.id).copied().unwrap_or(0);
            existing + incoming == 0
        }
        FieldKind::Calculation => request.calculations.get(&field.id).copied().flatten().is_none(),
        FieldKind::MultiSelect | FieldKind::Users => match request.validated.has_value.get(&field.id) {
            Some(has_value) => !has_value,
            None => stored.multi_counts.get(&field.id).copied().unwrap_or(0) == 0,
        },
        _ => match request.validated.has_value.get(&field.id) {
            Some(has_value) => !has_value,
            None => !stored.scalar_has_value.contains(&field.id),
        },
    }
}

/// Falha com um erro agregado se qualquer obrigatório estiver faltando.
pub fn ensure_complete(
    fields: &[CustomField],
    stored: &StoredState,
    request: &RequestState<'_>,
) -> Result<(), FieldValueError> {
    let field_ids = missing_required_fields(fields, stored, request);
    if field_ids.is_empty() {
        Ok(())
    } else {
        Err(FieldValueError::MissingRequired { field_ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::validator::tests::field;
    use chrono::Utc;
    use uuid::Uuid;

    fn required(id: FieldId, kind: FieldKind) -> CustomField {
        CustomField { is_required: true, ..field(id, kind) }
    }

    fn touched(pairs: &[(FieldId, bool)]) -> ValidatedInputs {
        ValidatedInputs { has_value: pairs.iter().copied().collect(), ..Default::default() }
    }

    fn check(fields: &[CustomField], stored: &StoredState, validated: &ValidatedInputs) -> Vec<FieldId> {
        check_with(fields, stored, validated, &HashMap::new(), &HashMap::new())
    }

    fn check_with(
        fields: &[CustomField],
        stored: &StoredState,
        validated: &ValidatedInputs,
        uploads: &HashMap<FieldId, usize>,
        calculations: &HashMap<FieldId, Option<f64>>,
    ) -> Vec<FieldId> {
        let request = RequestState { validated, uploads, calculations };
        missing_required_fields(fields, stored, &request)
    }

    fn attachment(field_id: FieldId, is_current: bool) -> FileAttachment {
        FileAttachment {
            id: 1,
            record_id: 1,
            field_id,
            original_name: "a.pdf".into(),
            storage_path: "deal/1/a.pdf".into(),
            mime_type: "application/pdf".into(),
            size_bytes: 10,
            group_key: Uuid::new_v4(),
            version: 1,
            is_current,
            replaced_at: None,
            uploaded_by: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn required_number_missing_when_nothing_stored_and_not_sent() {
        let fields = [required(1, FieldKind::Number)];
        assert_eq!(check(&fields, &StoredState::default(), &touched(&[])), vec![1]);
    }

    #[test]
    fn required_number_satisfied_by_stored_value() {
        let fields = [required(1, FieldKind::Number)];
        let stored = StoredState::from_rows(
            &[FieldValueRow { record_id: 7, field_id: 1, value_number: Some(42.0), ..Default::default() }],
            &[],
            &[],
            &[],
        );
        assert!(check(&fields, &stored, &touched(&[])).is_empty());
    }

    #[test]
    fn clearing_a_stored_value_makes_it_missing() {
        let fields = [required(1, FieldKind::Text)];
        let mut stored = StoredState::default();
        stored.scalar_has_value.insert(1);
        assert_eq!(check(&fields, &stored, &touched(&[(1, false)])), vec![1]);
    }

    #[test]
    fn stored_row_with_all_columns_null_does_not_count() {
        let fields = [required(1, FieldKind::Text)];
        let stored = StoredState::from_rows(
            &[FieldValueRow { record_id: 7, field_id: 1, ..Default::default() }],
            &[],
            &[],
            &[],
        );
        assert_eq!(check(&fields, &stored, &touched(&[])), vec![1]);
    }

    #[test]
    fn multi_value_uses_submitted_set_when_touched() {
        let fields = [required(3, FieldKind::MultiSelect), required(5, FieldKind::Users)];
        let stored = StoredState::from_rows(
            &[],
            &[OptionValueRow { record_id: 7, field_id: 3, option_id: 30 }],
            &[UserValueRow { record_id: 7, field_id: 5, user_id: 100 }],
            &[],
        );

        assert!(check(&fields, &stored, &touched(&[])).is_empty());
        assert_eq!(check(&fields, &stored, &touched(&[(3, false)])), vec![3]);
        assert_eq!(check(&fields, &StoredState::default(), &touched(&[(3, true)])), vec![5]);
    }

    #[test]
    fn file_counts_current_attachments_and_uploads() {
        let fields = [required(7, FieldKind::File)];
        let superseded_only = StoredState::from_rows(&[], &[], &[], &[attachment(7, false)]);
        assert_eq!(check(&fields, &superseded_only, &touched(&[])), vec![7]);

        let current = StoredState::from_rows(&[], &[], &[], &[attachment(7, true)]);
        assert!(check(&fields, &current, &touched(&[])).is_empty());

        let uploads = HashMap::from([(7, 1)]);
        let missing = check_with(&fields, &StoredState::default(), &touched(&[]), &uploads, &HashMap::new());
        assert!(missing.is_empty());
    }

    #[test]
    fn calculation_uses_the_fresh_value() {
        let fields = [required(6, FieldKind::Calculation)];
        let empty = StoredState::default();
        let computed = HashMap::from([(6, Some(3.5))]);
        let null = HashMap::from([(6, None)]);

        assert!(check_with(&fields, &empty, &touched(&[]), &HashMap::new(), &computed).is_empty());
        assert_eq!(check_with(&fields, &empty, &touched(&[]), &HashMap::new(), &null), vec![6]);
    }

    #[test]
    fn optional_and_deleted_fields_are_ignored() {
        let mut deleted = required(2, FieldKind::Text);
        deleted.deleted_at = Some(Utc::now());
        let fields = [field(1, FieldKind::Text), deleted];
        assert!(check(&fields, &StoredState::default(), &touched(&[])).is_empty());
    }

    #[test]
    fn ensure_complete_reports_an_aggregate_error() {
        let fields = [required(1, FieldKind::Number), required(2, FieldKind::Date)];
        let validated = touched(&[]);
        let request = RequestState { validated: &validated, uploads: &HashMap::new(), calculations: &HashMap::new() };
        let err = ensure_complete(&fields, &StoredState::default(), &request).unwrap_err();
        assert_eq!(err, FieldValueError::MissingRequired { field_ids: vec![1, 2] });
    }
}
