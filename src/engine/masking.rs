// src/engine/masking.rs

use std::collections::HashSet;

use crate::models::custom_field::{
    CustomField, FieldId, FieldValueRow, FileAttachment, OptionValueRow, RecordFieldData, UserValueRow,
};

/// Qualquer linha que pertence a um campo.
pub trait FieldScoped {
    fn field_id(&self) -> FieldId;
}

impl FieldScoped for FieldValueRow {
    fn field_id(&self) -> FieldId {
        self.field_id
    }
}

impl FieldScoped for OptionValueRow {
    fn field_id(&self) -> FieldId {
        self.field_id
    }
}

impl FieldScoped for UserValueRow {
    fn field_id(&self) -> FieldId {
        self.field_id
    }
}

impl FieldScoped for FileAttachment {
    fn field_id(&self) -> FieldId {
        self.field_id
    }
}

pub fn masked_ids(fields: &[CustomField]) -> HashSet<FieldId> {
    fields.iter().filter(|f| f.is_masked).map(|f| f.id).collect()
}

/// Remove as linhas de campos mascarados. A ordem do resto é preservada.
pub fn filter<T: FieldScoped>(rows: Vec<T>, masked: &HashSet<FieldId>) -> Vec<T> {
    if masked.is_empty() {
        return rows;
    }
    rows.into_iter().filter(|row| !masked.contains(&row.field_id())).collect()
}

pub fn mask_record(data: RecordFieldData, masked: &HashSet<FieldId>) -> RecordFieldData {
    RecordFieldData {
        field_values: filter(data.field_values, masked),
        option_values: filter(data.option_values, masked),
        user_values: filter(data.user_values, masked),
        files: filter(data.files, masked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::validator::tests::field;
    use crate::models::custom_field::FieldKind;

    fn scalar(field_id: FieldId) -> FieldValueRow {
        FieldValueRow { record_id: 1, field_id, value_text: Some("x".into()), ..Default::default() }
    }

    #[test]
    fn removes_only_masked_fields() {
        let rows = vec![scalar(1), scalar(2), scalar(3)];
        let kept = filter(rows, &HashSet::from([2]));
        assert_eq!(kept.iter().map(|r| r.field_id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn empty_mask_is_identity() {
        let rows = vec![scalar(1), scalar(2)];
        assert_eq!(filter(rows.clone(), &HashSet::new()), rows);
    }

    #[test]
    fn masks_every_list_of_a_record() {
        let data = RecordFieldData {
            field_values: vec![scalar(1), scalar(2)],
            option_values: vec![OptionValueRow { record_id: 1, field_id: 2, option_id: 9 }],
            user_values: vec![UserValueRow { record_id: 1, field_id: 3, user_id: 4 }],
            files: Vec::new(),
        };
        let masked = mask_record(data, &HashSet::from([2, 3]));
        assert_eq!(masked.field_values.len(), 1);
        assert!(masked.option_values.is_empty());
        assert!(masked.user_values.is_empty());
    }

    #[test]
    fn masked_ids_come_from_the_flag() {
        let mut secret = field(2, FieldKind::Number);
        secret.is_masked = true;
        let fields = vec![field(1, FieldKind::Text), secret];
        assert_eq!(masked_ids(&fields), HashSet::from([2]));
    }
}
