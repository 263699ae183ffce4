// src/engine/validator.rs

use std::collections::{HashMap, HashSet};

use crate::engine::codec::{self, ParsedValue, ScalarColumns};
use crate::engine::error::FieldValueError;
use crate::models::custom_field::{CustomField, FieldId, FieldInput, FieldKind, ObjectType};

/// O que o validador precisa saber além das entradas cruas.
pub struct ValidationContext<'a> {
    pub workspace_id: i64,
    pub object_type: ObjectType,
    pub fields: &'a [CustomField],
    /// Opções ativas (não removidas) por campo de seleção.
    pub allowed_options: &'a HashMap<FieldId, HashSet<i64>>,
    /// Usuários que o autor da requisição pode atribuir.
    pub assignable_users: &'a HashSet<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarValue {
    pub field_id: FieldId,
    pub kind: FieldKind,
    pub columns: ScalarColumns,
}

/// Conjunto completo de ids para um campo multi. Substitui o anterior inteiro.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiValueSet {
    pub field_id: FieldId,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidatedInputs {
    pub scalars: Vec<ScalarValue>,
    pub option_sets: Vec<MultiValueSet>,
    pub user_sets: Vec<MultiValueSet>,
    /// Presente apenas para os campos tocados pela requisição.
    pub has_value: HashMap<FieldId, bool>,
}

impl ValidatedInputs {
    /// Valores numéricos enviados nesta requisição (nulo quando o campo foi limpo).
    pub fn touched_numbers(&self) -> HashMap<FieldId, Option<f64>> {
        self.scalars
            .iter()
            .filter(|s| s.kind == FieldKind::Number)
            .map(|s| (s.field_id, s.columns.number))
            .collect()
    }
}

/// Valida o lote inteiro. Qualquer erro invalida todas as entradas.
pub fn validate_inputs(
    ctx: &ValidationContext<'_>,
    inputs: &[FieldInput],
) -> Result<ValidatedInputs, FieldValueError> {
    let definitions: HashMap<FieldId, &CustomField> = ctx
        .fields
        .iter()
        .filter(|f| {
            f.deleted_at.is_none() && f.object_type == ctx.object_type && f.workspace_id == ctx.workspace_id
        })
        .map(|f| (f.id, f))
        .collect();

    let mut out = ValidatedInputs::default();
    let mut seen = HashSet::new();

    for input in inputs {
        let invalid_reference = FieldValueError::InvalidFieldReference { field_id: input.field_id };
        let field = definitions.get(&input.field_id).ok_or_else(|| invalid_reference.clone())?;
        if !seen.insert(field.id) {
            return Err(invalid_reference);
        }

        // Cálculo é derivado no servidor; arquivo chega como upload
        if matches!(field.kind, FieldKind::Calculation | FieldKind::File) {
            continue;
        }

        let parsed = codec::parse(field, &input.value)?;
        out.has_value.insert(field.id, parsed.has_value);

        match parsed.value {
            ParsedValue::SelectOptions(ids) => {
                for &option_id in &ids {
                    ensure_option(ctx, field.id, option_id)?;
                }
                out.option_sets.push(MultiValueSet { field_id: field.id, ids });
            }
            ParsedValue::Users(ids) => {
                for &user_id in &ids {
                    ensure_user(ctx, field.id, user_id)?;
                }
                out.user_sets.push(MultiValueSet { field_id: field.id, ids });
            }
            scalar => {
                match scalar {
                    ParsedValue::SelectOption(option_id) => ensure_option(ctx, field.id, option_id)?,
                    ParsedValue::User(user_id) => ensure_user(ctx, field.id, user_id)?,
                    _ => {}
                }
                out.scalars.push(ScalarValue {
                    field_id: field.id,
                    kind: field.kind,
                    columns: scalar.into_columns(),
                });
            }
        }
    }

    Ok(out)
}

fn ensure_option(ctx: &ValidationContext<'_>, field_id: FieldId, option_id: i64) -> Result<(), FieldValueError> {
    let allowed = ctx
        .allowed_options
        .get(&field_id)
        .is_some_and(|options| options.contains(&option_id));
    if allowed {
        Ok(())
    } else {
        Err(FieldValueError::OptionNotAllowed { field_id, option_id })
    }
}

fn ensure_user(ctx: &ValidationContext<'_>, field_id: FieldId, user_id: i64) -> Result<(), FieldValueError> {
    if ctx.assignable_users.contains(&user_id) {
        Ok(())
    } else {
        Err(FieldValueError::UserNotAllowed { field_id, user_id })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{Value, json};

    pub(crate) fn field(id: FieldId, kind: FieldKind) -> CustomField {
        CustomField {
            id,
            workspace_id: 1,
            object_type: ObjectType::Deal,
            label: format!("campo {id}"),
            kind,
            is_required: false,
            is_masked: false,
            show_in_create: true,
            show_in_pipeline: false,
            position: id as i32,
            formula: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn input(field_id: FieldId, value: Value) -> FieldInput {
        FieldInput { field_id, value }
    }

    struct Fixture {
        fields: Vec<CustomField>,
        options: HashMap<FieldId, HashSet<i64>>,
        users: HashSet<i64>,
    }

    impl Fixture {
        fn new() -> Self {
            let fields = vec![
                field(1, FieldKind::Number),
                field(2, FieldKind::SingleSelect),
                field(3, FieldKind::MultiSelect),
                field(4, FieldKind::User),
                field(5, FieldKind::Users),
                field(6, FieldKind::Calculation),
                field(7, FieldKind::File),
                field(8, FieldKind::Text),
            ];
            let options = HashMap::from([(2, HashSet::from([20, 21])), (3, HashSet::from([30, 31, 32]))]);
            let users = HashSet::from([100, 101]);
            Fixture { fields, options, users }
        }

        fn run(&self, inputs: &[FieldInput]) -> Result<ValidatedInputs, FieldValueError> {
            let ctx = ValidationContext {
                workspace_id: 1,
                object_type: ObjectType::Deal,
                fields: &self.fields,
                allowed_options: &self.options,
                assignable_users: &self.users,
            };
            validate_inputs(&ctx, inputs)
        }
    }

    #[test]
    fn splits_scalars_and_multi_sets() {
        let fx = Fixture::new();
        let out = fx
            .run(&[
                input(1, json!("12")),
                input(2, json!(21)),
                input(3, json!([30, 32])),
                input(4, json!(100)),
                input(5, json!([101])),
                input(8, json!("")),
            ])
            .unwrap();

        assert_eq!(out.scalars.len(), 4);
        assert_eq!(out.option_sets, vec![MultiValueSet { field_id: 3, ids: vec![30, 32] }]);
        assert_eq!(out.user_sets, vec![MultiValueSet { field_id: 5, ids: vec![101] }]);
        assert_eq!(out.has_value.get(&8), Some(&false));
        assert_eq!(out.touched_numbers(), HashMap::from([(1, Some(12.0))]));
    }

    #[test]
    fn unknown_field_fails_the_whole_batch() {
        let fx = Fixture::new();
        let err = fx.run(&[input(1, json!(1)), input(99, json!("x"))]).unwrap_err();
        assert_eq!(err, FieldValueError::InvalidFieldReference { field_id: 99 });
    }

    #[test]
    fn fields_from_other_object_types_or_deleted_are_rejected() {
        let mut fx = Fixture::new();
        fx.fields[0].object_type = ObjectType::Lead;
        fx.fields[7].deleted_at = Some(Utc::now());
        assert!(fx.run(&[input(1, json!(1))]).is_err());
        assert!(fx.run(&[input(8, json!("x"))]).is_err());
    }

    #[test]
    fn repeated_field_is_rejected() {
        let fx = Fixture::new();
        let err = fx.run(&[input(8, json!("a")), input(8, json!("b"))]).unwrap_err();
        assert_eq!(err, FieldValueError::InvalidFieldReference { field_id: 8 });
    }

    #[test]
    fn options_outside_the_allowed_set_are_rejected() {
        let fx = Fixture::new();
        assert_eq!(
            fx.run(&[input(2, json!(99))]).unwrap_err(),
            FieldValueError::OptionNotAllowed { field_id: 2, option_id: 99 }
        );
        assert_eq!(
            fx.run(&[input(3, json!([30, 21]))]).unwrap_err(),
            FieldValueError::OptionNotAllowed { field_id: 3, option_id: 21 }
        );
    }

    #[test]
    fn users_outside_the_assignable_set_are_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.run(&[input(4, json!(5))]).unwrap_err(),
            FieldValueError::UserNotAllowed { user_id: 5, .. }
        ));
        assert!(fx.run(&[input(5, json!([100, 7]))]).is_err());
    }

    #[test]
    fn empty_multi_value_still_replaces_the_set() {
        let fx = Fixture::new();
        let out = fx.run(&[input(3, json!([]))]).unwrap();
        assert_eq!(out.option_sets, vec![MultiValueSet { field_id: 3, ids: vec![] }]);
        assert_eq!(out.has_value.get(&3), Some(&false));
    }

    #[test]
    fn calculation_and_file_inputs_are_ignored() {
        let fx = Fixture::new();
        let out = fx.run(&[input(6, json!(500)), input(7, json!("a.pdf"))]).unwrap();
        assert!(out.scalars.is_empty());
        assert!(!out.has_value.contains_key(&6));
        assert!(!out.has_value.contains_key(&7));
    }

    #[test]
    fn type_mismatch_is_reported_for_the_field() {
        let fx = Fixture::new();
        assert_eq!(
            fx.run(&[input(1, json!("doze"))]).unwrap_err(),
            FieldValueError::InvalidValue { field_id: 1, kind: FieldKind::Number }
        );
    }
}
