// src/engine/calculation.rs

use std::collections::{HashMap, HashSet};

use crate::engine::error::FieldValueError;
use crate::engine::formula::{self, Evaluation};
use crate::models::custom_field::{CustomField, FieldId, FieldKind};

#[derive(Debug, Default, PartialEq)]
pub struct Recomputed {
    pub values: HashMap<FieldId, Option<f64>>,
    pub warnings: Vec<String>,
}

/// Recalcula todos os campos de cálculo ativos a partir dos números atuais do registro.
///
/// Um cálculo pode referenciar outro cálculo; a avaliação segue a ordem de
/// dependência. Campos presos em ciclo ficam nulos.
pub fn recompute(fields: &[CustomField], numbers: &HashMap<FieldId, Option<f64>>) -> Recomputed {
    let calculations: HashMap<FieldId, &CustomField> = fields
        .iter()
        .filter(|f| f.kind == FieldKind::Calculation && f.deleted_at.is_none())
        .map(|f| (f.id, f))
        .collect();

    let mut order = Vec::with_capacity(calculations.len());
    let mut cyclic = HashSet::new();
    let mut visited = HashSet::new();
    let mut ids: Vec<FieldId> = calculations.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        visit(id, &calculations, &mut visited, &mut Vec::new(), &mut order, &mut cyclic);
    }

    let mut scope = numbers.clone();
    let mut out = Recomputed::default();

    for id in order {
        let field = calculations[&id];
        let evaluation = match (&field.formula, cyclic.contains(&id)) {
            (Some(expression), false) => formula::evaluate(expression, &scope),
            _ => Evaluation::default(),
        };

        // Campo mascarado não aparece em nenhuma resposta, nem pelo aviso
        if !field.is_masked {
            for warning in evaluation.warnings {
                out.warnings.push(format!("{}: {}", field.label, warning));
            }
        }
        scope.insert(id, evaluation.value);
        out.values.insert(id, evaluation.value);
    }

    out
}

fn visit(
    id: FieldId,
    calculations: &HashMap<FieldId, &CustomField>,
    visited: &mut HashSet<FieldId>,
    path: &mut Vec<FieldId>,
    order: &mut Vec<FieldId>,
    cyclic: &mut HashSet<FieldId>,
) {
    if let Some(start) = path.iter().position(|&p| p == id) {
        cyclic.extend(path[start..].iter().copied());
        return;
    }
    if !visited.insert(id) {
        return;
    }

    path.push(id);
    if let Some(expression) = calculations.get(&id).and_then(|f| f.formula.as_deref()) {
        for dependency in formula::references(expression) {
            if calculations.contains_key(&dependency) {
                visit(dependency, calculations, visited, path, order, cyclic);
            }
        }
    }
    path.pop();
    order.push(id);
}

/// Validação de autoria de uma fórmula.
///
/// `field_id` é `None` na criação. `siblings` são os campos do mesmo tipo de
/// objeto e workspace. Devolve os ids referenciados.
pub fn validate_formula(
    expression: &str,
    field_id: Option<FieldId>,
    siblings: &[CustomField],
) -> Result<Vec<FieldId>, FieldValueError> {
    formula::validate_syntax(expression)?;

    let references = formula::references(expression);
    for &reference in &references {
        let valid = Some(reference) != field_id
            && siblings
                .iter()
                .any(|f| f.id == reference && f.deleted_at.is_none() && f.kind.is_numeric());
        if !valid {
            return Err(FieldValueError::InvalidFormulaReference { field_id: reference });
        }
    }

    if let Some(id) = field_id {
        if reaches(&references, id, siblings) {
            return Err(FieldValueError::CircularFormula);
        }
    }

    Ok(references)
}

// Alguma das referências leva de volta ao campo sendo editado?
fn reaches(start: &[FieldId], target: FieldId, siblings: &[CustomField]) -> bool {
    let formulas: HashMap<FieldId, &str> = siblings
        .iter()
        .filter(|f| f.kind == FieldKind::Calculation && f.deleted_at.is_none() && f.id != target)
        .filter_map(|f| f.formula.as_deref().map(|expr| (f.id, expr)))
        .collect();

    let mut stack = start.to_vec();
    let mut seen = HashSet::new();
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        if let Some(expr) = formulas.get(&id) {
            stack.extend(formula::references(expr));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::formula::DIVISION_BY_ZERO_WARNING;
    use crate::engine::validator::tests::field;

    fn calc(id: FieldId, label: &str, expression: &str) -> CustomField {
        CustomField {
            label: label.to_string(),
            formula: Some(expression.to_string()),
            ..field(id, FieldKind::Calculation)
        }
    }

    #[test]
    fn evaluates_chained_calculations_in_dependency_order() {
        // 11 depende de 10, mas tem id maior; 9 depende de 11
        let fields = vec![
            field(1, FieldKind::Number),
            field(2, FieldKind::Number),
            calc(9, "Margem", "{{11}} - {{2}}"),
            calc(10, "Total", "{{1}} * {{2}}"),
            calc(11, "Com taxa", "{{10}} + 5"),
        ];
        let numbers = HashMap::from([(1, Some(3.0)), (2, Some(4.0))]);

        let out = recompute(&fields, &numbers);
        assert_eq!(out.values[&10], Some(12.0));
        assert_eq!(out.values[&11], Some(17.0));
        assert_eq!(out.values[&9], Some(13.0));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn division_warning_is_prefixed_with_the_field_label() {
        let fields = vec![field(1, FieldKind::Number), field(2, FieldKind::Number), calc(3, "Ticket", "{{1}} / {{2}}")];
        let numbers = HashMap::from([(1, Some(10.0)), (2, Some(0.0))]);

        let out = recompute(&fields, &numbers);
        assert_eq!(out.values[&3], None);
        assert_eq!(out.warnings, vec![format!("Ticket: {DIVISION_BY_ZERO_WARNING}")]);
    }

    #[test]
    fn masked_calculation_divides_by_zero_without_warning() {
        let masked = CustomField { is_masked: true, ..calc(3, "Ticket", "{{1}} / {{2}}") };
        let fields = vec![field(1, FieldKind::Number), field(2, FieldKind::Number), masked, calc(4, "Dobro", "{{1}} * 2")];
        let numbers = HashMap::from([(1, Some(10.0)), (2, Some(0.0))]);

        let out = recompute(&fields, &numbers);
        assert_eq!(out.values[&3], None);
        assert_eq!(out.values[&4], Some(20.0));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn missing_inputs_propagate_as_null() {
        let fields = vec![field(1, FieldKind::Number), calc(2, "Dobro", "{{1}} * 2"), calc(3, "Quádruplo", "{{2}} * 2")];
        let out = recompute(&fields, &HashMap::new());
        assert_eq!(out.values[&2], None);
        assert_eq!(out.values[&3], None);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn cycles_resolve_to_null_without_looping() {
        let fields = vec![calc(1, "A", "{{2}} + 1"), calc(2, "B", "{{1}} + 1"), calc(3, "C", "2 * 3")];
        let out = recompute(&fields, &HashMap::new());
        assert_eq!(out.values[&1], None);
        assert_eq!(out.values[&2], None);
        assert_eq!(out.values[&3], Some(6.0));
    }

    #[test]
    fn deleted_calculations_are_skipped() {
        let mut gone = calc(1, "A", "1 + 1");
        gone.deleted_at = Some(chrono::Utc::now());
        let out = recompute(&[gone], &HashMap::new());
        assert!(out.values.is_empty());
    }

    #[test]
    fn authoring_accepts_numeric_siblings() {
        let siblings = vec![field(1, FieldKind::Number), calc(2, "Total", "{{1}} * 2")];
        assert_eq!(validate_formula("{{1}} + {{2}}", None, &siblings).unwrap(), vec![1, 2]);
    }

    #[test]
    fn authoring_rejects_bad_references() {
        let mut deleted = field(4, FieldKind::Number);
        deleted.deleted_at = Some(chrono::Utc::now());
        let siblings = vec![field(1, FieldKind::Number), field(2, FieldKind::Text), calc(3, "X", "1"), deleted];

        let reference = |id| FieldValueError::InvalidFormulaReference { field_id: id };
        assert_eq!(validate_formula("{{2}} + 1", None, &siblings).unwrap_err(), reference(2));
        assert_eq!(validate_formula("{{99}}", None, &siblings).unwrap_err(), reference(99));
        assert_eq!(validate_formula("{{4}} * 2", None, &siblings).unwrap_err(), reference(4));
        assert_eq!(validate_formula("{{3}} + 1", Some(3), &siblings).unwrap_err(), reference(3));
    }

    #[test]
    fn authoring_rejects_syntax_before_references() {
        let siblings = vec![field(1, FieldKind::Number)];
        assert_eq!(
            validate_formula("{{1}} + abs(2)", None, &siblings).unwrap_err(),
            FieldValueError::InvalidFormulaSyntax
        );
        assert_eq!(validate_formula("({{1}} + 2", None, &siblings).unwrap_err(), FieldValueError::MalformedFormula);
    }

    #[test]
    fn authoring_detects_indirect_cycles() {
        let siblings = vec![
            field(1, FieldKind::Number),
            calc(2, "A", "{{1}} + 1"),
            calc(3, "B", "{{2}} * 2"),
        ];
        // editar A para depender de B fecha o ciclo A -> B -> A
        assert_eq!(validate_formula("{{3}} + 1", Some(2), &siblings).unwrap_err(), FieldValueError::CircularFormula);
        assert!(validate_formula("{{1}} - 1", Some(2), &siblings).is_ok());
    }
}
