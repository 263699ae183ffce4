// src/services/custom_field_service.rs

use std::collections::HashSet;

use sqlx::PgPool;

use crate::{
    common::{db_utils::normalize_label, error::AppError},
    db::{CustomFieldRepository, custom_field_repo::FieldAttributes},
    engine::{calculation, error::FieldValueError, formula},
    models::custom_field::{
        CreateFieldPayload, CreateOptionPayload, CustomField, CustomFieldOption, FieldDefinition, FieldId, FieldKind,
        ObjectType, UpdateFieldPayload,
    },
};

#[derive(Clone)]
pub struct CustomFieldService {
    repo: CustomFieldRepository,
}

impl CustomFieldService {
    pub fn new(repo: CustomFieldRepository) -> Self {
        Self { repo }
    }

    pub async fn list_definitions(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
    ) -> Result<Vec<FieldDefinition>, AppError> {
        let fields = self.repo.list_fields(pool, workspace_id, object_type).await?;
        let ids: Vec<FieldId> = fields.iter().map(|f| f.id).collect();
        let mut options = self.repo.list_options(pool, &ids).await?;

        Ok(fields
            .into_iter()
            .map(|field| {
                let (own, rest): (Vec<_>, Vec<_>) = options.drain(..).partition(|o| o.field_id == field.id);
                options = rest;
                FieldDefinition { field, options: own }
            })
            .collect())
    }

    pub async fn create_field(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
        payload: CreateFieldPayload,
    ) -> Result<FieldDefinition, AppError> {
        let mut tx = pool.begin().await?;

        self.repo.lock_fields(&mut *tx, workspace_id, object_type).await?;
        let siblings = self.repo.list_fields(&mut *tx, workspace_id, object_type).await?;

        let formula = match payload.kind {
            FieldKind::Calculation => {
                let expression = payload
                    .formula
                    .as_deref()
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .ok_or(FieldValueError::InvalidFormulaSyntax)?;
                calculation::validate_formula(expression, None, &siblings)?;
                Some(expression)
            }
            _ => None,
        };

        let option_labels = if payload.kind.has_options() {
            distinct_labels(&payload.options)?
        } else {
            Vec::new()
        };

        // Posição fora do intervalo vai para o fim
        let end = siblings.len() as i32;
        let position = payload.position.map_or(end, |p| p.min(end));
        self.repo.shift_positions(&mut *tx, workspace_id, object_type, position).await?;

        let attrs = FieldAttributes {
            label: payload.label.trim(),
            is_required: payload.is_required,
            is_masked: payload.is_masked,
            show_in_create: payload.show_in_create,
            show_in_pipeline: payload.show_in_pipeline,
            formula,
        };
        let field = self
            .repo
            .insert_field(&mut *tx, workspace_id, object_type, payload.kind, &attrs, position)
            .await?;
        self.repo.renumber_fields(&mut *tx, workspace_id, object_type).await?;

        let mut options = Vec::with_capacity(option_labels.len());
        for label in &option_labels {
            options.push(self.repo.insert_option(&mut *tx, field.id, label).await?);
        }

        tx.commit().await?;

        tracing::info!(field_id = field.id, workspace_id, kind = ?field.kind, "Campo customizado criado");
        Ok(FieldDefinition { field, options })
    }

    pub async fn update_field(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
        field_id: FieldId,
        payload: UpdateFieldPayload,
    ) -> Result<CustomField, AppError> {
        let mut tx = pool.begin().await?;

        self.repo.lock_fields(&mut *tx, workspace_id, object_type).await?;
        let siblings = self.repo.list_fields(&mut *tx, workspace_id, object_type).await?;
        let current = siblings
            .iter()
            .find(|f| f.id == field_id)
            .ok_or(AppError::NotFound("field_not_found"))?;

        let formula = match (current.kind, payload.formula.as_deref().map(str::trim)) {
            (FieldKind::Calculation, Some(expression)) => {
                if expression.is_empty() {
                    return Err(FieldValueError::InvalidFormulaSyntax.into());
                }
                calculation::validate_formula(expression, Some(field_id), &siblings)?;
                Some(expression.to_string())
            }
            (_, _) => current.formula.clone(),
        };

        let label = payload.label.as_deref().map(str::trim).unwrap_or(&current.label).to_string();
        let attrs = FieldAttributes {
            label: &label,
            is_required: payload.is_required.unwrap_or(current.is_required),
            is_masked: payload.is_masked.unwrap_or(current.is_masked),
            show_in_create: payload.show_in_create.unwrap_or(current.show_in_create),
            show_in_pipeline: payload.show_in_pipeline.unwrap_or(current.show_in_pipeline),
            formula: formula.as_deref(),
        };
        let field = self.repo.update_field(&mut *tx, field_id, &attrs).await?;

        tx.commit().await?;
        Ok(field)
    }

    pub async fn delete_field(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
        field_id: FieldId,
    ) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        self.repo.lock_fields(&mut *tx, workspace_id, object_type).await?;
        let siblings = self.repo.list_fields(&mut *tx, workspace_id, object_type).await?;
        if !siblings.iter().any(|f| f.id == field_id) {
            return Err(AppError::NotFound("field_not_found"));
        }
        if referenced_by_formula(field_id, &siblings) {
            return Err(AppError::Conflict("field_referenced_by_formula"));
        }

        self.repo.soft_delete_field(&mut *tx, field_id).await?;
        self.repo.renumber_fields(&mut *tx, workspace_id, object_type).await?;

        tx.commit().await?;

        tracing::info!(field_id, workspace_id, "Campo customizado removido");
        Ok(())
    }

    /// `field_ids` precisa ser exatamente o conjunto de campos ativos do tipo.
    pub async fn reorder_fields(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
        field_ids: &[FieldId],
    ) -> Result<Vec<CustomField>, AppError> {
        let mut tx = pool.begin().await?;

        self.repo.lock_fields(&mut *tx, workspace_id, object_type).await?;
        let current = self.repo.list_fields(&mut *tx, workspace_id, object_type).await?;
        check_reorder(&current, field_ids)?;

        for (position, field_id) in field_ids.iter().enumerate() {
            self.repo.set_position(&mut *tx, *field_id, position as i32).await?;
        }
        let fields = self.repo.list_fields(&mut *tx, workspace_id, object_type).await?;

        tx.commit().await?;
        Ok(fields)
    }

    // =========================================================================
    //  OPÇÕES
    // =========================================================================

    pub async fn list_options(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
        field_id: FieldId,
    ) -> Result<Vec<CustomFieldOption>, AppError> {
        let field = self.select_field(pool, workspace_id, object_type, field_id, false).await?;
        self.repo.list_options(pool, &[field.id]).await
    }

    pub async fn add_option(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
        field_id: FieldId,
        payload: CreateOptionPayload,
    ) -> Result<CustomFieldOption, AppError> {
        let mut tx = pool.begin().await?;

        // Linha do campo travada: a posição da nova opção sai de um COUNT(*)
        let field = self.select_field(&mut *tx, workspace_id, object_type, field_id, true).await?;
        if self.repo.label_taken(&mut *tx, field.id, &payload.label).await? {
            return Err(AppError::Conflict("option_label_taken"));
        }
        let option = self.repo.insert_option(&mut *tx, field.id, &payload.label).await?;

        tx.commit().await?;
        Ok(option)
    }

    pub async fn delete_option(
        &self,
        pool: &PgPool,
        workspace_id: i64,
        object_type: ObjectType,
        field_id: FieldId,
        option_id: i64,
    ) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        let field = self.select_field(&mut *tx, workspace_id, object_type, field_id, true).await?;
        if !self.repo.soft_delete_option(&mut *tx, field.id, option_id).await? {
            return Err(AppError::NotFound("option_not_found"));
        }
        self.repo.renumber_options(&mut *tx, field.id).await?;

        tx.commit().await?;
        Ok(())
    }

    // Campo de seleção ativo deste tipo de objeto
    async fn select_field<'e, E>(
        &self,
        executor: E,
        workspace_id: i64,
        object_type: ObjectType,
        field_id: FieldId,
        lock: bool,
    ) -> Result<CustomField, AppError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let field = self
            .repo
            .find_field(executor, workspace_id, field_id, lock)
            .await?
            .filter(|f| f.object_type == object_type)
            .ok_or(AppError::NotFound("field_not_found"))?;

        if !field.kind.has_options() {
            return Err(AppError::Conflict("field_has_no_options"));
        }
        Ok(field)
    }
}

fn referenced_by_formula(field_id: FieldId, fields: &[CustomField]) -> bool {
    fields
        .iter()
        .filter(|f| f.id != field_id && f.deleted_at.is_none())
        .filter_map(|f| f.formula.as_deref())
        .any(|expr| formula::references(expr).contains(&field_id))
}

fn check_reorder(current: &[CustomField], requested: &[FieldId]) -> Result<(), FieldValueError> {
    let active: HashSet<FieldId> = current.iter().map(|f| f.id).collect();
    let mut seen = HashSet::new();

    for &id in requested {
        if !active.contains(&id) || !seen.insert(id) {
            return Err(FieldValueError::InvalidFieldReference { field_id: id });
        }
    }
    // Algum campo ativo ficou de fora
    if let Some(missing) = current.iter().find(|f| !seen.contains(&f.id)) {
        return Err(FieldValueError::InvalidFieldReference { field_id: missing.id });
    }
    Ok(())
}

/// Rótulos iniciais sem brancos e sem repetição (comparação normalizada).
fn distinct_labels(labels: &[String]) -> Result<Vec<String>, AppError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        if !seen.insert(normalize_label(label)) {
            return Err(AppError::Conflict("option_label_taken"));
        }
        out.push(label.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::validator::tests::field;

    fn calc(id: FieldId, expression: &str) -> CustomField {
        CustomField { formula: Some(expression.into()), ..field(id, FieldKind::Calculation) }
    }

    #[test]
    fn detects_fields_used_by_formulas() {
        let fields = vec![field(1, FieldKind::Number), field(2, FieldKind::Number), calc(3, "{{1}} * 2")];
        assert!(referenced_by_formula(1, &fields));
        assert!(!referenced_by_formula(2, &fields));
    }

    #[test]
    fn reorder_must_list_every_active_field_once() {
        let fields = vec![field(1, FieldKind::Text), field(2, FieldKind::Number), field(3, FieldKind::Date)];

        assert!(check_reorder(&fields, &[3, 1, 2]).is_ok());
        assert_eq!(
            check_reorder(&fields, &[3, 1]),
            Err(FieldValueError::InvalidFieldReference { field_id: 2 })
        );
        assert_eq!(
            check_reorder(&fields, &[3, 1, 1, 2]),
            Err(FieldValueError::InvalidFieldReference { field_id: 1 })
        );
        assert_eq!(
            check_reorder(&fields, &[3, 1, 2, 9]),
            Err(FieldValueError::InvalidFieldReference { field_id: 9 })
        );
    }

    #[test]
    fn initial_option_labels_are_trimmed_and_unique() {
        let labels = vec![" Bronze ".to_string(), "".to_string(), "Prata".to_string()];
        assert_eq!(distinct_labels(&labels).unwrap(), vec!["Bronze", "Prata"]);

        let dup = vec!["Ouro".to_string(), " ouro".to_string()];
        assert!(matches!(distinct_labels(&dup), Err(AppError::Conflict("option_label_taken"))));
    }
}
