// src/services/field_values.rs

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomFieldRepository, FieldValueRepository},
    engine::{
        calculation::{self, Recomputed},
        codec::ScalarColumns,
        completeness::{self, RequestState, StoredState},
        error::FieldValueError,
        masking,
        validator::{self, ValidatedInputs, ValidationContext},
    },
    models::{
        auth::User,
        custom_field::{
            CustomField, FieldId, FieldInput, FieldKind, FieldValueRow, FileAttachment, ObjectType, RecordFieldData,
            UploadedFile,
        },
    },
    services::{access_policy::AccessPolicy, storage::FileStorage},
};

/// Resultado da validação de uma gravação, pronto para persistir.
pub struct PreparedValues {
    object_type: ObjectType,
    validated: ValidatedInputs,
    recomputed: Recomputed,
    uploads: Vec<(FieldId, UploadedFile)>,
}

impl PreparedValues {
    pub fn warnings(&self) -> &[String] {
        &self.recomputed.warnings
    }
}

/// O motor de campos customizados, o mesmo para os quatro tipos de registro.
#[derive(Clone)]
pub struct FieldValueService {
    field_repo: CustomFieldRepository,
    value_repo: FieldValueRepository,
    access_policy: AccessPolicy,
    storage: Arc<dyn FileStorage>,
}

impl FieldValueService {
    pub fn new(
        field_repo: CustomFieldRepository,
        value_repo: FieldValueRepository,
        access_policy: AccessPolicy,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self { field_repo, value_repo, access_policy, storage }
    }

    /// Valida entradas e uploads, recalcula as fórmulas e checa obrigatórios.
    /// Nada é gravado aqui. `record_id` é `None` na criação.
    pub async fn prepare(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        object_type: ObjectType,
        record_id: Option<i64>,
        inputs: &[FieldInput],
        uploads: Vec<(FieldId, UploadedFile)>,
    ) -> Result<PreparedValues, AppError> {
        let fields = self.field_repo.list_fields(&mut *conn, actor.workspace_id, object_type).await?;
        let field_ids: Vec<FieldId> = fields.iter().map(|f| f.id).collect();

        let select_ids: Vec<FieldId> = fields.iter().filter(|f| f.kind.has_options()).map(|f| f.id).collect();
        let mut allowed_options: HashMap<FieldId, HashSet<i64>> = HashMap::new();
        if !select_ids.is_empty() {
            for option in self.field_repo.list_options(&mut *conn, &select_ids).await? {
                allowed_options.entry(option.field_id).or_default().insert(option.id);
            }
        }

        let assignable_users: HashSet<i64> = self
            .access_policy
            .assignable_users(&mut *conn, actor)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();

        let ctx = ValidationContext {
            workspace_id: actor.workspace_id,
            object_type,
            fields: &fields,
            allowed_options: &allowed_options,
            assignable_users: &assignable_users,
        };
        let validated = validator::validate_inputs(&ctx, inputs)?;
        let upload_counts = count_uploads(&fields, &uploads)?;

        let (stored, stored_numbers) = match record_id {
            Some(id) => {
                let ids = [id];
                let scalars = self.value_repo.load_scalars(&mut *conn, &field_ids, &ids).await?;
                let options = self.value_repo.load_options(&mut *conn, &field_ids, &ids).await?;
                let users = self.value_repo.load_users(&mut *conn, &field_ids, &ids).await?;
                let files = self.value_repo.load_current_files(&mut *conn, &field_ids, &ids).await?;
                let numbers = stored_numbers(&fields, &scalars);
                (StoredState::from_rows(&scalars, &options, &users, &files), numbers)
            }
            None => (StoredState::default(), HashMap::new()),
        };

        // Números gravados, sobrescritos pelos que vieram nesta requisição
        let mut numbers = stored_numbers;
        numbers.extend(validated.touched_numbers());
        let recomputed = calculation::recompute(&fields, &numbers);

        let request = RequestState {
            validated: &validated,
            uploads: &upload_counts,
            calculations: &recomputed.values,
        };
        if let Err(err) = completeness::ensure_complete(&fields, &stored, &request) {
            if let FieldValueError::MissingRequired { field_ids } = &err {
                tracing::debug!(?field_ids, ?object_type, "Campos obrigatórios ausentes");
            }
            return Err(err.into());
        }

        Ok(PreparedValues { object_type, validated, recomputed, uploads })
    }

    /// Grava tudo na transação do chamador. Os bytes dos uploads vão para o
    /// storage antes do commit. Devolve os anexos criados.
    pub async fn persist(
        &self,
        conn: &mut PgConnection,
        record_id: i64,
        actor: &User,
        prepared: PreparedValues,
    ) -> Result<Vec<FileAttachment>, AppError> {
        let PreparedValues { object_type, validated, recomputed, uploads } = prepared;

        for scalar in &validated.scalars {
            self.value_repo.upsert_scalar(&mut *conn, record_id, scalar.field_id, &scalar.columns).await?;
        }

        // Conjuntos multi: apaga tudo e regrava
        for set in &validated.option_sets {
            self.value_repo.delete_options(&mut *conn, record_id, set.field_id).await?;
            self.value_repo.insert_options(&mut *conn, record_id, set.field_id, &set.ids).await?;
        }
        for set in &validated.user_sets {
            self.value_repo.delete_users(&mut *conn, record_id, set.field_id).await?;
            self.value_repo.insert_users(&mut *conn, record_id, set.field_id, &set.ids).await?;
        }

        // Nulo também é gravado: limpa o resultado anterior
        for (field_id, value) in &recomputed.values {
            let columns = ScalarColumns { number: *value, ..Default::default() };
            self.value_repo.upsert_scalar(&mut *conn, record_id, *field_id, &columns).await?;
        }

        let mut created = Vec::with_capacity(uploads.len());
        for (field_id, upload) in uploads {
            let stored = self
                .storage
                .save_file(&upload.bytes, &upload.original_name, &upload.mime_type, object_type, field_id)
                .await?;
            let file = self
                .value_repo
                .insert_file(&mut *conn, record_id, field_id, &stored, Uuid::new_v4(), 1, actor.id)
                .await?;
            created.push(file);
        }

        Ok(created)
    }

    /// Campos customizados de um registro, já mascarados.
    pub async fn load_record_data(
        &self,
        conn: &mut PgConnection,
        workspace_id: i64,
        object_type: ObjectType,
        record_id: i64,
    ) -> Result<RecordFieldData, AppError> {
        let mut many = self.load_many(conn, workspace_id, object_type, &[record_id]).await?;
        Ok(many.remove(&record_id).unwrap_or_default())
    }

    /// Versão em lote para listagens: quatro consultas para a página inteira.
    pub async fn load_many(
        &self,
        conn: &mut PgConnection,
        workspace_id: i64,
        object_type: ObjectType,
        record_ids: &[i64],
    ) -> Result<HashMap<i64, RecordFieldData>, AppError> {
        if record_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let fields = self.field_repo.list_fields(&mut *conn, workspace_id, object_type).await?;
        let field_ids: Vec<FieldId> = fields.iter().map(|f| f.id).collect();

        let scalars = self.value_repo.load_scalars(&mut *conn, &field_ids, record_ids).await?;
        let options = self.value_repo.load_options(&mut *conn, &field_ids, record_ids).await?;
        let users = self.value_repo.load_users(&mut *conn, &field_ids, record_ids).await?;
        let files = self.value_repo.load_current_files(&mut *conn, &field_ids, record_ids).await?;

        let mut out: HashMap<i64, RecordFieldData> = HashMap::new();
        for row in scalars {
            out.entry(row.record_id).or_default().field_values.push(row);
        }
        for row in options {
            out.entry(row.record_id).or_default().option_values.push(row);
        }
        for row in users {
            out.entry(row.record_id).or_default().user_values.push(row);
        }
        for file in files {
            out.entry(file.record_id).or_default().files.push(file);
        }

        let masked = masking::masked_ids(&fields);
        Ok(out.into_iter().map(|(id, data)| (id, masking::mask_record(data, &masked))).collect())
    }
}

fn stored_numbers(fields: &[CustomField], scalars: &[FieldValueRow]) -> HashMap<FieldId, Option<f64>> {
    let number_fields: HashSet<FieldId> =
        fields.iter().filter(|f| f.kind == FieldKind::Number).map(|f| f.id).collect();
    scalars
        .iter()
        .filter(|row| number_fields.contains(&row.field_id))
        .map(|row| (row.field_id, row.value_number))
        .collect()
}

/// Uploads só valem para campos de arquivo ativos do tipo de objeto.
fn count_uploads(
    fields: &[CustomField],
    uploads: &[(FieldId, UploadedFile)],
) -> Result<HashMap<FieldId, usize>, FieldValueError> {
    let file_fields: HashSet<FieldId> = fields
        .iter()
        .filter(|f| f.kind == FieldKind::File && f.deleted_at.is_none())
        .map(|f| f.id)
        .collect();

    let mut counts = HashMap::new();
    for (field_id, _) in uploads {
        if !file_fields.contains(field_id) {
            return Err(FieldValueError::InvalidFieldReference { field_id: *field_id });
        }
        *counts.entry(*field_id).or_default() += 1;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::validator::tests::field;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile { original_name: name.into(), mime_type: "application/pdf".into(), bytes: vec![1, 2, 3] }
    }

    #[test]
    fn uploads_are_counted_per_file_field() {
        let fields = vec![field(1, FieldKind::File), field(2, FieldKind::Text)];
        let uploads = vec![(1, upload("a.pdf")), (1, upload("b.pdf"))];
        assert_eq!(count_uploads(&fields, &uploads).unwrap(), HashMap::from([(1, 2)]));
    }

    #[test]
    fn uploads_to_non_file_fields_are_rejected() {
        let fields = vec![field(1, FieldKind::File), field(2, FieldKind::Text)];
        assert_eq!(
            count_uploads(&fields, &[(2, upload("a.pdf"))]),
            Err(FieldValueError::InvalidFieldReference { field_id: 2 })
        );
        assert_eq!(
            count_uploads(&fields, &[(99, upload("a.pdf"))]),
            Err(FieldValueError::InvalidFieldReference { field_id: 99 })
        );
    }

    #[test]
    fn stored_numbers_ignore_calculations_and_other_kinds() {
        let fields = vec![field(1, FieldKind::Number), field(2, FieldKind::Calculation), field(3, FieldKind::Text)];
        let rows = vec![
            FieldValueRow { record_id: 5, field_id: 1, value_number: Some(42.0), ..Default::default() },
            FieldValueRow { record_id: 5, field_id: 2, value_number: Some(84.0), ..Default::default() },
            FieldValueRow { record_id: 5, field_id: 3, value_text: Some("x".into()), ..Default::default() },
        ];
        assert_eq!(stored_numbers(&fields, &rows), HashMap::from([(1, Some(42.0))]));
    }
}
