// src/engine/files.rs

use crate::models::custom_field::FileAttachment;

/// Como aplicar uma substituição sobre as versões existentes de um grupo.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementPlan {
    /// Linhas que deixam de ser a versão atual (recebem `replaced_at`).
    pub superseded_ids: Vec<i64>,
    pub next_version: i32,
}

/// `None` quando o grupo não tem versões (anexo já apagado).
pub fn plan_replacement(group: &[FileAttachment]) -> Option<ReplacementPlan> {
    let latest = group.iter().map(|f| f.version).max()?;
    Some(ReplacementPlan {
        superseded_ids: group.iter().filter(|f| f.is_current).map(|f| f.id).collect(),
        next_version: latest + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn upload(id: i64, group_key: Uuid) -> FileAttachment {
        FileAttachment {
            id,
            record_id: 10,
            field_id: 7,
            original_name: format!("contrato-{id}.pdf"),
            storage_path: format!("deal/7/{id}.pdf"),
            mime_type: "application/pdf".into(),
            size_bytes: 1024,
            group_key,
            version: 1,
            is_current: true,
            replaced_at: None,
            uploaded_by: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn next_version_follows_the_highest_even_if_rows_are_out_of_order() {
        let key = Uuid::new_v4();
        let mut old = upload(1, key);
        old.version = 4;
        old.is_current = false;
        let mut current = upload(2, key);
        current.version = 5;

        let plan = plan_replacement(&[current, old]).unwrap();
        assert_eq!(plan, ReplacementPlan { superseded_ids: vec![2], next_version: 6 });
    }

    #[test]
    fn empty_group_has_no_plan() {
        assert_eq!(plan_replacement(&[]), None);
    }
}
