// src/services/storage.rs

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::custom_field::{FieldId, ObjectType, StoredFile},
};

/// Onde os bytes dos anexos moram. O banco guarda só o `storage_path`.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn save_file(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
        object_type: ObjectType,
        field_id: FieldId,
    ) -> Result<StoredFile, AppError>;

    async fn read_file(&self, storage_path: &str) -> Result<Vec<u8>, AppError>;

    async fn delete_file(&self, storage_path: &str) -> Result<(), AppError>;
}

/// Implementação padrão: disco local sob um diretório raiz.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    // Caminho relativo e sem "..": nada escapa da raiz
    fn resolve(&self, storage_path: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(storage_path);
        let safe = !storage_path.is_empty() && relative.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::StorageError(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("caminho de storage inválido: {storage_path}"),
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn extension_of(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    let valid = !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

/// `deal/12/<uuid>.pdf`: o nome original nunca entra no caminho.
fn build_storage_path(object_type: ObjectType, field_id: FieldId, original_name: &str) -> String {
    let stem = Uuid::new_v4();
    let prefix = object_type.as_str().to_ascii_lowercase();
    match extension_of(original_name) {
        Some(ext) => format!("{prefix}/{field_id}/{stem}.{ext}"),
        None => format!("{prefix}/{field_id}/{stem}"),
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save_file(
        &self,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
        object_type: ObjectType,
        field_id: FieldId,
    ) -> Result<StoredFile, AppError> {
        let storage_path = build_storage_path(object_type, field_id, original_name);
        let full_path = self.resolve(&storage_path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full_path, bytes).await?;

        tracing::debug!(path = %storage_path, size = bytes.len(), "Arquivo gravado no storage");

        Ok(StoredFile {
            original_name: original_name.to_string(),
            storage_path,
            mime_type: mime_type.to_string(),
            size: bytes.len() as i64,
        })
    }

    async fn read_file(&self, storage_path: &str) -> Result<Vec<u8>, AppError> {
        let full_path = self.resolve(storage_path)?;
        Ok(tokio::fs::read(full_path).await?)
    }

    async fn delete_file(&self, storage_path: &str) -> Result<(), AppError> {
        let full_path = self.resolve(storage_path)?;
        match tokio::fs::remove_file(full_path).await {
            Ok(()) => Ok(()),
            // Já não existe: o objetivo foi atingido
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (LocalFileStorage, PathBuf) {
        let root = std::env::temp_dir().join(format!("crm-storage-{}", Uuid::new_v4()));
        (LocalFileStorage::new(root.clone()), root)
    }

    #[test]
    fn storage_path_keeps_only_a_safe_extension() {
        let path = build_storage_path(ObjectType::Deal, 12, "Proposta Final.PDF");
        assert!(path.starts_with("deal/12/"));
        assert!(path.ends_with(".pdf"));

        let odd = build_storage_path(ObjectType::Lead, 3, "script.sh;rm -rf");
        assert!(!odd.contains(';'));
    }

    #[test]
    fn rejects_paths_that_escape_the_root() {
        let (storage, _) = temp_storage();
        assert!(storage.resolve("../segredo").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
        assert!(storage.resolve("deal/1/a.pdf").is_ok());
    }

    #[tokio::test]
    async fn save_read_and_delete_round_trip() {
        let (storage, root) = temp_storage();

        let stored = storage
            .save_file(b"conteudo", "contrato.pdf", "application/pdf", ObjectType::Company, 5)
            .await
            .unwrap();
        assert_eq!(stored.size, 8);
        assert_eq!(stored.original_name, "contrato.pdf");
        assert_eq!(storage.read_file(&stored.storage_path).await.unwrap(), b"conteudo");

        storage.delete_file(&stored.storage_path).await.unwrap();
        assert!(storage.read_file(&stored.storage_path).await.is_err());
        // Apagar de novo não é erro
        storage.delete_file(&stored.storage_path).await.unwrap();

        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
